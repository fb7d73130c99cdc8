use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::state::model::{
    MatchId, PlayerId, PointsToWin, RotationState, Side, TeamId, TournamentId, TournamentType,
};

/// Player record stored in persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: PlayerId,
    /// Full display name.
    pub name: String,
    /// Optional nickname.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub photo_url: String,
    /// Notes about the player's strengths.
    #[serde(default)]
    pub strengths: String,
    /// Notes about the player's weaknesses.
    #[serde(default)]
    pub weaknesses: String,
    /// Last time this record was superseded.
    pub updated_at: SystemTime,
}

/// Doubles team stored inside its tournament.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: TeamId,
    /// Both members in tournament order.
    pub player_ids: [PlayerId; 2],
    /// Display order inside the tournament.
    pub order: u32,
}

/// Flat match record, always saved as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Stable identifier for the match.
    pub id: MatchId,
    /// Owning tournament.
    pub tournament_id: TournamentId,
    /// Player id (singles) or team id (doubles) of side 1.
    pub side1_ref: i64,
    /// Player id (singles) or team id (doubles) of side 2.
    pub side2_ref: i64,
    /// Points of side 1.
    pub score1: u32,
    /// Points of side 2.
    pub score2: u32,
    /// Whether the result was saved.
    pub completed: bool,
    /// Side that served first.
    pub first_server: Option<Side>,
    /// Cached serving player.
    pub serving_player: Option<PlayerId>,
    /// Display-only side flip.
    #[serde(default)]
    pub sides_swapped: bool,
    /// Position in the schedule.
    pub match_order: u32,
    /// Doubles serving sequence.
    #[serde(default)]
    pub double_rotation_state: Option<RotationState>,
    /// Last time this record was superseded.
    pub updated_at: SystemTime,
}

/// Tournament record with its current teams and matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentEntity {
    /// Stable identifier for the tournament.
    pub id: TournamentId,
    /// Display name.
    pub name: String,
    /// Target score of every match.
    pub points_to_win: PointsToWin,
    /// Singles or doubles.
    #[serde(rename = "type")]
    pub kind: TournamentType,
    /// Lock flag.
    #[serde(default)]
    pub is_locked: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the tournament row was superseded.
    pub updated_at: SystemTime,
    /// Ordered participants.
    pub player_ids: Vec<PlayerId>,
    /// Current doubles teams.
    #[serde(default)]
    pub teams: Vec<TeamEntity>,
    /// Current matches (superseded generations are not included).
    #[serde(default)]
    pub matches: Vec<MatchEntity>,
}

/// Lightweight projection used when listing tournaments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentListItemEntity {
    /// Stable identifier for the tournament.
    pub id: TournamentId,
    /// Display name.
    pub name: String,
    /// Singles or doubles.
    pub kind: TournamentType,
    /// Lock flag.
    pub is_locked: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Number of participants.
    pub player_count: usize,
    /// Number of finalized matches.
    pub completed_matches: usize,
    /// Number of generated matches.
    pub total_matches: usize,
}

impl From<&TournamentEntity> for TournamentListItemEntity {
    fn from(value: &TournamentEntity) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            kind: value.kind,
            is_locked: value.is_locked,
            created_at: value.created_at,
            player_count: value.player_ids.len(),
            completed_matches: value.matches.iter().filter(|m| m.completed).count(),
            total_matches: value.matches.len(),
        }
    }
}

/// Record families that draw identifiers from their own sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Player records.
    Player,
    /// Tournament records.
    Tournament,
    /// Team records.
    Team,
    /// Match records.
    Match,
}

impl IdKind {
    /// Stable name used as a storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            IdKind::Player => "player",
            IdKind::Tournament => "tournament",
            IdKind::Team => "team",
            IdKind::Match => "match",
        }
    }
}
