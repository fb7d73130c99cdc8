use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};

use crate::dao::models::{MatchEntity, PlayerEntity, TeamEntity, TournamentEntity};

/// Identifier of a player record.
pub type PlayerId = i64;
/// Identifier of a doubles team inside a tournament.
pub type TeamId = i64;
/// Identifier of a match record.
pub type MatchId = i64;
/// Identifier of a tournament record.
pub type TournamentId = i64;

/// One of the two competing parties of a match (a player in singles, a team in doubles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    /// Side 1, the first reference of the match.
    One,
    /// Side 2, the second reference of the match.
    Two,
}

impl Side {
    /// The opposing side.
    pub fn other(self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// Numeric representation (`1` or `2`).
    pub fn number(self) -> u8 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Side::One),
            2 => Ok(Side::Two),
            other => Err(format!("side must be 1 or 2 (got {other})")),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> Self {
        side.number()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Tournament format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum TournamentType {
    /// One player per side.
    #[default]
    Single,
    /// Two-player teams per side.
    Double,
}

impl TournamentType {
    /// Lenient parser: anything other than `double` is treated as singles.
    pub fn normalize(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("double") {
            TournamentType::Double
        } else {
            TournamentType::Single
        }
    }

    /// Wire name of the tournament type.
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentType::Single => "single",
            TournamentType::Double => "double",
        }
    }
}

impl From<String> for TournamentType {
    fn from(value: String) -> Self {
        TournamentType::normalize(&value)
    }
}

impl From<TournamentType> for &'static str {
    fn from(value: TournamentType) -> Self {
        value.as_str()
    }
}

/// Target score of a game. Only 11 and 21 are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PointsToWin {
    /// Short game to 11.
    #[default]
    Eleven,
    /// Long game to 21.
    TwentyOne,
}

impl PointsToWin {
    /// Numeric target.
    pub fn value(self) -> u32 {
        match self {
            PointsToWin::Eleven => 11,
            PointsToWin::TwentyOne => 21,
        }
    }

    /// Score both sides must reach for the game to be at deuce.
    pub fn deuce_threshold(self) -> u32 {
        self.value() - 1
    }
}

impl TryFrom<u32> for PointsToWin {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            11 => Ok(PointsToWin::Eleven),
            21 => Ok(PointsToWin::TwentyOne),
            other => Err(format!("points to win must be 11 or 21 (got {other})")),
        }
    }
}

impl From<PointsToWin> for u32 {
    fn from(value: PointsToWin) -> Self {
        value.value()
    }
}

/// Registered player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Primary key.
    pub id: PlayerId,
    /// Full display name.
    pub name: String,
    /// Optional nickname, also usable as a voice keyword.
    pub nickname: Option<String>,
    /// Avatar URL.
    pub photo_url: String,
    /// Free-form notes about the player's strengths.
    pub strengths: String,
    /// Free-form notes about the player's weaknesses.
    pub weaknesses: String,
}

/// Doubles pair derived from consecutive entries of the tournament player list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Primary key.
    pub id: TeamId,
    /// Both members, in tournament order.
    pub player_ids: [PlayerId; 2],
    /// Position of the team inside the tournament.
    pub order: u32,
}

/// One slot of the doubles serving sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEntry {
    /// Player serving while this slot is active.
    pub player_id: PlayerId,
    /// Side the player belongs to.
    pub side: Side,
}

/// Position inside the doubles serving sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    /// Fixed serving order, built once when the first server is chosen.
    pub order: Vec<RotationEntry>,
    /// Index of the slot currently serving.
    pub current_index: usize,
    /// Points already played within the current serving block.
    pub points_served_this_turn: u32,
}

impl RotationState {
    /// Player of the active slot, if the order is not empty.
    pub fn serving_player(&self) -> Option<PlayerId> {
        self.order.get(self.current_index).map(|entry| entry.player_id)
    }
}

/// Live match record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Primary key.
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
    /// Frozen by an explicit finalize.
    pub completed: bool,
    /// Side that served first; `None` until the match starts.
    pub first_server: Option<Side>,
    /// Cached serving player, recomputed after every change.
    pub serving_player: Option<PlayerId>,
    /// Display-only left/right flip.
    pub sides_swapped: bool,
    /// Position in the tournament schedule.
    pub match_order: u32,
    /// Doubles serving sequence, `None` for singles.
    pub double_rotation_state: Option<RotationState>,
}

impl Match {
    /// Fresh, not yet started match between two side references.
    pub fn new(
        id: MatchId,
        tournament_id: TournamentId,
        side1_ref: i64,
        side2_ref: i64,
        match_order: u32,
    ) -> Self {
        Self {
            id,
            tournament_id,
            side1_ref,
            side2_ref,
            score1: 0,
            score2: 0,
            completed: false,
            first_server: None,
            serving_player: None,
            sides_swapped: false,
            match_order,
            double_rotation_state: None,
        }
    }

    /// Points of the given side.
    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::One => self.score1,
            Side::Two => self.score2,
        }
    }

    pub(crate) fn score_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::One => &mut self.score1,
            Side::Two => &mut self.score2,
        }
    }

    /// Sum of both scores.
    pub fn total_score(&self) -> u32 {
        self.score1 + self.score2
    }

    /// Reference (player or team id) of the given side.
    pub fn side_ref(&self, side: Side) -> i64 {
        match side {
            Side::One => self.side1_ref,
            Side::Two => self.side2_ref,
        }
    }

    /// True when any point was scored or the match was finalized.
    pub fn has_progress(&self) -> bool {
        self.completed || self.total_score() > 0
    }
}

/// Tournament with its current teams and generated matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tournament {
    /// Primary key.
    pub id: TournamentId,
    /// Display name.
    pub name: String,
    /// Target score of each match.
    pub points_to_win: PointsToWin,
    /// Singles or doubles.
    pub kind: TournamentType,
    /// Locked tournaments keep their composition but still accept scores.
    pub is_locked: bool,
    /// Creation time.
    pub created_at: SystemTime,
    /// Ordered, unique participants.
    pub player_ids: Vec<PlayerId>,
    /// Doubles teams, empty for singles.
    pub teams: Vec<Team>,
    /// Matches ordered by `match_order`.
    pub matches: Vec<Match>,
}

/// Read-only view of the tournament rules a match needs while it is mutated.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// Singles or doubles.
    pub kind: TournamentType,
    /// Target score.
    pub points_to_win: PointsToWin,
    /// Teams used to resolve doubles side references.
    pub teams: &'a [Team],
}

impl MatchContext<'_> {
    /// Concrete players playing on `side` of `current`.
    pub fn side_players(&self, current: &Match, side: Side) -> Vec<PlayerId> {
        let reference = current.side_ref(side);
        match self.kind {
            TournamentType::Single => vec![reference],
            TournamentType::Double => self
                .teams
                .iter()
                .find(|team| team.id == reference)
                .map(|team| team.player_ids.to_vec())
                .unwrap_or_default(),
        }
    }
}

impl Tournament {
    /// Rules view used by match operations.
    pub fn context(&self) -> MatchContext<'_> {
        MatchContext {
            kind: self.kind,
            points_to_win: self.points_to_win,
            teams: &self.teams,
        }
    }

    /// Look up a match by id.
    pub fn find_match(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|candidate| candidate.id == id)
    }

    /// Split borrow returning a mutable match together with the rules it is played under.
    pub fn match_with_context_mut(
        &mut self,
        id: MatchId,
    ) -> Option<(&mut Match, MatchContext<'_>)> {
        let Tournament {
            kind,
            points_to_win,
            teams,
            matches,
            ..
        } = self;
        let current = matches.iter_mut().find(|candidate| candidate.id == id)?;
        Some((
            current,
            MatchContext {
                kind: *kind,
                points_to_win: *points_to_win,
                teams: teams.as_slice(),
            },
        ))
    }

    /// True when any match has points or was finalized.
    pub fn has_progress(&self) -> bool {
        self.matches.iter().any(Match::has_progress)
    }

    /// True when `player_id` participates in the tournament.
    pub fn includes_player(&self, player_id: PlayerId) -> bool {
        self.player_ids.contains(&player_id)
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            nickname: value.nickname.filter(|nick| !nick.trim().is_empty()),
            photo_url: value.photo_url,
            strengths: value.strengths,
            weaknesses: value.weaknesses,
        }
    }
}

impl From<Player> for PlayerEntity {
    fn from(value: Player) -> Self {
        Self {
            id: value.id,
            name: value.name,
            nickname: value.nickname,
            photo_url: value.photo_url,
            strengths: value.strengths,
            weaknesses: value.weaknesses,
            updated_at: SystemTime::now(),
        }
    }
}

impl From<TeamEntity> for Team {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            player_ids: value.player_ids,
            order: value.order,
        }
    }
}

impl From<Team> for TeamEntity {
    fn from(value: Team) -> Self {
        Self {
            id: value.id,
            player_ids: value.player_ids,
            order: value.order,
        }
    }
}

impl From<MatchEntity> for Match {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            tournament_id: value.tournament_id,
            side1_ref: value.side1_ref,
            side2_ref: value.side2_ref,
            score1: value.score1,
            score2: value.score2,
            completed: value.completed,
            first_server: value.first_server,
            serving_player: value.serving_player,
            sides_swapped: value.sides_swapped,
            match_order: value.match_order,
            double_rotation_state: value.double_rotation_state,
        }
    }
}

impl From<Match> for MatchEntity {
    fn from(value: Match) -> Self {
        Self {
            id: value.id,
            tournament_id: value.tournament_id,
            side1_ref: value.side1_ref,
            side2_ref: value.side2_ref,
            score1: value.score1,
            score2: value.score2,
            completed: value.completed,
            first_server: value.first_server,
            serving_player: value.serving_player,
            sides_swapped: value.sides_swapped,
            match_order: value.match_order,
            double_rotation_state: value.double_rotation_state,
            updated_at: SystemTime::now(),
        }
    }
}

impl From<TournamentEntity> for Tournament {
    fn from(value: TournamentEntity) -> Self {
        let mut teams: Vec<Team> = value.teams.into_iter().map(Into::into).collect();
        teams.sort_by_key(|team| team.order);
        let mut matches: Vec<Match> = value.matches.into_iter().map(Into::into).collect();
        matches.sort_by_key(|current| current.match_order);

        Self {
            id: value.id,
            name: value.name,
            points_to_win: value.points_to_win,
            kind: value.kind,
            is_locked: value.is_locked,
            created_at: value.created_at,
            player_ids: value.player_ids,
            teams,
            matches,
        }
    }
}

impl From<Tournament> for TournamentEntity {
    fn from(value: Tournament) -> Self {
        Self {
            id: value.id,
            name: value.name,
            points_to_win: value.points_to_win,
            kind: value.kind,
            is_locked: value.is_locked,
            created_at: value.created_at,
            updated_at: SystemTime::now(),
            player_ids: value.player_ids,
            teams: value.teams.into_iter().map(Into::into).collect(),
            matches: value.matches.into_iter().map(Into::into).collect(),
        }
    }
}
