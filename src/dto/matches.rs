//! DTO definitions for match scoring and the scoring session.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::{
    match_state::MatchPhase,
    model::{Match, MatchId, PlayerId, PointsToWin, RotationState, Side, TournamentId},
};

/// Public projection of a match including derived phase and winner.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchView {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// Player id (singles) or team id (doubles) of side 1.
    pub side1_ref: i64,
    /// Player id (singles) or team id (doubles) of side 2.
    pub side2_ref: i64,
    pub score1: u32,
    pub score2: u32,
    pub completed: bool,
    #[schema(value_type = Option<u8>)]
    pub first_server: Option<Side>,
    pub serving_player: Option<PlayerId>,
    pub sides_swapped: bool,
    pub match_order: u32,
    /// `not_started`, `in_progress` or `completed`.
    pub phase: String,
    /// Winning side once the win condition holds, even before finalization.
    #[schema(value_type = Option<u8>)]
    pub winner: Option<Side>,
    pub rotation: Option<RotationView>,
}

impl MatchView {
    /// Project a match played under `points_to_win`.
    pub fn new(current: &Match, points_to_win: PointsToWin) -> Self {
        Self {
            id: current.id,
            tournament_id: current.tournament_id,
            side1_ref: current.side1_ref,
            side2_ref: current.side2_ref,
            score1: current.score1,
            score2: current.score2,
            completed: current.completed,
            first_server: current.first_server,
            serving_player: current.serving_player,
            sides_swapped: current.sides_swapped,
            match_order: current.match_order,
            phase: phase_name(current.phase()).to_string(),
            winner: current.winner(points_to_win),
            rotation: current.double_rotation_state.as_ref().map(RotationView::from),
        }
    }
}

fn phase_name(phase: MatchPhase) -> &'static str {
    match phase {
        MatchPhase::NotStarted => "not_started",
        MatchPhase::InProgress => "in_progress",
        MatchPhase::Completed => "completed",
    }
}

/// Doubles serving sequence.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RotationView {
    pub order: Vec<RotationSlotView>,
    pub current_index: usize,
    pub points_served_this_turn: u32,
}

/// One slot of the doubles serving sequence.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RotationSlotView {
    pub player_id: PlayerId,
    #[schema(value_type = u8)]
    pub side: Side,
}

impl From<&RotationState> for RotationView {
    fn from(state: &RotationState) -> Self {
        Self {
            order: state
                .order
                .iter()
                .map(|entry| RotationSlotView {
                    player_id: entry.player_id,
                    side: entry.side,
                })
                .collect(),
            current_index: state.current_index,
            points_served_this_turn: state.points_served_this_turn,
        }
    }
}

/// Player reference with the name shown on the serve selection screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub name: String,
}

/// Selectable first-server option.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServeOptionView {
    #[schema(value_type = u8)]
    pub side: Side,
    pub players: Vec<PlayerRef>,
}

/// Request selecting the side that serves first.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FirstServerRequest {
    #[schema(value_type = u8)]
    pub side: Side,
}

/// Request awarding or removing a point.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PointRequest {
    #[schema(value_type = u8)]
    pub side: Side,
}

/// Administrative score replacement.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScoreOverrideRequest {
    #[validate(range(max = 99))]
    pub score1: u32,
    #[validate(range(max = 99))]
    pub score2: u32,
}

/// Result of finalizing a match.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinalizeResponse {
    #[schema(value_type = u8)]
    pub winner: Side,
    #[serde(rename = "match")]
    pub finished: MatchView,
}

/// State of the scoring session.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub session_id: Option<Uuid>,
    pub tournament_id: Option<TournamentId>,
    pub active_match: Option<MatchView>,
    /// Number of points that can be undone.
    pub undo_depth: usize,
    /// `setup` or `game` while a match is active.
    pub voice_context: Option<String>,
}

impl SessionView {
    /// Session with no tournament open.
    pub fn closed() -> Self {
        Self {
            session_id: None,
            tournament_id: None,
            active_match: None,
            undo_depth: 0,
            voice_context: None,
        }
    }
}

/// Result of suspending the active match.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SuspendResponse {
    pub suspended_match: Option<MatchId>,
}
