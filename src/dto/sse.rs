use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{matches::MatchView, tournament::TournamentDetail},
    state::model::{MatchId, PlayerId, Side, TournamentId},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after every awarded point, for score sounds and displays.
pub struct PointScoredEvent {
    pub match_id: MatchId,
    #[schema(value_type = u8)]
    pub side: Side,
    pub score1: u32,
    pub score2: u32,
    pub serving_player: Option<PlayerId>,
    /// Set when the point decided the match.
    #[schema(value_type = Option<u8>)]
    pub winner: Option<Side>,
    /// Whether a score sound should be played.
    pub play_sound: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a match result has been saved.
pub struct MatchCompletedEvent {
    #[schema(value_type = u8)]
    pub winner: Side,
    #[serde(rename = "match")]
    pub finished: MatchView,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast after any change to a match (score, serve, sides).
pub struct MatchUpdatedEvent(pub MatchView);

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast when a tournament or its schedule changed.
pub struct TournamentUpdatedEvent(pub TournamentDetail);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a tournament was deleted.
pub struct TournamentDeletedEvent {
    pub tournament_id: TournamentId,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a state change could not be persisted. Local state is kept.
pub struct PersistenceFailedEvent {
    /// Operation that failed (e.g. `add_point`).
    pub operation: String,
    pub match_id: Option<MatchId>,
    pub message: String,
}
