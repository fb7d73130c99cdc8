use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        matches::MatchView,
        sse::{
            MatchCompletedEvent, MatchUpdatedEvent, PersistenceFailedEvent, PointScoredEvent,
            ServerEvent, SystemStatus, TournamentDeletedEvent, TournamentUpdatedEvent,
        },
        tournament::TournamentDetail,
    },
    services::announcer::Announcement,
    state::{
        AppState,
        match_state::PointScored,
        model::{MatchId, Side, TournamentId},
    },
};

const EVENT_SYSTEM_STATUS: &str = "system.status";
const EVENT_MATCH_UPDATED: &str = "match.updated";
const EVENT_POINT_SCORED: &str = "match.point_scored";
const EVENT_MATCH_COMPLETED: &str = "match.completed";
const EVENT_ANNOUNCEMENT: &str = "announcement";
const EVENT_TOURNAMENT_UPDATED: &str = "tournament.updated";
const EVENT_TOURNAMENT_DELETED: &str = "tournament.deleted";
const EVENT_PERSISTENCE_FAILED: &str = "persistence.failed";

/// Broadcast whether the backend is running without storage.
pub fn broadcast_system_status(state: &AppState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Broadcast the state of a match after any change.
pub fn broadcast_match_updated(state: &AppState, view: MatchView) {
    send_public_event(state, EVENT_MATCH_UPDATED, &MatchUpdatedEvent(view));
}

/// Broadcast an awarded point so displays can play the score sound.
pub fn broadcast_point_scored(state: &AppState, scored: &PointScored, play_sound: bool) {
    let payload = PointScoredEvent {
        match_id: scored.match_id,
        side: scored.side,
        score1: scored.score1,
        score2: scored.score2,
        serving_player: scored.serving_player,
        winner: scored.winner,
        play_sound,
    };
    send_public_event(state, EVENT_POINT_SCORED, &payload);
}

/// Broadcast a saved match result.
pub fn broadcast_match_completed(state: &AppState, winner: Side, finished: MatchView) {
    let payload = MatchCompletedEvent { winner, finished };
    send_public_event(state, EVENT_MATCH_COMPLETED, &payload);
}

/// Broadcast a text the UI should speak.
pub fn broadcast_announcement(state: &AppState, announcement: &Announcement) {
    send_public_event(state, EVENT_ANNOUNCEMENT, announcement);
}

/// Broadcast a changed tournament with its schedule.
pub fn broadcast_tournament_updated(state: &AppState, detail: TournamentDetail) {
    send_public_event(state, EVENT_TOURNAMENT_UPDATED, &TournamentUpdatedEvent(detail));
}

/// Broadcast a deleted tournament.
pub fn broadcast_tournament_deleted(state: &AppState, tournament_id: TournamentId) {
    send_public_event(
        state,
        EVENT_TOURNAMENT_DELETED,
        &TournamentDeletedEvent { tournament_id },
    );
}

/// Broadcast that a change was kept locally but not stored.
pub fn broadcast_persistence_failed(
    state: &AppState,
    operation: &str,
    match_id: Option<MatchId>,
    message: String,
) {
    let payload = PersistenceFailedEvent {
        operation: operation.to_string(),
        match_id,
        message,
    };
    send_public_event(state, EVENT_PERSISTENCE_FAILED, &payload);
}

fn send_public_event(state: &AppState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
