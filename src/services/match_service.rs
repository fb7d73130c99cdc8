//! Match scoring on top of the open scoring session.
//!
//! Every mutation follows the same path: take the session lock, apply the
//! change, clone the updated match and release the lock, then broadcast and
//! persist. A failed save keeps the local change.

use tracing::{debug, info, warn};

use crate::{
    dto::matches::{
        FinalizeResponse, MatchView, PlayerRef, ServeOptionView, SessionView, SuspendResponse,
    },
    error::ServiceError,
    services::{
        announcer::{Announcement, ScoreLine},
        input_dispatcher::{MatchCommand, VoiceContext},
        sse_events,
    },
    state::{
        ScoringSession, SharedState,
        match_state::{MatchError, PointScored},
        model::{Match, MatchId, PlayerId, PointsToWin, Side},
    },
};

/// Result of a match command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Match after the command; `None` when the command parked the session.
    pub current: Option<MatchView>,
    /// Winner saved by a finalize command.
    pub winner: Option<Side>,
}

/// What a command did to the match, captured while the session lock is held.
enum Effect {
    Point(PointScored),
    FirstServer,
    Subtracted,
    Undone,
    Swapped,
    Finalized(Side),
    Unchanged,
}

struct Applied {
    effect: Effect,
    updated: Match,
    points_to_win: PointsToWin,
    announcement: Option<Announcement>,
    ticket: u64,
}

/// Make `match_id` the match being played.
pub async fn play_match(state: &SharedState, match_id: MatchId) -> Result<MatchView, ServiceError> {
    let mut guard = state.session().write().await;
    let session = open_session(guard.as_mut())?;
    let points_to_win = session.tournament().points_to_win;
    let current = session.play(match_id)?;
    info!(match_id, "match activated");
    Ok(MatchView::new(current, points_to_win))
}

/// Sides and players that can serve first.
pub async fn serve_selection(
    state: &SharedState,
    match_id: MatchId,
) -> Result<Vec<ServeOptionView>, ServiceError> {
    let guard = state.session().read().await;
    let session = open_session_ref(guard.as_ref())?;
    let tournament = session.tournament();
    let current = tournament
        .find_match(match_id)
        .ok_or(MatchError::NotFound(match_id))?;
    let options = current.serve_selection(&tournament.context())?;

    Ok(options
        .into_iter()
        .map(|option| ServeOptionView {
            side: option.side,
            players: option
                .player_ids
                .into_iter()
                .map(|id| PlayerRef {
                    id,
                    name: player_name(session, id),
                })
                .collect(),
        })
        .collect())
}

/// Run one scoring command against `match_id`, activating it first.
pub async fn execute(
    state: &SharedState,
    match_id: MatchId,
    command: MatchCommand,
) -> Result<CommandResult, ServiceError> {
    if command == MatchCommand::Suspend {
        suspend(state).await?;
        return Ok(CommandResult {
            current: None,
            winner: None,
        });
    }

    let settings = state.settings_snapshot().await;
    let applied = {
        let mut guard = state.session().write().await;
        let session = open_session(guard.as_mut())?;
        session.play(match_id)?;

        let (effect, updated) = session.with_match(match_id, |current, ctx, history| {
            Ok(match command {
                MatchCommand::SetFirstServer(side) => {
                    current.set_first_server(ctx, side)?;
                    Effect::FirstServer
                }
                MatchCommand::AddPoint(side) => Effect::Point(current.add_point(ctx, side, history)?),
                MatchCommand::SubtractPoint(side) => {
                    if current.subtract_point(ctx, side)? {
                        Effect::Subtracted
                    } else {
                        Effect::Unchanged
                    }
                }
                MatchCommand::Undo => {
                    if current.undo(ctx, history)? {
                        Effect::Undone
                    } else {
                        Effect::Unchanged
                    }
                }
                MatchCommand::SwapSides => {
                    current.swap_sides();
                    Effect::Swapped
                }
                MatchCommand::Finalize => {
                    let already_completed = current.completed;
                    let winner = current.finalize(ctx)?;
                    if already_completed {
                        Effect::Unchanged
                    } else {
                        Effect::Finalized(winner)
                    }
                }
                MatchCommand::Suspend => Effect::Unchanged,
            })
        })?;

        let points_to_win = session.tournament().points_to_win;
        let announcement = match &effect {
            Effect::Point(scored) => {
                let server = scored
                    .serving_player
                    .map(|id| (side_of(session, &updated, id), id));
                let server_name = server.map(|(side, id)| (side, player_name(session, id)));
                let winner_label = scored.winner.map(|side| side_label(session, &updated, side));
                let line = ScoreLine {
                    scored,
                    points_to_win,
                    server: server_name
                        .as_ref()
                        .and_then(|(side, name)| side.map(|side| (side, name.as_str()))),
                    winner_label,
                };
                state.announcer().point(&settings, &line)
            }
            Effect::FirstServer => updated
                .serving_player
                .and_then(|id| state.announcer().first_server(&settings, &player_name(session, id))),
            _ => None,
        };

        if matches!(effect, Effect::Finalized(_)) && session.active_match_id() == Some(match_id) {
            session.suspend();
        }

        Applied {
            effect,
            updated,
            points_to_win,
            announcement,
            ticket: state.next_write_ticket(),
        }
    };

    publish(state, command, applied).await
}

async fn publish(
    state: &SharedState,
    command: MatchCommand,
    applied: Applied,
) -> Result<CommandResult, ServiceError> {
    let Applied {
        effect,
        updated,
        points_to_win,
        announcement,
        ticket,
    } = applied;
    let view = MatchView::new(&updated, points_to_win);

    if matches!(effect, Effect::Unchanged) {
        debug!(match_id = updated.id, ?command, "command left the match unchanged");
        let winner = matches!(command, MatchCommand::Finalize)
            .then(|| updated.winner(points_to_win))
            .flatten();
        return Ok(CommandResult {
            current: Some(view),
            winner,
        });
    }

    sse_events::broadcast_match_updated(state, view.clone());
    let mut winner = None;
    match &effect {
        Effect::Point(scored) => {
            let play_sound = state.settings().read().await.sounds_enabled;
            sse_events::broadcast_point_scored(state, scored, play_sound);
        }
        Effect::Finalized(side) => {
            info!(match_id = updated.id, winner = %side, "match finalized");
            sse_events::broadcast_match_completed(state, *side, view.clone());
            winner = Some(*side);
        }
        _ => {}
    }
    if let Some(announcement) = &announcement {
        sse_events::broadcast_announcement(state, announcement);
    }

    persist_match(state, operation_name(command), updated, ticket).await?;
    Ok(CommandResult {
        current: Some(view),
        winner,
    })
}

/// Select the side serving first.
pub async fn set_first_server(
    state: &SharedState,
    match_id: MatchId,
    side: Side,
) -> Result<MatchView, ServiceError> {
    updated_view(execute(state, match_id, MatchCommand::SetFirstServer(side)).await?)
}

/// Award a point.
pub async fn add_point(
    state: &SharedState,
    match_id: MatchId,
    side: Side,
) -> Result<MatchView, ServiceError> {
    updated_view(execute(state, match_id, MatchCommand::AddPoint(side)).await?)
}

/// Take a point away.
pub async fn subtract_point(
    state: &SharedState,
    match_id: MatchId,
    side: Side,
) -> Result<MatchView, ServiceError> {
    updated_view(execute(state, match_id, MatchCommand::SubtractPoint(side)).await?)
}

/// Revert the last awarded point.
pub async fn undo(state: &SharedState, match_id: MatchId) -> Result<MatchView, ServiceError> {
    updated_view(execute(state, match_id, MatchCommand::Undo).await?)
}

/// Flip the displayed sides.
pub async fn swap_sides(state: &SharedState, match_id: MatchId) -> Result<MatchView, ServiceError> {
    updated_view(execute(state, match_id, MatchCommand::SwapSides).await?)
}

/// Save the result of a decided match.
pub async fn finalize(
    state: &SharedState,
    match_id: MatchId,
) -> Result<FinalizeResponse, ServiceError> {
    let result = execute(state, match_id, MatchCommand::Finalize).await?;
    let finished = result
        .current
        .ok_or_else(|| ServiceError::InvalidState("finalize returned no match".into()))?;
    let winner = result
        .winner
        .ok_or_else(|| ServiceError::InvalidState("completed match has no winner".into()))?;
    Ok(FinalizeResponse { winner, finished })
}

/// Administrative score edit. Does not activate the match.
pub async fn override_score(
    state: &SharedState,
    match_id: MatchId,
    score1: u32,
    score2: u32,
) -> Result<MatchView, ServiceError> {
    let (updated, points_to_win, ticket) = {
        let mut guard = state.session().write().await;
        let session = open_session(guard.as_mut())?;
        let ((), updated) = session.with_match(match_id, |current, ctx, _| {
            current.override_score(ctx, score1, score2);
            Ok(())
        })?;
        (updated, session.tournament().points_to_win, state.next_write_ticket())
    };
    info!(match_id, score1, score2, "score overridden");

    let view = MatchView::new(&updated, points_to_win);
    sse_events::broadcast_match_updated(state, view.clone());
    persist_match(state, "override_score", updated, ticket).await?;
    Ok(view)
}

/// Park the active match.
pub async fn suspend(state: &SharedState) -> Result<SuspendResponse, ServiceError> {
    let mut guard = state.session().write().await;
    let session = open_session(guard.as_mut())?;
    let suspended_match = session.suspend();
    if let Some(match_id) = suspended_match {
        info!(match_id, "match suspended");
    }
    Ok(SuspendResponse { suspended_match })
}

/// Snapshot of the scoring session.
pub async fn session_view(state: &SharedState) -> SessionView {
    let guard = state.session().read().await;
    let Some(session) = guard.as_ref() else {
        return SessionView::closed();
    };
    let tournament = session.tournament();
    let active = session.active_match();
    SessionView {
        session_id: Some(session.id()),
        tournament_id: Some(tournament.id),
        active_match: active.map(|current| MatchView::new(current, tournament.points_to_win)),
        undo_depth: session.undo_depth(),
        voice_context: active.map(|current| match VoiceContext::for_match(current) {
            VoiceContext::Setup => "setup".to_string(),
            VoiceContext::Game => "game".to_string(),
        }),
    }
}

/// Store the whole match record. Failures are reported but the local state is kept.
///
/// Saves of one match run one at a time; a snapshot older than the last one
/// saved (lower `ticket`) is dropped so the store never goes back in time.
pub(crate) async fn persist_match(
    state: &SharedState,
    operation: &str,
    updated: Match,
    ticket: u64,
) -> Result<(), ServiceError> {
    let match_id = updated.id;
    let slot = state.match_write_slot(match_id);
    let mut last_saved = slot.lock().await;
    if *last_saved > ticket {
        debug!(match_id, operation, ticket, "newer snapshot already saved; skipping");
        return Ok(());
    }

    let result = async {
        let store = state.require_store().await?;
        store.save_match(match_id, updated.into()).await?;
        Ok::<_, ServiceError>(())
    }
    .await;
    if result.is_ok() {
        *last_saved = ticket;
    }

    if let Err(err) = &result {
        warn!(match_id, operation, error = %err, "failed to persist match; keeping local state");
        sse_events::broadcast_persistence_failed(state, operation, Some(match_id), err.to_string());
    }
    result
}

fn updated_view(result: CommandResult) -> Result<MatchView, ServiceError> {
    result
        .current
        .ok_or_else(|| ServiceError::InvalidState("command returned no match".into()))
}

fn open_session(session: Option<&mut ScoringSession>) -> Result<&mut ScoringSession, ServiceError> {
    session.ok_or_else(|| ServiceError::InvalidState("no tournament is open".into()))
}

fn open_session_ref(session: Option<&ScoringSession>) -> Result<&ScoringSession, ServiceError> {
    session.ok_or_else(|| ServiceError::InvalidState("no tournament is open".into()))
}

fn player_name(session: &ScoringSession, id: PlayerId) -> String {
    session
        .player(id)
        .map(|player| player.name.clone())
        .unwrap_or_else(|| format!("#{id}"))
}

fn side_of(session: &ScoringSession, current: &Match, player_id: PlayerId) -> Option<Side> {
    let ctx = session.tournament().context();
    [Side::One, Side::Two]
        .into_iter()
        .find(|side| ctx.side_players(current, *side).contains(&player_id))
}

fn side_label(session: &ScoringSession, current: &Match, side: Side) -> String {
    let names: Vec<String> = session
        .tournament()
        .context()
        .side_players(current, side)
        .into_iter()
        .filter_map(|id| session.player(id).map(|player| player.name.clone()))
        .collect();
    if names.is_empty() {
        side.to_string()
    } else {
        names.join(" + ")
    }
}

fn operation_name(command: MatchCommand) -> &'static str {
    match command {
        MatchCommand::SetFirstServer(_) => "set_first_server",
        MatchCommand::AddPoint(_) => "add_point",
        MatchCommand::SubtractPoint(_) => "subtract_point",
        MatchCommand::Undo => "undo",
        MatchCommand::SwapSides => "swap_sides",
        MatchCommand::Finalize => "finalize",
        MatchCommand::Suspend => "suspend",
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::tournament_store::{TournamentStore, memory::MemoryTournamentStore},
        state::{
            AppState,
            model::{Player, Tournament, TournamentType},
        },
    };

    fn player(id: PlayerId, name: &str) -> Player {
        Player {
            id,
            name: name.into(),
            nickname: None,
            photo_url: String::new(),
            strengths: String::new(),
            weaknesses: String::new(),
        }
    }

    fn tournament() -> Tournament {
        Tournament {
            id: 1,
            name: "Club night".into(),
            points_to_win: PointsToWin::Eleven,
            kind: TournamentType::Single,
            is_locked: false,
            created_at: SystemTime::now(),
            player_ids: vec![10, 20],
            teams: Vec::new(),
            matches: vec![Match::new(100, 1, 10, 20, 0)],
        }
    }

    async fn open_state() -> (SharedState, Arc<MemoryTournamentStore>) {
        let store = Arc::new(MemoryTournamentStore::new());
        store
            .save_tournament(tournament().into())
            .await
            .unwrap();
        let state = AppState::new(AppConfig::default());
        state.set_store(store.clone()).await;
        *state.session().write().await = Some(ScoringSession::new(
            tournament(),
            vec![player(10, "Jan Novák"), player(20, "Petr Svoboda")],
        ));
        (state, store)
    }

    #[tokio::test]
    async fn scoring_is_persisted_and_broadcast() {
        let (state, store) = open_state().await;
        let mut events = state.public_sse().subscribe();

        set_first_server(&state, 100, Side::One).await.unwrap();
        let view = add_point(&state, 100, Side::Two).await.unwrap();
        assert_eq!((view.score1, view.score2), (0, 1));
        assert_eq!(view.serving_player, Some(10));

        let stored = store.load_tournament(1).await.unwrap().unwrap();
        assert_eq!(stored.matches[0].score2, 1);

        let names: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|event| event.event)
            .collect();
        assert!(names.contains(&"match.point_scored".to_string()));
        assert!(names.contains(&"match.updated".to_string()));
    }

    #[tokio::test]
    async fn persistence_failure_keeps_local_state() {
        let (state, store) = open_state().await;
        set_first_server(&state, 100, Side::One).await.unwrap();
        store.set_offline(true);
        let mut events = state.public_sse().subscribe();

        let err = add_point(&state, 100, Side::One).await.unwrap_err();
        assert!(matches!(err, ServiceError::Persistence(_)));

        let session = session_view(&state).await;
        let active = session.active_match.unwrap();
        assert_eq!(active.score1, 1);
        assert_eq!(session.undo_depth, 1);

        let failed = std::iter::from_fn(|| events.try_recv().ok())
            .any(|event| event.event.as_deref() == Some("persistence.failed"));
        assert!(failed);
    }

    #[tokio::test]
    async fn undo_without_history_leaves_the_match_alone() {
        let (state, _) = open_state().await;
        set_first_server(&state, 100, Side::One).await.unwrap();
        let mut events = state.public_sse().subscribe();
        let view = undo(&state, 100).await.unwrap();
        assert_eq!((view.score1, view.score2), (0, 0));
        assert_eq!(view.serving_player, Some(10));
        assert!(events.try_recv().is_err());

        add_point(&state, 100, Side::One).await.unwrap();
        let view = undo(&state, 100).await.unwrap();
        assert_eq!(view.score1, 0);
    }

    #[tokio::test]
    async fn late_save_of_an_older_snapshot_is_dropped() {
        let (state, store) = open_state().await;
        let older = state.next_write_ticket();
        let newer = state.next_write_ticket();

        let mut ahead = Match::new(100, 1, 10, 20, 0);
        ahead.score1 = 2;
        let mut behind = ahead.clone();
        behind.score1 = 1;

        persist_match(&state, "add_point", ahead, newer).await.unwrap();
        persist_match(&state, "add_point", behind, older).await.unwrap();

        let stored = store.load_tournament(1).await.unwrap().unwrap();
        assert_eq!(stored.matches[0].score1, 2);
    }

    #[tokio::test]
    async fn finalize_saves_winner_and_parks_the_session() {
        let (state, store) = open_state().await;
        set_first_server(&state, 100, Side::One).await.unwrap();
        for _ in 0..11 {
            add_point(&state, 100, Side::Two).await.unwrap();
        }
        assert!(matches!(
            add_point(&state, 100, Side::Two).await,
            Err(ServiceError::InvalidState(_))
        ));

        let result = finalize(&state, 100).await.unwrap();
        assert_eq!(result.winner, Side::Two);
        assert!(result.finished.completed);
        assert!(session_view(&state).await.active_match.is_none());

        let stored = store.load_tournament(1).await.unwrap().unwrap();
        assert!(stored.matches[0].completed);
    }

    #[tokio::test]
    async fn serve_selection_names_the_players() {
        let (state, _) = open_state().await;
        let options = serve_selection(&state, 100).await.unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].players[0].name, "Jan Novák");

        set_first_server(&state, 100, Side::Two).await.unwrap();
        assert!(serve_selection(&state, 100).await.is_err());
    }

    #[tokio::test]
    async fn commands_require_an_open_tournament() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            add_point(&state, 1, Side::One).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(session_view(&state).await.session_id.is_none());
    }

    #[tokio::test]
    async fn override_reopens_completed_match() {
        let (state, _) = open_state().await;
        set_first_server(&state, 100, Side::One).await.unwrap();
        for _ in 0..11 {
            add_point(&state, 100, Side::One).await.unwrap();
        }
        finalize(&state, 100).await.unwrap();

        let view = override_score(&state, 100, 9, 7).await.unwrap();
        assert!(!view.completed);
        assert_eq!((view.score1, view.score2), (9, 7));
    }
}
