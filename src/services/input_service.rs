use tracing::debug;

use crate::{
    dto::input::InputResponse,
    error::ServiceError,
    services::{
        input_dispatcher::{Dispatch, DispatchContext, InputEvent, MatchCommand},
        match_service, sse_events,
    },
    state::{SharedState, model::Side},
};

/// Translate one input event and apply it to the active match.
pub async fn handle_input(
    state: &SharedState,
    event: InputEvent,
) -> Result<InputResponse, ServiceError> {
    let settings = state.settings_snapshot().await;

    let (match_id, dispatch) = {
        let guard = state.session().read().await;
        let Some(session) = guard.as_ref() else {
            return Ok(InputResponse::ignored("no tournament is open"));
        };
        let Some(current) = session.active_match() else {
            return Ok(InputResponse::ignored("no active match"));
        };
        let tournament = session.tournament();
        let ctx = tournament.context();
        let competitors = [Side::One, Side::Two]
            .into_iter()
            .flat_map(|side| {
                ctx.side_players(current, side)
                    .into_iter()
                    .filter_map(move |id| session.player(id).map(|player| (side, player)))
            })
            .collect();
        let dispatch_ctx = DispatchContext {
            current,
            points_to_win: tournament.points_to_win,
            competitors,
            voice_enabled: settings.voice_input_enabled,
        };
        (current.id, state.dispatcher().dispatch(&dispatch_ctx, &event))
    };

    let command = match dispatch {
        Dispatch::Command(command) => command,
        Dispatch::Ignored(reason) => {
            debug!(match_id, reason, "input ignored");
            return Ok(InputResponse::ignored(reason));
        }
    };

    let result = match_service::execute(state, match_id, command).await?;

    if matches!(event, InputEvent::Speech { .. }) {
        let ack = match command {
            MatchCommand::Undo => state.announcer().undo_ack(&settings),
            MatchCommand::SwapSides => state.announcer().swap_ack(&settings),
            _ => None,
        };
        if let Some(ack) = ack {
            sse_events::broadcast_announcement(state, &ack);
        }
    }

    Ok(InputResponse::applied(command, result.current))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::tournament_store::{TournamentStore, memory::MemoryTournamentStore},
        services::input_dispatcher::ArrowKey,
        state::{
            AppState, ScoringSession,
            model::{Match, Player, PointsToWin, Tournament, TournamentType},
        },
    };

    fn player(id: i64, name: &str) -> Player {
        Player {
            id,
            name: name.into(),
            nickname: None,
            photo_url: String::new(),
            strengths: String::new(),
            weaknesses: String::new(),
        }
    }

    async fn playing_state() -> SharedState {
        let tournament = Tournament {
            id: 1,
            name: "Club night".into(),
            points_to_win: PointsToWin::Eleven,
            kind: TournamentType::Single,
            is_locked: false,
            created_at: SystemTime::now(),
            player_ids: vec![10, 20],
            teams: Vec::new(),
            matches: vec![Match::new(100, 1, 10, 20, 0)],
        };
        let store = Arc::new(MemoryTournamentStore::new());
        store.save_tournament(tournament.clone().into()).await.unwrap();

        let state = AppState::new(AppConfig::default());
        state.set_store(store).await;
        let mut session = ScoringSession::new(
            tournament,
            vec![player(10, "Jan Novák"), player(20, "Petr Svoboda")],
        );
        session.play(100).unwrap();
        *state.session().write().await = Some(session);
        state
    }

    #[tokio::test]
    async fn keyboard_selects_server_then_scores() {
        let state = playing_state().await;

        let response = handle_input(&state, InputEvent::Key(ArrowKey::Right))
            .await
            .unwrap();
        assert_eq!(response.command, Some(MatchCommand::SetFirstServer(Side::Two)));

        let response = handle_input(&state, InputEvent::Key(ArrowKey::Left))
            .await
            .unwrap();
        assert_eq!(response.command, Some(MatchCommand::AddPoint(Side::One)));
        assert_eq!(response.current.unwrap().score1, 1);
    }

    #[tokio::test]
    async fn speech_is_ignored_until_voice_input_is_enabled() {
        let state = playing_state().await;
        let speech = InputEvent::Speech {
            transcript: "Jan".into(),
        };

        let response = handle_input(&state, speech.clone()).await.unwrap();
        assert_eq!(response.outcome, "ignored");

        state.settings().write().await.voice_input_enabled = true;
        let response = handle_input(&state, speech).await.unwrap();
        assert_eq!(response.command, Some(MatchCommand::SetFirstServer(Side::One)));

        let response = handle_input(
            &state,
            InputEvent::Speech {
                transcript: "bod Svoboda".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.command, Some(MatchCommand::AddPoint(Side::Two)));
    }

    #[tokio::test]
    async fn voice_undo_is_acknowledged() {
        let state = playing_state().await;
        {
            let mut settings = state.settings().write().await;
            settings.voice_input_enabled = true;
            settings.voice_assist_enabled = true;
        }
        handle_input(&state, InputEvent::Pointer { side: Side::One })
            .await
            .unwrap_err();
        handle_input(&state, InputEvent::Key(ArrowKey::Left)).await.unwrap();
        handle_input(&state, InputEvent::Pointer { side: Side::Two }).await.unwrap();

        let mut events = state.public_sse().subscribe();
        let response = handle_input(
            &state,
            InputEvent::Speech {
                transcript: "zpět".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.command, Some(MatchCommand::Undo));

        let announced = std::iter::from_fn(|| events.try_recv().ok())
            .any(|event| event.event.as_deref() == Some("announcement"));
        assert!(announced);
    }

    #[tokio::test]
    async fn input_without_active_match_is_ignored() {
        let state = AppState::new(AppConfig::default());
        let response = handle_input(&state, InputEvent::Pointer { side: Side::One })
            .await
            .unwrap();
        assert_eq!(response.outcome, "ignored");
    }
}
