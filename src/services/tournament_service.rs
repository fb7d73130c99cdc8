//! Tournament lifecycle: creation with schedule generation, edits, locking,
//! copies, deletion and opening a tournament for scoring.

use std::{collections::HashSet, sync::Arc, time::SystemTime};

use tracing::info;

use crate::{
    dao::{
        models::{IdKind, TournamentEntity},
        tournament_store::TournamentStore,
    },
    dto::{
        matches::SessionView,
        tournament::{
            CreateTournamentRequest, TournamentDetail, TournamentListItem, UpdateTournamentRequest,
        },
    },
    error::ServiceError,
    services::{match_service, sse_events},
    state::{
        ScoringSession, SharedState,
        generation::{
            ValidationError, copy_player_order, generate_pairings, plan_composition_change,
            reorder_upcoming, unique_tournament_name, validate_composition,
        },
        model::{MatchId, Player, PlayerId, Tournament, TournamentId, TournamentType},
    },
};

/// Tournaments for the listing screen, newest first.
///
/// Locked tournaments are hidden unless requested or enabled in the settings.
pub async fn list_tournaments(
    state: &SharedState,
    include_locked: Option<bool>,
) -> Result<Vec<TournamentListItem>, ServiceError> {
    let include_locked = match include_locked {
        Some(flag) => flag,
        None => state.settings().read().await.show_locked_tournaments,
    };
    let store = state.require_store().await?;
    Ok(store
        .list_tournaments()
        .await?
        .into_iter()
        .filter(|item| include_locked || !item.is_locked)
        .map(TournamentListItem::from)
        .collect())
}

/// Tournament with its schedule. The open session's copy wins over the stored one.
pub async fn get_tournament(
    state: &SharedState,
    id: TournamentId,
) -> Result<TournamentDetail, ServiceError> {
    let tournament = load_current(state, id).await?;
    Ok(TournamentDetail::from(&tournament))
}

/// Create a tournament and generate its matches.
pub async fn create_tournament(
    state: &SharedState,
    request: CreateTournamentRequest,
) -> Result<TournamentDetail, ServiceError> {
    let store = state.require_store().await?;
    check_players(store.as_ref(), request.kind, &request.player_ids).await?;

    let id = store.allocate_ids(IdKind::Tournament, 1).await?;
    let mut tournament = Tournament {
        id,
        name: request.name.trim().to_string(),
        points_to_win: request.points_to_win,
        kind: request.kind,
        is_locked: false,
        created_at: SystemTime::now(),
        player_ids: request.player_ids,
        teams: Vec::new(),
        matches: Vec::new(),
    };
    regenerate(store.as_ref(), &mut tournament).await?;

    store.save_tournament(TournamentEntity::from(tournament.clone())).await?;
    info!(
        tournament_id = id,
        kind = tournament.kind.as_str(),
        matches = tournament.matches.len(),
        "tournament created"
    );
    let detail = TournamentDetail::from(&tournament);
    sse_events::broadcast_tournament_updated(state, TournamentDetail::from(&tournament));
    Ok(detail)
}

/// Partial update. Matches are regenerated when the ordered player list or the type changed.
pub async fn update_tournament(
    state: &SharedState,
    id: TournamentId,
    request: UpdateTournamentRequest,
) -> Result<TournamentDetail, ServiceError> {
    let store = state.require_store().await?;
    let mut tournament = load_current(state, id).await?;

    let kind = request.kind.unwrap_or(tournament.kind);
    let player_ids = request
        .player_ids
        .unwrap_or_else(|| tournament.player_ids.clone());
    if plan_composition_change(&tournament, kind, &player_ids)? {
        check_players(store.as_ref(), kind, &player_ids).await?;
        tournament.kind = kind;
        tournament.player_ids = player_ids;
        regenerate(store.as_ref(), &mut tournament).await?;
        info!(tournament_id = id, "tournament composition changed; matches regenerated");
    }

    if let Some(name) = request.name {
        tournament.name = name.trim().to_string();
    }
    if let Some(points_to_win) = request.points_to_win
        && points_to_win != tournament.points_to_win
    {
        tournament.points_to_win = points_to_win;
        let open: Vec<MatchId> = tournament
            .matches
            .iter()
            .filter(|current| !current.completed)
            .map(|current| current.id)
            .collect();
        for match_id in open {
            if let Some((current, ctx)) = tournament.match_with_context_mut(match_id) {
                current.recalculate_service_state(&ctx);
            }
        }
    }

    store_tournament(state, store, tournament).await
}

/// Delete a tournament, closing the session when it was open.
pub async fn delete_tournament(state: &SharedState, id: TournamentId) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    if !store.delete_tournament(id).await? {
        return Err(ServiceError::NotFound(format!("tournament `{id}` not found")));
    }
    {
        let mut session = state.session().write().await;
        if session.as_ref().is_some_and(|open| open.tournament().id == id) {
            session.take();
            info!(tournament_id = id, "open tournament deleted; session closed");
        }
    }
    sse_events::broadcast_tournament_deleted(state, id);
    info!(tournament_id = id, "tournament deleted");
    Ok(())
}

/// Flip the lock flag.
pub async fn toggle_lock(
    state: &SharedState,
    id: TournamentId,
) -> Result<TournamentDetail, ServiceError> {
    let store = state.require_store().await?;
    let mut tournament = load_current(state, id).await?;
    tournament.is_locked = !tournament.is_locked;
    info!(tournament_id = id, locked = tournament.is_locked, "tournament lock toggled");
    store_tournament(state, store, tournament).await
}

/// Copy a tournament under a fresh name with a new schedule.
///
/// Doubles copies reshuffle the teams; every match starts with swapped sides.
pub async fn copy_tournament(
    state: &SharedState,
    id: TournamentId,
) -> Result<TournamentDetail, ServiceError> {
    let store = state.require_store().await?;
    let source = load_current(state, id).await?;
    let existing = store.list_tournaments().await?;
    let name = unique_tournament_name(&source.name, existing.iter().map(|item| item.name.as_str()));

    let new_id = store.allocate_ids(IdKind::Tournament, 1).await?;
    let mut copy = Tournament {
        id: new_id,
        name,
        points_to_win: source.points_to_win,
        kind: source.kind,
        is_locked: false,
        created_at: SystemTime::now(),
        player_ids: copy_player_order(source.kind, &source.player_ids),
        teams: Vec::new(),
        matches: Vec::new(),
    };
    regenerate(store.as_ref(), &mut copy).await?;
    for current in &mut copy.matches {
        current.sides_swapped = true;
    }

    store.save_tournament(TournamentEntity::from(copy.clone())).await?;
    info!(source_id = id, tournament_id = new_id, name = %copy.name, "tournament copied");
    let detail = TournamentDetail::from(&copy);
    sse_events::broadcast_tournament_updated(state, TournamentDetail::from(&copy));
    Ok(detail)
}

/// Reorder the upcoming matches.
pub async fn reorder_matches(
    state: &SharedState,
    id: TournamentId,
    match_ids: &[MatchId],
) -> Result<TournamentDetail, ServiceError> {
    let store = state.require_store().await?;
    let mut tournament = load_current(state, id).await?;
    reorder_upcoming(&mut tournament.matches, match_ids)?;
    store_tournament(state, store, tournament).await
}

/// Open a tournament for scoring, replacing any previous session.
pub async fn open_tournament(
    state: &SharedState,
    id: TournamentId,
) -> Result<SessionView, ServiceError> {
    let store = state.require_store().await?;
    let tournament: Tournament = store
        .load_tournament(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("tournament `{id}` not found")))?
        .into();
    let players = roster(store.as_ref(), &tournament.player_ids).await?;

    *state.session().write().await = Some(ScoringSession::new(tournament, players));
    info!(tournament_id = id, "tournament opened for scoring");
    Ok(match_service::session_view(state).await)
}

async fn load_current(state: &SharedState, id: TournamentId) -> Result<Tournament, ServiceError> {
    if let Some(session) = state.session().read().await.as_ref()
        && session.tournament().id == id
    {
        return Ok(session.tournament().clone());
    }
    let store = state.require_store().await?;
    store
        .load_tournament(id)
        .await?
        .map(Tournament::from)
        .ok_or_else(|| ServiceError::NotFound(format!("tournament `{id}` not found")))
}

/// Persist first, then refresh the open session and notify subscribers.
async fn store_tournament(
    state: &SharedState,
    store: Arc<dyn TournamentStore>,
    tournament: Tournament,
) -> Result<TournamentDetail, ServiceError> {
    store
        .save_tournament(TournamentEntity::from(tournament.clone()))
        .await?;

    let is_open = state
        .session()
        .read()
        .await
        .as_ref()
        .is_some_and(|session| session.tournament().id == tournament.id);
    if is_open {
        let players = roster(store.as_ref(), &tournament.player_ids).await?;
        if let Some(session) = state.session().write().await.as_mut() {
            session.replace_tournament(tournament.clone(), players);
        }
    }

    let detail = TournamentDetail::from(&tournament);
    sse_events::broadcast_tournament_updated(state, TournamentDetail::from(&tournament));
    Ok(detail)
}

/// Replace teams and matches with a freshly generated schedule.
async fn regenerate(
    store: &dyn TournamentStore,
    tournament: &mut Tournament,
) -> Result<(), ServiceError> {
    let pairings = generate_pairings(tournament.kind, &tournament.player_ids);
    let first_team_id = match pairings.team_count() {
        0 => 0,
        count => store.allocate_ids(IdKind::Team, count).await?,
    };
    let first_match_id = match pairings.match_count() {
        0 => 0,
        count => store.allocate_ids(IdKind::Match, count).await?,
    };
    let (teams, matches) = pairings.materialize(tournament.id, first_team_id, first_match_id);
    tournament.teams = teams;
    tournament.matches = matches;
    Ok(())
}

/// Composition rules plus the existence of every listed player.
async fn check_players(
    store: &dyn TournamentStore,
    kind: TournamentType,
    player_ids: &[PlayerId],
) -> Result<(), ServiceError> {
    let mut violations = validate_composition(kind, player_ids)
        .err()
        .map(|err| err.violations)
        .unwrap_or_default();

    let known: HashSet<PlayerId> = store
        .list_players()
        .await?
        .into_iter()
        .map(|player| player.id)
        .collect();
    violations.extend(
        player_ids
            .iter()
            .filter(|id| !known.contains(id))
            .map(|id| format!("player {id} does not exist")),
    );

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations }.into())
    }
}

async fn roster(
    store: &dyn TournamentStore,
    player_ids: &[PlayerId],
) -> Result<Vec<Player>, ServiceError> {
    let wanted: HashSet<PlayerId> = player_ids.iter().copied().collect();
    Ok(store
        .list_players()
        .await?
        .into_iter()
        .filter(|player| wanted.contains(&player.id))
        .map(Player::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{models::PlayerEntity, tournament_store::memory::MemoryTournamentStore},
        services::match_service,
        state::{
            AppState,
            model::{PointsToWin, Side},
        },
    };

    async fn connected(players: usize) -> (SharedState, Arc<MemoryTournamentStore>) {
        let store = Arc::new(MemoryTournamentStore::new());
        for id in 1..=players as i64 {
            store
                .save_player(PlayerEntity {
                    id,
                    name: format!("Player {id}"),
                    nickname: None,
                    photo_url: String::new(),
                    strengths: String::new(),
                    weaknesses: String::new(),
                    updated_at: SystemTime::now(),
                })
                .await
                .unwrap();
        }
        store.allocate_ids(IdKind::Player, players).await.unwrap();
        let state = AppState::new(AppConfig::default());
        state.set_store(store.clone()).await;
        (state, store)
    }

    fn request(kind: TournamentType, player_ids: Vec<PlayerId>) -> CreateTournamentRequest {
        CreateTournamentRequest {
            name: "Club night".into(),
            points_to_win: PointsToWin::Eleven,
            kind,
            player_ids,
        }
    }

    #[tokio::test]
    async fn create_generates_round_robin() {
        let (state, _) = connected(4).await;
        let detail = create_tournament(&state, request(TournamentType::Single, vec![1, 2, 3, 4]))
            .await
            .unwrap();
        assert_eq!(detail.matches.len(), 6);
        assert!(detail.teams.is_empty());

        let detail = create_tournament(&state, request(TournamentType::Double, vec![1, 2, 3, 4]))
            .await
            .unwrap();
        assert_eq!(detail.teams.len(), 2);
        assert_eq!(detail.matches.len(), 1);

        let names: Vec<String> = list_tournaments(&state, Some(true))
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["Club night".to_string(), "Club night".to_string()]);
    }

    #[tokio::test]
    async fn create_reports_every_violation() {
        let (state, _) = connected(2).await;
        let err = create_tournament(&state, request(TournamentType::Double, vec![1, 2, 9]))
            .await
            .unwrap_err();
        let ServiceError::Validation(validation) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(validation.violations.len() >= 2);
        assert!(validation
            .violations
            .iter()
            .any(|violation| violation.contains("player 9")));
    }

    #[tokio::test]
    async fn player_change_regenerates_and_supersedes_matches() {
        let (state, store) = connected(4).await;
        let created = create_tournament(&state, request(TournamentType::Single, vec![1, 2, 3]))
            .await
            .unwrap();

        let updated = update_tournament(
            &state,
            created.id,
            UpdateTournamentRequest {
                player_ids: Some(vec![1, 2, 3, 4]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.matches.len(), 6);
        assert_eq!(store.superseded_matches(created.id).len(), 3);

        let renamed = update_tournament(
            &state,
            created.id,
            UpdateTournamentRequest {
                name: Some("Finals".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Finals");
        let ids: Vec<MatchId> = renamed.matches.iter().map(|m| m.id).collect();
        let before: Vec<MatchId> = updated.matches.iter().map(|m| m.id).collect();
        assert_eq!(ids, before);
    }

    #[tokio::test]
    async fn type_change_is_rejected_after_progress() {
        let (state, _) = connected(4).await;
        let created = create_tournament(&state, request(TournamentType::Single, vec![1, 2, 3, 4]))
            .await
            .unwrap();
        open_tournament(&state, created.id).await.unwrap();
        let first = created.matches[0].id;
        match_service::set_first_server(&state, first, Side::One).await.unwrap();
        match_service::add_point(&state, first, Side::One).await.unwrap();

        let err = update_tournament(
            &state,
            created.id,
            UpdateTournamentRequest {
                kind: Some(TournamentType::Double),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn locked_tournament_rejects_composition_changes() {
        let (state, _) = connected(4).await;
        let created = create_tournament(&state, request(TournamentType::Single, vec![1, 2]))
            .await
            .unwrap();
        let locked = toggle_lock(&state, created.id).await.unwrap();
        assert!(locked.is_locked);

        let err = update_tournament(
            &state,
            created.id,
            UpdateTournamentRequest {
                player_ids: Some(vec![1, 2, 3]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        assert!(list_tournaments(&state, None).await.unwrap().is_empty());
        assert_eq!(list_tournaments(&state, Some(true)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn copy_gets_unique_name_and_swapped_sides() {
        let (state, _) = connected(4).await;
        let created = create_tournament(&state, request(TournamentType::Single, vec![1, 2, 3]))
            .await
            .unwrap();

        let copy = copy_tournament(&state, created.id).await.unwrap();
        assert_eq!(copy.name, "Club night (2)");
        assert!(copy.matches.iter().all(|m| m.sides_swapped));

        let second = copy_tournament(&state, copy.id).await.unwrap();
        assert_eq!(second.name, "Club night (3)");
    }

    #[tokio::test]
    async fn points_change_updates_open_session() {
        let (state, _) = connected(2).await;
        let created = create_tournament(&state, request(TournamentType::Single, vec![1, 2]))
            .await
            .unwrap();
        open_tournament(&state, created.id).await.unwrap();

        update_tournament(
            &state,
            created.id,
            UpdateTournamentRequest {
                points_to_win: Some(PointsToWin::TwentyOne),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let guard = state.session().read().await;
        let session = guard.as_ref().unwrap();
        assert_eq!(session.tournament().points_to_win, PointsToWin::TwentyOne);
    }

    #[tokio::test]
    async fn reorder_and_delete() {
        let (state, _) = connected(3).await;
        let created = create_tournament(&state, request(TournamentType::Single, vec![1, 2, 3]))
            .await
            .unwrap();
        let mut ids: Vec<MatchId> = created.matches.iter().map(|m| m.id).collect();
        ids.reverse();

        let reordered = reorder_matches(&state, created.id, &ids).await.unwrap();
        let order: Vec<MatchId> = reordered.matches.iter().map(|m| m.id).collect();
        assert_eq!(order, ids);

        open_tournament(&state, created.id).await.unwrap();
        delete_tournament(&state, created.id).await.unwrap();
        assert!(state.session().read().await.is_none());
        assert!(matches!(
            get_tournament(&state, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
