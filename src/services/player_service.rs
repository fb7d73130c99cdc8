use tracing::info;

use crate::{
    dao::models::{IdKind, PlayerEntity},
    dto::player::{PlayerInput, PlayerView},
    error::ServiceError,
    state::{
        SharedState,
        model::{Player, PlayerId, Tournament},
    },
};

/// Every registered player.
pub async fn list_players(state: &SharedState) -> Result<Vec<PlayerView>, ServiceError> {
    let store = state.require_store().await?;
    let players = store.list_players().await?;
    Ok(players
        .into_iter()
        .map(|entity| PlayerView::from(Player::from(entity)))
        .collect())
}

/// Register a new player.
pub async fn create_player(
    state: &SharedState,
    input: PlayerInput,
) -> Result<PlayerView, ServiceError> {
    let store = state.require_store().await?;
    let id = store.allocate_ids(IdKind::Player, 1).await?;
    let player = input.into_player(id);
    store.save_player(PlayerEntity::from(player.clone())).await?;
    info!(player_id = id, "player created");
    Ok(PlayerView::from(player))
}

/// Replace a player record. The open session picks up the new name.
pub async fn update_player(
    state: &SharedState,
    id: PlayerId,
    input: PlayerInput,
) -> Result<PlayerView, ServiceError> {
    let store = state.require_store().await?;
    let exists = store.list_players().await?.iter().any(|player| player.id == id);
    if !exists {
        return Err(ServiceError::NotFound(format!("player `{id}` not found")));
    }

    let player = input.into_player(id);
    store.save_player(PlayerEntity::from(player.clone())).await?;
    if let Some(session) = state.session().write().await.as_mut() {
        session.upsert_player(player.clone());
    }
    info!(player_id = id, "player updated");
    Ok(PlayerView::from(player))
}

/// Delete a player that does not take part in any tournament.
pub async fn delete_player(state: &SharedState, id: PlayerId) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    for item in store.list_tournaments().await? {
        let Some(entity) = store.load_tournament(item.id).await? else {
            continue;
        };
        if Tournament::from(entity).includes_player(id) {
            return Err(ServiceError::InvalidState(format!(
                "player `{id}` takes part in tournament `{}`",
                item.name
            )));
        }
    }

    if !store.delete_player(id).await? {
        return Err(ServiceError::NotFound(format!("player `{id}` not found")));
    }
    info!(player_id = id, "player deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::tournament_store::memory::MemoryTournamentStore,
        dto::tournament::CreateTournamentRequest,
        services::tournament_service,
        state::{
            AppState,
            model::{PointsToWin, TournamentType},
        },
    };

    fn input(name: &str) -> PlayerInput {
        PlayerInput {
            name: name.into(),
            nickname: Some("  ".into()),
            photo_url: None,
            strengths: String::new(),
            weaknesses: String::new(),
        }
    }

    async fn connected() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.set_store(Arc::new(MemoryTournamentStore::new())).await;
        state
    }

    #[tokio::test]
    async fn create_update_and_list() {
        let state = connected().await;
        let created = create_player(&state, input(" Jan ")).await.unwrap();
        assert_eq!(created.name, "Jan");
        assert_eq!(created.nickname, None);

        update_player(&state, created.id, input("Jan Novák")).await.unwrap();
        let players = list_players(&state).await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Jan Novák");

        assert!(matches!(
            update_player(&state, 999, input("Ghost")).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn players_in_a_tournament_cannot_be_deleted() {
        let state = connected().await;
        let a = create_player(&state, input("Jan")).await.unwrap();
        let b = create_player(&state, input("Petr")).await.unwrap();
        let c = create_player(&state, input("Eva")).await.unwrap();
        tournament_service::create_tournament(
            &state,
            CreateTournamentRequest {
                name: "Club night".into(),
                points_to_win: PointsToWin::Eleven,
                kind: TournamentType::Single,
                player_ids: vec![a.id, b.id],
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            delete_player(&state, a.id).await,
            Err(ServiceError::InvalidState(_))
        ));
        delete_player(&state, c.id).await.unwrap();
        assert!(matches!(
            delete_player(&state, c.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn degraded_mode_rejects_roster_changes() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            create_player(&state, input("Jan")).await,
            Err(ServiceError::Degraded)
        ));
    }
}
