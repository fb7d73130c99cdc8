use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use axum_valid::Valid;

use crate::{
    dto::player::{PlayerInput, PlayerView},
    error::AppError,
    services::player_service,
    state::{SharedState, model::PlayerId},
};

/// Player roster routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players", get(list_players).post(create_player))
        .route("/players/{id}", put(update_player).delete(delete_player))
}

/// List every registered player.
#[utoipa::path(
    get,
    path = "/players",
    tag = "players",
    responses((status = 200, description = "Registered players", body = [PlayerView]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerView>>, AppError> {
    Ok(Json(player_service::list_players(&state).await?))
}

/// Register a player.
#[utoipa::path(
    post,
    path = "/players",
    tag = "players",
    request_body = PlayerInput,
    responses(
        (status = 200, description = "Player created", body = PlayerView),
        (status = 400, description = "Invalid player"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_player(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PlayerInput>>,
) -> Result<Json<PlayerView>, AppError> {
    Ok(Json(player_service::create_player(&state, payload).await?))
}

/// Replace a player record.
#[utoipa::path(
    put,
    path = "/players/{id}",
    tag = "players",
    params(("id" = i64, Path, description = "Player identifier")),
    request_body = PlayerInput,
    responses(
        (status = 200, description = "Player updated", body = PlayerView),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn update_player(
    State(state): State<SharedState>,
    Path(id): Path<PlayerId>,
    Valid(Json(payload)): Valid<Json<PlayerInput>>,
) -> Result<Json<PlayerView>, AppError> {
    Ok(Json(player_service::update_player(&state, id, payload).await?))
}

/// Delete a player that is not part of any tournament.
#[utoipa::path(
    delete,
    path = "/players/{id}",
    tag = "players",
    params(("id" = i64, Path, description = "Player identifier")),
    responses(
        (status = 204, description = "Player deleted"),
        (status = 404, description = "Unknown player"),
        (status = 409, description = "Player takes part in a tournament")
    )
)]
pub async fn delete_player(
    State(state): State<SharedState>,
    Path(id): Path<PlayerId>,
) -> Result<StatusCode, AppError> {
    player_service::delete_player(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
