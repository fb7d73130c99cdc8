use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::matches::{
        FinalizeResponse, FirstServerRequest, MatchView, PointRequest, ScoreOverrideRequest,
        ServeOptionView, SessionView, SuspendResponse,
    },
    error::AppError,
    services::match_service,
    state::{SharedState, model::MatchId},
};

/// Match scoring and session routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches/{id}/play", post(play_match))
        .route("/matches/{id}/serve-selection", get(serve_selection))
        .route("/matches/{id}/first-server", post(set_first_server))
        .route("/matches/{id}/points", post(add_point).delete(subtract_point))
        .route("/matches/{id}/undo", post(undo))
        .route("/matches/{id}/swap-sides", post(swap_sides))
        .route("/matches/{id}/finalize", post(finalize))
        .route("/matches/{id}/score", put(override_score))
        .route("/session", get(session))
        .route("/session/suspend", post(suspend))
}

/// Make a match the one being played.
#[utoipa::path(
    post,
    path = "/matches/{id}/play",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match activated", body = MatchView),
        (status = 404, description = "Match is not part of the open tournament"),
        (status = 409, description = "No tournament is open")
    )
)]
pub async fn play_match(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_service::play_match(&state, id).await?))
}

/// Sides and players available as first server.
#[utoipa::path(
    get,
    path = "/matches/{id}/serve-selection",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Serve options", body = [ServeOptionView]),
        (status = 409, description = "First server already chosen")
    )
)]
pub async fn serve_selection(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<Vec<ServeOptionView>>, AppError> {
    Ok(Json(match_service::serve_selection(&state, id).await?))
}

/// Choose the side serving first.
#[utoipa::path(
    post,
    path = "/matches/{id}/first-server",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    request_body = FirstServerRequest,
    responses(
        (status = 200, description = "First server set", body = MatchView),
        (status = 409, description = "Scoring already started")
    )
)]
pub async fn set_first_server(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
    Json(payload): Json<FirstServerRequest>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_service::set_first_server(&state, id, payload.side).await?))
}

/// Award a point.
#[utoipa::path(
    post,
    path = "/matches/{id}/points",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    request_body = PointRequest,
    responses(
        (status = 200, description = "Point added", body = MatchView),
        (status = 409, description = "Match not in progress or already decided"),
        (status = 503, description = "Point kept locally but not stored")
    )
)]
pub async fn add_point(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
    Json(payload): Json<PointRequest>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_service::add_point(&state, id, payload.side).await?))
}

/// Take a point away.
#[utoipa::path(
    delete,
    path = "/matches/{id}/points",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    request_body = PointRequest,
    responses((status = 200, description = "Point removed", body = MatchView))
)]
pub async fn subtract_point(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
    Json(payload): Json<PointRequest>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_service::subtract_point(&state, id, payload.side).await?))
}

/// Revert the last awarded point.
#[utoipa::path(
    post,
    path = "/matches/{id}/undo",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Point reverted", body = MatchView),
        (status = 409, description = "Nothing to undo")
    )
)]
pub async fn undo(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_service::undo(&state, id).await?))
}

/// Flip the displayed sides.
#[utoipa::path(
    post,
    path = "/matches/{id}/swap-sides",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    responses((status = 200, description = "Sides swapped", body = MatchView))
)]
pub async fn swap_sides(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_service::swap_sides(&state, id).await?))
}

/// Save the result of a decided match.
#[utoipa::path(
    post,
    path = "/matches/{id}/finalize",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Result saved", body = FinalizeResponse),
        (status = 409, description = "No side has won yet")
    )
)]
pub async fn finalize(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
) -> Result<Json<FinalizeResponse>, AppError> {
    Ok(Json(match_service::finalize(&state, id).await?))
}

/// Administrative score replacement; reopens completed matches.
#[utoipa::path(
    put,
    path = "/matches/{id}/score",
    tag = "matches",
    params(("id" = i64, Path, description = "Match identifier")),
    request_body = ScoreOverrideRequest,
    responses((status = 200, description = "Score replaced", body = MatchView))
)]
pub async fn override_score(
    State(state): State<SharedState>,
    Path(id): Path<MatchId>,
    Valid(Json(payload)): Valid<Json<ScoreOverrideRequest>>,
) -> Result<Json<MatchView>, AppError> {
    let view = match_service::override_score(&state, id, payload.score1, payload.score2).await?;
    Ok(Json(view))
}

/// Current scoring session.
#[utoipa::path(
    get,
    path = "/session",
    tag = "matches",
    responses((status = 200, description = "Scoring session", body = SessionView))
)]
pub async fn session(State(state): State<SharedState>) -> Json<SessionView> {
    Json(match_service::session_view(&state).await)
}

/// Park the active match.
#[utoipa::path(
    post,
    path = "/session/suspend",
    tag = "matches",
    responses((status = 200, description = "Match suspended", body = SuspendResponse))
)]
pub async fn suspend(
    State(state): State<SharedState>,
) -> Result<Json<SuspendResponse>, AppError> {
    Ok(Json(match_service::suspend(&state).await?))
}
