use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        matches::SessionView,
        tournament::{
            CreateTournamentRequest, ListTournamentsQuery, ReorderMatchesRequest,
            TournamentDetail, TournamentListItem, UpdateTournamentRequest,
        },
    },
    error::AppError,
    services::tournament_service,
    state::{SharedState, model::TournamentId},
};

/// Tournament management routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/tournaments", get(list_tournaments).post(create_tournament))
        .route(
            "/tournaments/{id}",
            get(get_tournament)
                .put(update_tournament)
                .delete(delete_tournament),
        )
        .route("/tournaments/{id}/lock", post(toggle_lock))
        .route("/tournaments/{id}/copy", post(copy_tournament))
        .route("/tournaments/{id}/open", post(open_tournament))
        .route("/tournaments/{id}/match-order", put(reorder_matches))
}

/// List tournaments, newest first.
#[utoipa::path(
    get,
    path = "/tournaments",
    tag = "tournaments",
    params(ListTournamentsQuery),
    responses((status = 200, description = "Tournaments", body = [TournamentListItem]))
)]
pub async fn list_tournaments(
    State(state): State<SharedState>,
    Query(query): Query<ListTournamentsQuery>,
) -> Result<Json<Vec<TournamentListItem>>, AppError> {
    let items = tournament_service::list_tournaments(&state, query.include_locked).await?;
    Ok(Json(items))
}

/// Create a tournament and generate its matches.
#[utoipa::path(
    post,
    path = "/tournaments",
    tag = "tournaments",
    request_body = CreateTournamentRequest,
    responses(
        (status = 200, description = "Tournament created", body = TournamentDetail),
        (status = 400, description = "Invalid composition")
    )
)]
pub async fn create_tournament(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateTournamentRequest>>,
) -> Result<Json<TournamentDetail>, AppError> {
    Ok(Json(tournament_service::create_tournament(&state, payload).await?))
}

/// Tournament with its teams and matches.
#[utoipa::path(
    get,
    path = "/tournaments/{id}",
    tag = "tournaments",
    params(("id" = i64, Path, description = "Tournament identifier")),
    responses(
        (status = 200, description = "Tournament", body = TournamentDetail),
        (status = 404, description = "Unknown tournament")
    )
)]
pub async fn get_tournament(
    State(state): State<SharedState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<TournamentDetail>, AppError> {
    Ok(Json(tournament_service::get_tournament(&state, id).await?))
}

/// Partially update a tournament.
#[utoipa::path(
    put,
    path = "/tournaments/{id}",
    tag = "tournaments",
    params(("id" = i64, Path, description = "Tournament identifier")),
    request_body = UpdateTournamentRequest,
    responses(
        (status = 200, description = "Tournament updated", body = TournamentDetail),
        (status = 400, description = "Invalid composition"),
        (status = 409, description = "Locked, or type change after scoring started")
    )
)]
pub async fn update_tournament(
    State(state): State<SharedState>,
    Path(id): Path<TournamentId>,
    Valid(Json(payload)): Valid<Json<UpdateTournamentRequest>>,
) -> Result<Json<TournamentDetail>, AppError> {
    Ok(Json(tournament_service::update_tournament(&state, id, payload).await?))
}

/// Delete a tournament and its matches.
#[utoipa::path(
    delete,
    path = "/tournaments/{id}",
    tag = "tournaments",
    params(("id" = i64, Path, description = "Tournament identifier")),
    responses(
        (status = 204, description = "Tournament deleted"),
        (status = 404, description = "Unknown tournament")
    )
)]
pub async fn delete_tournament(
    State(state): State<SharedState>,
    Path(id): Path<TournamentId>,
) -> Result<StatusCode, AppError> {
    tournament_service::delete_tournament(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lock or unlock a tournament.
#[utoipa::path(
    post,
    path = "/tournaments/{id}/lock",
    tag = "tournaments",
    params(("id" = i64, Path, description = "Tournament identifier")),
    responses((status = 200, description = "Lock toggled", body = TournamentDetail))
)]
pub async fn toggle_lock(
    State(state): State<SharedState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<TournamentDetail>, AppError> {
    Ok(Json(tournament_service::toggle_lock(&state, id).await?))
}

/// Copy a tournament under a unique name.
#[utoipa::path(
    post,
    path = "/tournaments/{id}/copy",
    tag = "tournaments",
    params(("id" = i64, Path, description = "Tournament identifier")),
    responses((status = 200, description = "Tournament copied", body = TournamentDetail))
)]
pub async fn copy_tournament(
    State(state): State<SharedState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<TournamentDetail>, AppError> {
    Ok(Json(tournament_service::copy_tournament(&state, id).await?))
}

/// Open a tournament for scoring.
#[utoipa::path(
    post,
    path = "/tournaments/{id}/open",
    tag = "tournaments",
    params(("id" = i64, Path, description = "Tournament identifier")),
    responses((status = 200, description = "Scoring session opened", body = SessionView))
)]
pub async fn open_tournament(
    State(state): State<SharedState>,
    Path(id): Path<TournamentId>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(tournament_service::open_tournament(&state, id).await?))
}

/// Reorder the upcoming matches.
#[utoipa::path(
    put,
    path = "/tournaments/{id}/match-order",
    tag = "tournaments",
    params(("id" = i64, Path, description = "Tournament identifier")),
    request_body = ReorderMatchesRequest,
    responses(
        (status = 200, description = "Matches reordered", body = TournamentDetail),
        (status = 400, description = "Order does not list exactly the upcoming matches")
    )
)]
pub async fn reorder_matches(
    State(state): State<SharedState>,
    Path(id): Path<TournamentId>,
    Valid(Json(payload)): Valid<Json<ReorderMatchesRequest>>,
) -> Result<Json<TournamentDetail>, AppError> {
    let detail = tournament_service::reorder_matches(&state, id, &payload.match_ids).await?;
    Ok(Json(detail))
}
