use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::input::{InputEventDto, InputResponse},
    error::AppError,
    services::input_service,
    state::SharedState,
};

/// Single-event input route.
pub fn router() -> Router<SharedState> {
    Router::new().route("/input", post(submit_input))
}

/// Dispatch one pointer, keyboard or speech event to the active match.
#[utoipa::path(
    post,
    path = "/input",
    tag = "input",
    request_body = InputEventDto,
    responses(
        (status = 200, description = "Input applied or ignored", body = InputResponse),
        (status = 409, description = "Command not allowed in the current match phase")
    )
)]
pub async fn submit_input(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<InputEventDto>>,
) -> Result<Json<InputResponse>, AppError> {
    Ok(Json(input_service::handle_input(&state, payload.into()).await?))
}
