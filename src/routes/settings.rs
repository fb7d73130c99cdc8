use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};

use crate::{
    dto::settings::{SettingsView, UpdateSettingRequest},
    error::AppError,
    services::settings_service,
    state::SharedState,
};

/// UI preference routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/settings", get(get_settings))
        .route("/settings/{key}", put(update_setting))
}

/// Current preferences.
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    responses((status = 200, description = "Preferences", body = SettingsView))
)]
pub async fn get_settings(State(state): State<SharedState>) -> Json<SettingsView> {
    Json(settings_service::get_settings(&state).await)
}

/// Change one preference.
#[utoipa::path(
    put,
    path = "/settings/{key}",
    tag = "settings",
    params(("key" = String, Path, description = "Setting key, e.g. `voice_volume`")),
    request_body = UpdateSettingRequest,
    responses(
        (status = 200, description = "Preference stored", body = SettingsView),
        (status = 400, description = "Unknown key or ill-typed value"),
        (status = 503, description = "Applied locally but not stored")
    )
)]
pub async fn update_setting(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<SettingsView>, AppError> {
    let view = settings_service::update_setting(&state, &key, payload.value).await?;
    Ok(Json(view))
}
