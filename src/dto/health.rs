use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Whether a tournament is currently open for scoring.
    pub session_open: bool,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(session_open: bool) -> Self {
        Self {
            status: "ok".to_string(),
            session_open,
        }
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded(session_open: bool) -> Self {
        Self {
            status: "degraded".to_string(),
            session_open,
        }
    }
}
