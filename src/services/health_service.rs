use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage connectivity and whether a tournament is open.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let session_open = state.session().read().await.is_some();
    if state.is_degraded() {
        HealthResponse::degraded(session_open)
    } else {
        HealthResponse::ok(session_open)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::tournament_store::memory::MemoryTournamentStore, state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_without_store() {
        let state = AppState::new(AppConfig::default());
        let response = health_status(&state).await;
        assert_eq!(response.status, "degraded");
        assert!(!response.session_open);

        state.set_store(Arc::new(MemoryTournamentStore::new())).await;
        assert_eq!(health_status(&state).await.status, "ok");
    }
}
