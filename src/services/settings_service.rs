use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    dao::tournament_store::TournamentStore,
    dto::settings::SettingsView,
    error::ServiceError,
    state::SharedState,
};

/// Current preferences.
pub async fn get_settings(state: &SharedState) -> SettingsView {
    SettingsView::from(&*state.settings().read().await)
}

/// Apply one preference locally, then store it.
///
/// The local value is kept when the store rejects the write.
pub async fn update_setting(
    state: &SharedState,
    key: &str,
    value: Value,
) -> Result<SettingsView, ServiceError> {
    let view = {
        let mut settings = state.settings().write().await;
        let changed = settings
            .apply(key, &value)
            .map_err(ServiceError::InvalidInput)?;
        if changed {
            info!(key, "setting updated");
        }
        SettingsView::from(&*settings)
    };

    let store = state.require_store().await?;
    store.save_settings(key.to_string(), value).await?;
    Ok(view)
}

/// Overlay the stored preferences on the configured defaults.
///
/// Unknown keys and ill-typed values are skipped with a warning.
pub async fn restore_settings(state: &SharedState, store: &Arc<dyn TournamentStore>) {
    let stored = match store.load_settings().await {
        Ok(stored) => stored,
        Err(err) => {
            warn!(error = %err, "failed to load stored settings; keeping current values");
            return;
        }
    };

    let mut settings = state.settings().write().await;
    for (key, value) in stored {
        if let Err(reason) = settings.apply(&key, &value) {
            warn!(key, reason, "ignoring stored setting");
        }
    }
}
