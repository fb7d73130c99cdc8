use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::state::Settings;

/// Current UI preferences.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SettingsView {
    pub sounds_enabled: bool,
    pub voice_assist_enabled: bool,
    pub voice_input_enabled: bool,
    pub motivational_phrases_enabled: bool,
    pub show_locked_tournaments: bool,
    pub voice_volume: f64,
}

impl From<&Settings> for SettingsView {
    fn from(settings: &Settings) -> Self {
        Self {
            sounds_enabled: settings.sounds_enabled,
            voice_assist_enabled: settings.voice_assist_enabled,
            voice_input_enabled: settings.voice_input_enabled,
            motivational_phrases_enabled: settings.motivational_phrases_enabled,
            show_locked_tournaments: settings.show_locked_tournaments,
            voice_volume: settings.voice_volume,
        }
    }
}

/// New value for one setting key.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingRequest {
    #[schema(value_type = Object)]
    pub value: Value,
}
