use serde::{Deserialize, Serialize};
use serde_json::Value;

/// UI preferences read by the scoring hooks (sounds, voice assistant, voice input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Play a sound after every point.
    pub sounds_enabled: bool,
    /// Announce score and server after every point.
    pub voice_assist_enabled: bool,
    /// Accept spoken commands.
    pub voice_input_enabled: bool,
    /// Append an encouraging phrase to score announcements.
    pub motivational_phrases_enabled: bool,
    /// Show locked tournaments in listings.
    pub show_locked_tournaments: bool,
    /// Announcement volume between 0 and 1.
    pub voice_volume: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sounds_enabled: true,
            voice_assist_enabled: false,
            voice_input_enabled: false,
            motivational_phrases_enabled: true,
            show_locked_tournaments: false,
            voice_volume: 1.0,
        }
    }
}

impl Settings {
    /// Keys accepted by [`Settings::apply`].
    pub const KEYS: [&'static str; 6] = [
        "sounds_enabled",
        "voice_assist_enabled",
        "voice_input_enabled",
        "motivational_phrases_enabled",
        "show_locked_tournaments",
        "voice_volume",
    ];

    /// Update one preference from its JSON value.
    ///
    /// Returns `Ok(true)` when the value changed.
    pub fn apply(&mut self, key: &str, value: &Value) -> Result<bool, String> {
        let flag = |value: &Value| {
            value
                .as_bool()
                .ok_or_else(|| format!("setting `{key}` expects a boolean"))
        };

        let changed = match key {
            "sounds_enabled" => replace(&mut self.sounds_enabled, flag(value)?),
            "voice_assist_enabled" => replace(&mut self.voice_assist_enabled, flag(value)?),
            "voice_input_enabled" => replace(&mut self.voice_input_enabled, flag(value)?),
            "motivational_phrases_enabled" => {
                replace(&mut self.motivational_phrases_enabled, flag(value)?)
            }
            "show_locked_tournaments" => replace(&mut self.show_locked_tournaments, flag(value)?),
            "voice_volume" => {
                let volume = value
                    .as_f64()
                    .filter(|volume| (0.0..=1.0).contains(volume))
                    .ok_or_else(|| format!("setting `{key}` expects a number between 0 and 1"))?;
                replace(&mut self.voice_volume, volume)
            }
            other => return Err(format!("unknown setting `{other}`")),
        };
        Ok(changed)
    }

    /// Whether point announcements should be produced at all.
    pub fn announcements_enabled(&self) -> bool {
        self.voice_assist_enabled || self.voice_input_enabled
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_match_first_run_behaviour() {
        let settings = Settings::default();
        assert!(settings.sounds_enabled);
        assert!(!settings.voice_assist_enabled);
        assert!(settings.motivational_phrases_enabled);
        assert!(!settings.announcements_enabled());
    }

    #[test]
    fn apply_reports_changes_only() {
        let mut settings = Settings::default();
        assert_eq!(settings.apply("sounds_enabled", &json!(true)), Ok(false));
        assert_eq!(settings.apply("voice_input_enabled", &json!(true)), Ok(true));
        assert!(settings.announcements_enabled());
        assert_eq!(settings.apply("voice_volume", &json!(0.4)), Ok(true));
        assert_eq!(settings.voice_volume, 0.4);
    }

    #[test]
    fn apply_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(settings.apply("voice_volume", &json!(3)).is_err());
        assert!(settings.apply("sounds_enabled", &json!("yes")).is_err());
        assert!(settings.apply("theme", &json!("dark")).is_err());
        assert_eq!(settings, Settings::default());
    }
}
