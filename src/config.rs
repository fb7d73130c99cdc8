//! Application-level configuration loading: voice vocabulary, announcer phrases and default settings.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{services::input_dispatcher::VoiceCommand, state::settings::Settings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PINGPONG_BACK_CONFIG_PATH";

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    voice: VoiceConfig,
    phrases: AnnouncerPhrases,
    settings: Settings,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in vocabulary.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        commands = app_config.voice.game_commands.len(),
                        prefixes = app_config.voice.point_prefixes.len(),
                        "loaded voice and announcer configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Vocabulary used by the voice dispatcher.
    pub fn voice(&self) -> &VoiceConfig {
        &self.voice
    }

    /// Phrases used by the announcer.
    pub fn phrases(&self) -> &AnnouncerPhrases {
        &self.phrases
    }

    /// Preferences applied before any stored setting is loaded.
    pub fn default_settings(&self) -> &Settings {
        &self.settings
    }
}

/// Spoken phrase bound to a command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandPhrase {
    /// Lowercase phrase matched as whole words inside the transcript.
    pub phrase: String,
    /// Command issued when the phrase is heard.
    pub command: VoiceCommand,
}

impl CommandPhrase {
    fn new(phrase: &str, command: VoiceCommand) -> Self {
        Self {
            phrase: phrase.to_owned(),
            command,
        }
    }
}

/// Voice vocabulary per context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Commands recognised while a match is being scored.
    pub game_commands: Vec<CommandPhrase>,
    /// Commands recognised while the first server is being chosen.
    pub setup_commands: Vec<CommandPhrase>,
    /// Words stripped from the start of a transcript before a player lookup.
    pub point_prefixes: Vec<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        use VoiceCommand::*;
        Self {
            game_commands: vec![
                CommandPhrase::new("zpět", Undo),
                CommandPhrase::new("opravit", Undo),
                CommandPhrase::new("vrátit", Undo),
                CommandPhrase::new("undo", Undo),
                CommandPhrase::new("back", Undo),
                CommandPhrase::new("vyměnit strany", SwapSides),
                CommandPhrase::new("změna stran", SwapSides),
                CommandPhrase::new("otočit strany", SwapSides),
                CommandPhrase::new("swap sides", SwapSides),
                CommandPhrase::new("pauza", Suspend),
                CommandPhrase::new("přerušit", Suspend),
                CommandPhrase::new("konec", Suspend),
                CommandPhrase::new("suspend", Suspend),
            ],
            setup_commands: Vec::new(),
            point_prefixes: vec!["bod ".into(), "point ".into()],
        }
    }
}

/// Texts the announcer picks from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnnouncerPhrases {
    /// Encouragement usable at any time.
    pub general: Vec<String>,
    /// Encouragement when a side needs one or two more points.
    pub near_end: Vec<String>,
    /// Closing remark appended to the final result.
    pub winning: Vec<String>,
    /// Result line; `{winner}`, `{high}` and `{low}` are substituted.
    pub match_over: String,
    /// Spoken after an undo issued by voice.
    pub undo_ack: String,
    /// Spoken after a side swap issued by voice.
    pub swap_ack: String,
}

impl Default for AnnouncerPhrases {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|item| (*item).to_owned()).collect();
        Self {
            general: owned(&[
                "Pojď, draku!",
                "To byl úder!",
                "Skvělá práce!",
                "Jen tak dál!",
                "To je ono!",
                "Paráda!",
                "Krásná hra.",
                "Zaber!",
                "Soustřeď se.",
                "Máš na to!",
                "Výborně!",
                "Krásný bod.",
                "To byla rychlost!",
                "Neuvěřitelný reflex.",
            ]),
            near_end: owned(&[
                "Ještě jeden!",
                "Téměř tam!",
                "Poslední bod!",
                "Finální úder!",
                "Na dosah vítězství!",
            ]),
            winning: owned(&[
                "To byla jízda!",
                "Gratulujeme vítězi!",
                "Nádherný výkon.",
                "Klobouk dolů.",
                "Famózní!",
            ]),
            match_over: "Konec zápasu. Vítěz {winner}. {high} : {low}".into(),
            undo_ack: "Opravuji".into(),
            swap_ack: "Měním strany".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every section is optional; missing sections keep their built-in defaults.
struct RawConfig {
    voice: Option<VoiceConfig>,
    phrases: Option<AnnouncerPhrases>,
    settings: Option<Settings>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let voice = value.voice.map(normalize_voice).unwrap_or_default();
        Self {
            voice,
            phrases: value.phrases.unwrap_or_default(),
            settings: value.settings.unwrap_or_default(),
        }
    }
}

/// Lowercase phrases so they compare against lowercased transcripts.
fn normalize_voice(mut voice: VoiceConfig) -> VoiceConfig {
    for command in voice
        .game_commands
        .iter_mut()
        .chain(voice.setup_commands.iter_mut())
    {
        command.phrase = command.phrase.trim().to_lowercase();
    }
    for prefix in &mut voice.point_prefixes {
        *prefix = prefix.to_lowercase();
    }
    voice.game_commands.retain(|command| !command.phrase.is_empty());
    voice.setup_commands.retain(|command| !command.phrase.is_empty());
    voice
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_default_sections() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "voice": {
                    "game_commands": [{ "phrase": " Oops ", "command": "undo" }],
                    "point_prefixes": ["Score "]
                },
                "settings": { "voice_input_enabled": true }
            }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(
            config.voice().game_commands,
            vec![CommandPhrase::new("oops", VoiceCommand::Undo)]
        );
        assert_eq!(config.voice().point_prefixes, vec!["score ".to_owned()]);
        assert!(config.voice().setup_commands.is_empty());
        assert_eq!(config.phrases(), &AnnouncerPhrases::default());
        assert!(config.default_settings().voice_input_enabled);
        assert!(config.default_settings().sounds_enabled);
    }

    #[test]
    fn defaults_cover_both_languages() {
        let voice = VoiceConfig::default();
        let phrases: Vec<_> = voice.game_commands.iter().map(|c| c.phrase.as_str()).collect();
        assert!(phrases.contains(&"zpět"));
        assert!(phrases.contains(&"swap sides"));
        assert!(voice.point_prefixes.iter().any(|p| p == "bod "));
    }
}
