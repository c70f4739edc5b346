//! Application-level configuration loading, including the gameplay tunables.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::input::InputSettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ROPEWAR_BACK_CONFIG_PATH";
/// Default absolute score at which a team wins the round.
const DEFAULT_WIN_THRESHOLD: i64 = 100;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    win_threshold: i64,
    input: InputSettings,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in gameplay defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        win_threshold = app_config.win_threshold,
                        "loaded gameplay tunables from config"
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

    /// Absolute score at which a team wins the round.
    pub fn win_threshold(&self) -> i64 {
        self.win_threshold
    }

    /// Settings handed to each player's input machine.
    pub fn input_settings(&self) -> InputSettings {
        self.input
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            win_threshold: DEFAULT_WIN_THRESHOLD,
            input: InputSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Every field is optional; absent fields keep their built-in default.
struct RawConfig {
    #[serde(default)]
    win_threshold: Option<i64>,
    #[serde(default)]
    queue_len: Option<usize>,
    #[serde(default)]
    history_len: Option<usize>,
    #[serde(default)]
    max_hearts: Option<u8>,
    #[serde(default)]
    bump_flash_ms: Option<u64>,
    #[serde(default)]
    wrong_key_flash_ms: Option<u64>,
    #[serde(default)]
    short_lockout_ms: Option<u64>,
    #[serde(default)]
    long_lockout_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let mut config = Self::default();
        if let Some(threshold) = value.win_threshold {
            // The win rule needs a strictly positive target.
            config.win_threshold = threshold.max(1);
        }
        if let Some(queue_len) = value.queue_len {
            // The queue head is the required key; it must exist.
            config.input.queue_len = queue_len.max(1);
        }
        if let Some(history_len) = value.history_len {
            config.input.history_len = history_len;
        }
        if let Some(max_hearts) = value.max_hearts {
            config.input.max_hearts = max_hearts.max(1);
        }
        if let Some(ms) = value.bump_flash_ms {
            config.input.bump_flash = std::time::Duration::from_millis(ms);
        }
        if let Some(ms) = value.wrong_key_flash_ms {
            config.input.wrong_key_flash = std::time::Duration::from_millis(ms);
        }
        if let Some(ms) = value.short_lockout_ms {
            config.input.short_lockout = std::time::Duration::from_millis(ms);
        }
        if let Some(ms) = value.long_lockout_ms {
            config.input.long_lockout = std::time::Duration::from_millis(ms);
        }
        config
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
