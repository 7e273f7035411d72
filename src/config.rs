//! Application-level configuration loading: upstream endpoints, round timing and history sizes.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::{
    services::event_normalizer::DEFAULT_COUNTDOWN_SECS,
    state::{
        CoordinatorSettings,
        coordinator::{DEFAULT_GRACE_WINDOW, TICK_INTERVAL},
        round::DEFAULT_HISTORY_CAPACITY,
    },
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MARBLE_LEAGUE_CONFIG_PATH";
/// Environment variable holding the bearer token sent to the betting ledger.
const ACCESS_TOKEN_ENV: &str = "MARBLE_LEAGUE_ACCESS_TOKEN";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_TRANSPORT_URL: &str = "ws://localhost:3000/ws";

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Base URL of the game server REST API.
    pub api_base_url: String,
    /// WebSocket URL of the push transport.
    pub transport_url: String,
    /// Countdown applied when a round start carries none.
    pub default_countdown_secs: u32,
    /// How long a finished round stays on screen.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "grace_window_secs")]
    pub grace_window: Duration,
    /// Number of recent results kept.
    pub results_capacity: usize,
    /// Page size requested when syncing results.
    pub results_page_size: usize,
    /// Ledger bearer token; never read from the file.
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        api = %config.api_base_url,
                        transport = %config.transport_url,
                        "loaded configuration"
                    );
                    config
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
        };

        config.with_access_token(env::var(ACCESS_TOKEN_ENV).ok())
    }

    fn from_json(contents: &str) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_str(contents)?;
        config.results_capacity = config.results_capacity.max(1);
        config.results_page_size = config.results_page_size.max(1);
        Ok(config)
    }

    fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|token| !token.trim().is_empty());
        self
    }

    /// Timing and sizing knobs handed to the round coordinator.
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            tick_interval: TICK_INTERVAL,
            grace_window: self.grace_window,
            history_capacity: self.results_capacity,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            transport_url: DEFAULT_TRANSPORT_URL.to_string(),
            default_countdown_secs: DEFAULT_COUNTDOWN_SECS,
            grace_window: DEFAULT_GRACE_WINDOW,
            results_capacity: DEFAULT_HISTORY_CAPACITY,
            results_page_size: DEFAULT_HISTORY_CAPACITY,
            access_token: None,
        }
    }
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
    fn partial_file_keeps_defaults_for_missing_fields() {
        let config = AppConfig::from_json(
            r#"{"api_base_url":"https://league.example/api","grace_window_secs":8}"#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://league.example/api");
        assert_eq!(config.transport_url, DEFAULT_TRANSPORT_URL);
        assert_eq!(config.grace_window, Duration::from_secs(8));
        assert_eq!(config.default_countdown_secs, 60);
        assert_eq!(config.results_capacity, 10);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn capacities_are_at_least_one() {
        let config =
            AppConfig::from_json(r#"{"results_capacity":0,"results_page_size":0}"#).unwrap();
        assert_eq!(config.results_capacity, 1);
        assert_eq!(config.results_page_size, 1);
    }

    #[test]
    fn blank_access_token_is_ignored() {
        assert!(
            AppConfig::default()
                .with_access_token(Some("  ".into()))
                .access_token
                .is_none()
        );
        assert_eq!(
            AppConfig::default()
                .with_access_token(Some("secret".into()))
                .access_token
                .as_deref(),
            Some("secret")
        );
    }

    #[test]
    fn coordinator_settings_follow_config() {
        let config = AppConfig::from_json(r#"{"grace_window_secs":3,"results_capacity":4}"#).unwrap();
        let settings = config.coordinator_settings();
        assert_eq!(settings.grace_window, Duration::from_secs(3));
        assert_eq!(settings.history_capacity, 4);
        assert_eq!(settings.tick_interval, Duration::from_secs(1));
    }
}
