use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, time::Duration};
use thiserror::Error;

use crate::domain::{GAME_SESSION, NULL_SUBSYSTEM};
use crate::use_cases::CoordinatorSettings;

// Runtime configuration: optional TOML file, then env overrides.

pub const CONFIG_PATH_VAR: &str = "MULTIPLAYER_SESSIONS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub session_name: String,
    pub null_subsystem_name: String,
    pub build_unique_id: u32,
    pub event_channel_capacity: usize,
    pub default_public_connections: u32,
    pub default_match_type: String,
    pub default_max_search_results: u32,
    pub completion_timeout_ms: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            session_name: GAME_SESSION.to_string(),
            null_subsystem_name: NULL_SUBSYSTEM.to_string(),
            build_unique_id: 1,
            event_channel_capacity: 64,
            default_public_connections: 4,
            default_match_type: "FreeForAll".to_string(),
            default_max_search_results: 10_000,
            completion_timeout_ms: 1500,
        }
    }
}

impl SessionsConfig {
    /// Loads the file named by `MULTIPLAYER_SESSIONS_CONFIG` (defaults when
    /// unset) and applies env overrides on top.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    // Unparseable numeric overrides are ignored, keeping the file value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("SESSION_NAME").filter(|value| !value.trim().is_empty()) {
            self.session_name = name;
        }
        if let Some(capacity) = lookup("EVENT_CHANNEL_CAPACITY").and_then(|v| v.parse().ok()) {
            self.event_channel_capacity = capacity;
        }
        if let Some(millis) = lookup("COMPLETION_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.completion_timeout_ms = millis;
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            session_name: self.session_name.clone(),
            null_subsystem_name: self.null_subsystem_name.clone(),
            build_unique_id: self.build_unique_id,
            event_channel_capacity: self.event_channel_capacity,
        }
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn when_file_sets_some_keys_then_others_keep_defaults() {
        let config: SessionsConfig = toml::from_str(
            r#"
            session_name = "PartySession"
            default_public_connections = 8
            "#,
        )
        .expect("expected config to parse");

        assert_eq!(config.session_name, "PartySession");
        assert_eq!(config.default_public_connections, 8);
        assert_eq!(config.null_subsystem_name, "NULL");
        assert_eq!(config.build_unique_id, 1);
        assert_eq!(config.completion_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn when_env_overrides_are_present_then_they_win() {
        let vars = HashMap::from([
            ("SESSION_NAME", "LanParty"),
            ("EVENT_CHANNEL_CAPACITY", "8"),
            ("COMPLETION_TIMEOUT_MS", "not-a-number"),
        ]);
        let mut config = SessionsConfig::default();

        config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.session_name, "LanParty");
        assert_eq!(config.event_channel_capacity, 8);
        assert_eq!(config.completion_timeout_ms, 1500);
    }

    #[test]
    fn when_file_is_missing_then_read_error_names_the_path() {
        let path = Path::new("/definitely/not/here/sessions.toml");

        let error = SessionsConfig::from_file(path).expect_err("expected read failure");

        assert!(matches!(error, ConfigError::Read { .. }));
        assert!(error.to_string().contains("/definitely/not/here/sessions.toml"));
    }

    #[test]
    fn when_settings_are_derived_then_they_mirror_the_config() {
        let config = SessionsConfig {
            session_name: "Custom".to_string(),
            build_unique_id: 7,
            ..SessionsConfig::default()
        };

        let settings = config.coordinator_settings();

        assert_eq!(settings.session_name, "Custom");
        assert_eq!(settings.null_subsystem_name, "NULL");
        assert_eq!(settings.build_unique_id, 7);
        assert_eq!(settings.event_channel_capacity, 64);
    }
}
