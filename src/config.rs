//! Relay settings loaded from TOML.
//!
//! Every key is optional; missing keys keep their defaults. The default file
//! lives at `<config dir>/gamepad-relay/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::controller::event_collector::CollectorSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RelaySettings {
    /// Sleep between poll cycles
    pub poll_interval_ms: u64,
    /// Probe delay after a controller disconnects
    pub disconnected_backoff_ms: u64,
    /// Host tick used by the monitor binary
    pub dispatch_interval_ms: u64,
    pub stats_interval_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            disconnected_backoff_ms: 4_000,
            dispatch_interval_ms: 16,
            stats_interval_secs: 10,
        }
    }
}

impl RelaySettings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: RelaySettings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading relay settings from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Location of the per-user settings file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gamepad-relay").join("config.toml"))
    }

    /// Loads the per-user file when present, defaults otherwise.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                info!("Using relay settings from {}", path.display());
                Self::load(&path)
            }
            _ => {
                debug!("No relay settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.dispatch_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dispatch_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.stats_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "stats_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }
}

impl From<&RelaySettings> for CollectorSettings {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            disconnected_backoff: Duration::from_millis(settings.disconnected_backoff_ms),
            stats_interval: Duration::from_secs(settings.stats_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings = RelaySettings::from_toml_str("disconnected_backoff_ms = 250\n").expect("valid");
        assert_eq!(
            settings,
            RelaySettings {
                disconnected_backoff_ms: 250,
                ..RelaySettings::default()
            }
        );
        assert_eq!(RelaySettings::from_toml_str("").expect("valid"), RelaySettings::default());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        for text in [
            "poll_interval_ms = 0",
            "dispatch_interval_ms = 0",
            "stats_interval_secs = 0",
        ] {
            assert!(
                matches!(RelaySettings::from_toml_str(text), Err(ConfigError::Invalid(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            RelaySettings::from_toml_str("poll_interval_ms = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let path = Path::new("/nonexistent/gamepad-relay/config.toml");
        match RelaySettings::load(path) {
            Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn collector_settings_use_configured_durations() {
        let settings = RelaySettings {
            poll_interval_ms: 2,
            disconnected_backoff_ms: 1_500,
            dispatch_interval_ms: 16,
            stats_interval_secs: 30,
        };
        let collector = CollectorSettings::from(&settings);
        assert_eq!(collector.poll_interval, Duration::from_millis(2));
        assert_eq!(collector.disconnected_backoff, Duration::from_millis(1_500));
        assert_eq!(collector.stats_interval, Duration::from_secs(30));
    }
}
