//! Configuration loading for stride-sim.
//!
//! Configuration is loaded from an optional TOML file. Every field has a
//! default, so an empty file (or no file) is valid.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use stride_sync_client::PublisherConfig;
use stride_sync_core::{PublisherMode, StopPolicy, DEFAULT_RUNNING_THRESHOLD_BPM};

/// Root configuration for stride-sim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    /// Wrist publisher configuration.
    #[serde(default)]
    pub publisher: PublisherSection,
    /// Simulated channel configuration.
    #[serde(default)]
    pub channel: ChannelSection,
}

/// Wrist publisher configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublisherSection {
    /// Source of the running decision (default: sensor_derived).
    #[serde(default)]
    pub mode: PublisherMode,
    /// Samples above this rate count as running (default: 100).
    #[serde(default = "default_running_threshold")]
    pub running_threshold_bpm: f64,
    /// Behaviour of repeated start/stop presses (default: idempotent).
    #[serde(default)]
    pub stop_policy: StopPolicy,
}

/// Simulated channel configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelSection {
    /// Whether the phone starts out reachable (default: true).
    #[serde(default = "default_reachable")]
    pub reachable: bool,
}

fn default_running_threshold() -> f64 {
    DEFAULT_RUNNING_THRESHOLD_BPM
}

fn default_reachable() -> bool {
    true
}

impl Default for PublisherSection {
    fn default() -> Self {
        Self {
            mode: PublisherMode::default(),
            running_threshold_bpm: default_running_threshold(),
            stop_policy: StopPolicy::default(),
        }
    }
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            reachable: default_reachable(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or holds an
    /// unusable threshold.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let threshold = self.publisher.running_threshold_bpm;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                path: path.to_path_buf(),
                value: threshold,
            });
        }
        Ok(())
    }

    /// Publisher configuration described by this file.
    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig::default()
            .with_mode(self.publisher.mode)
            .with_running_threshold(self.publisher.running_threshold_bpm)
            .with_stop_policy(self.publisher.stop_policy)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Threshold is negative or not a number.
    #[error("invalid running_threshold_bpm {value} in {path}")]
    InvalidThreshold {
        /// Path to the configuration file.
        path: PathBuf,
        /// Offending value.
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.publisher.mode, PublisherMode::SensorDerived);
        assert_eq!(config.publisher.running_threshold_bpm, 100.0);
        assert_eq!(config.publisher.stop_policy, StopPolicy::Idempotent);
        assert!(config.channel.reachable);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[publisher]
mode = "manual_session"
running_threshold_bpm = 110.5
stop_policy = "always_resend"

[channel]
reachable = false
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.publisher.mode, PublisherMode::ManualSession);
        assert_eq!(config.publisher.running_threshold_bpm, 110.5);
        assert_eq!(config.publisher.stop_policy, StopPolicy::AlwaysResend);
        assert!(!config.channel.reachable);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: Config = toml::from_str("[publisher]\nmode = \"legacy\"\n").unwrap();
        assert_eq!(config.publisher.mode, PublisherMode::Legacy);
        assert_eq!(config.publisher.running_threshold_bpm, 100.0);
        assert_eq!(config.channel, ChannelSection::default());
    }

    #[test]
    fn publisher_config_maps_fields() {
        let mut config = Config::default();
        config.publisher.mode = PublisherMode::ManualSession;
        config.publisher.running_threshold_bpm = 90.0;

        let publisher = config.publisher_config();
        assert_eq!(publisher.mode, PublisherMode::ManualSession);
        assert_eq!(publisher.running_threshold_bpm, 90.0);
        assert_eq!(publisher.stop_policy, StopPolicy::Idempotent);
    }

    #[test]
    fn from_file_reads_toml() {
        let file = write_config("[publisher]\nstop_policy = \"always_resend\"\n");

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.publisher.stop_policy, StopPolicy::AlwaysResend);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::from_file(&path).unwrap_err();

        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn from_file_reports_parse_error() {
        let file = write_config("[publisher]\nmode = \"sprinting\"\n");

        let err = Config::from_file(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn from_file_rejects_negative_threshold() {
        let file = write_config("[publisher]\nrunning_threshold_bpm = -5.0\n");

        let err = Config::from_file(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidThreshold { .. }));
    }
}
