//! Configuration for the diagnostics pipelines
//!
//! Everything is plain serde data so a host can keep its settings in a TOML
//! file next to its own configuration. All sections fall back to defaults
//! when omitted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub logger: LoggerConfig,
    pub tracker: TrackerConfig,
    pub audio: AudioConfig,
}

impl DiagnosticsConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Save the configuration, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = self.to_toml()?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        std::fs::write(path, text).map_err(write_err)
    }

    /// Per-user config file location (`<config dir>/console-debugger/config.toml`)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        directories::ProjectDirs::from("", "", "console-debugger")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location, falling back to defaults when the
    /// file is missing or unreadable
    pub fn load_or_default() -> Self {
        let path = match Self::default_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!("Using default config: {}", e);
                return Self::default();
            }
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Output format of the durable log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStyle {
    #[default]
    Csv,
    PlainText,
}

impl LogStyle {
    /// File the style writes to
    pub fn file_name(self) -> &'static str {
        match self {
            LogStyle::Csv => "log.csv",
            LogStyle::PlainText => "log.txt",
        }
    }
}

/// Logger settings shared by the dispatcher and the log sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Durable logging running (or requested at start-up when loaded)
    pub active: bool,
    pub style: LogStyle,
    pub include_timestamp: bool,
    pub include_category: bool,
    pub emit_console_messages: bool,
    /// Directory holding `log.csv` / `log.txt`
    pub directory: PathBuf,
    /// chrono format string for timestamps
    pub timestamp_format: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            active: false,
            style: LogStyle::Csv,
            include_timestamp: true,
            include_category: true,
            emit_console_messages: true,
            directory: PathBuf::from("."),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl LoggerConfig {
    /// Full path of the current log file
    pub fn log_path(&self) -> PathBuf {
        self.directory.join(self.style.file_name())
    }
}

/// Live value tracker tone and cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub frequency_hz: f32,
    pub gain: f32,
    pub burst_ms: u64,
    pub rest_ms: u64,
    pub sample_rate: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frequency_hz: TRACKER_FREQUENCY_HZ,
            gain: TRACKER_GAIN,
            burst_ms: TRACKER_BURST_MS,
            rest_ms: TRACKER_REST_MS,
            sample_rate: TONE_SAMPLE_RATE,
        }
    }
}

impl TrackerConfig {
    pub fn burst(&self) -> Duration {
        Duration::from_millis(self.burst_ms)
    }

    pub fn rest(&self) -> Duration {
        Duration::from_millis(self.rest_ms)
    }
}

/// Audio output selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name; `None` uses the host default
    pub output_device: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert!(!config.active);
        assert_eq!(config.style, LogStyle::Csv);
        assert!(config.include_timestamp);
        assert!(config.emit_console_messages);
        assert_eq!(config.log_path(), PathBuf::from("./log.csv"));
    }

    #[test]
    fn test_partial_toml() {
        let config = DiagnosticsConfig::from_toml(
            r#"
            [logger]
            style = "plain_text"
            include_category = false

            [tracker]
            rest_ms = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.logger.style, LogStyle::PlainText);
        assert!(!config.logger.include_category);
        assert!(config.logger.include_timestamp);
        assert_eq!(config.logger.log_path(), PathBuf::from("./log.txt"));
        assert_eq!(config.tracker.rest(), Duration::from_millis(5));
        assert_eq!(config.tracker.burst_ms, TRACKER_BURST_MS);
        assert!(config.audio.output_device.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = DiagnosticsConfig::default();
        config.audio.output_device = Some("Speakers".to_string());
        config.tracker.frequency_hz = 880.0;
        config.save(&path).unwrap();

        let loaded = DiagnosticsConfig::load(&path).unwrap();
        assert_eq!(loaded.audio.output_device.as_deref(), Some("Speakers"));
        assert_eq!(loaded.tracker.frequency_hz, 880.0);
        assert_eq!(loaded.logger, config.logger);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DiagnosticsConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
