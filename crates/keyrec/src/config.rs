//! Configuration management for keyrec.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::recorder::RecorderConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "keyrec";

/// Default output file name.
const OUTPUT_FILE_NAME: &str = "typed_text.txt";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `KEYREC_`)
/// 2. TOML config file at `~/.config/keyrec/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recorder configuration.
    pub recorder: RecorderSection,
    /// Stats sampler configuration.
    pub stats: StatsSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Recording session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderSection {
    /// Length of one recording session in seconds.
    pub session_secs: u64,
    /// Upper bound on one event poll in milliseconds.
    /// This is also the worst-case delay before a stop request is noticed.
    pub poll_interval_ms: u64,
    /// Output file for recorded text.
    /// Defaults to `~/.local/share/keyrec/typed_text.txt`
    pub output_path: Option<PathBuf>,
}

/// Stats sampler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSection {
    /// Run the sampler alongside monitor sessions.
    pub enabled: bool,
    /// Seconds between snapshots.
    pub interval_secs: u64,
    /// Milliseconds over which CPU usage is measured.
    pub cpu_window_ms: u64,
    /// Query `nvidia-smi` for GPU figures.
    pub gpu_enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Directory for dated log files. Logs go to stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for RecorderSection {
    fn default() -> Self {
        Self {
            session_secs: 10,
            poll_interval_ms: 100,
            output_path: None, // Will be resolved to default at runtime
        }
    }
}

impl Default for StatsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            cpu_window_ms: 1000,
            gpu_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// `None` reads [`Config::default_config_path`].
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("KEYREC_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("recorder.session_secs", self.recorder.session_secs),
            ("recorder.poll_interval_ms", self.recorder.poll_interval_ms),
            ("stats.interval_secs", self.stats.interval_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be greater than 0"),
                });
            }
        }

        if self.recorder.poll_interval_ms > self.recorder.session_secs.saturating_mul(1000) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "recorder.poll_interval_ms ({}) cannot exceed the session length ({}s)",
                    self.recorder.poll_interval_ms, self.recorder.session_secs
                ),
            });
        }

        Ok(())
    }

    /// Get the output path, resolving defaults if not set.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.recorder
            .output_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(OUTPUT_FILE_NAME))
    }

    /// Get the session length as a Duration.
    #[must_use]
    pub fn session_length(&self) -> Duration {
        Duration::from_secs(self.recorder.session_secs)
    }

    /// Get the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.recorder.poll_interval_ms)
    }

    /// Get the stats interval as a Duration.
    #[must_use]
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats.interval_secs)
    }

    /// Get the CPU measurement window as a Duration.
    #[must_use]
    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.stats.cpu_window_ms)
    }

    /// Session timing for the recorder.
    #[must_use]
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            limit: self.session_length(),
            poll_interval: self.poll_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.recorder.session_secs, 10);
        assert_eq!(config.recorder.poll_interval_ms, 100);
        assert!(config.recorder.output_path.is_none());
        assert!(config.stats.enabled);
        assert_eq!(config.stats.interval_secs, 3600);
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_session() {
        let mut config = Config::default();
        config.recorder.session_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session_secs"));
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = Config::default();
        config.recorder.poll_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("poll_interval_ms"));
    }

    #[test]
    fn test_validate_zero_stats_interval() {
        let mut config = Config::default();
        config.stats.interval_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("stats.interval_secs"));
    }

    #[test]
    fn test_validate_poll_longer_than_session() {
        let mut config = Config::default();
        config.recorder.session_secs = 1;
        config.recorder.poll_interval_ms = 5000;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cannot exceed"));
    }

    #[test]
    fn test_output_path_default() {
        let config = Config::default();
        let path = config.output_path();

        assert!(path.to_string_lossy().contains("keyrec"));
        assert!(path.to_string_lossy().ends_with("typed_text.txt"));
    }

    #[test]
    fn test_output_path_custom() {
        let mut config = Config::default();
        config.recorder.output_path = Some(PathBuf::from("/custom/out.txt"));

        assert_eq!(config.output_path(), PathBuf::from("/custom/out.txt"));
    }

    #[test]
    fn test_durations() {
        let config = Config::default();

        assert_eq!(config.session_length(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.stats_interval(), Duration::from_secs(3600));
        assert_eq!(config.cpu_window(), Duration::from_secs(1));
    }

    #[test]
    fn test_recorder_config() {
        let config = Config::default();
        let recorder = config.recorder_config();

        assert_eq!(recorder.limit, Duration::from_secs(10));
        assert_eq!(recorder.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("keyrec"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[recorder]\nsession_secs = 30\noutput_path = \"/tmp/keys.txt\"\n\n[stats]\nenabled = false\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();

        assert_eq!(config.recorder.session_secs, 30);
        assert_eq!(config.output_path(), PathBuf::from("/tmp/keys.txt"));
        assert!(!config.stats.enabled);
        assert_eq!(config.recorder.poll_interval_ms, 100);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[recorder]\nsession_secs = 0\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("session_secs"));
        assert!(json.contains("interval_secs"));
    }
}
