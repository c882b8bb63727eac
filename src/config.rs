//! Runtime configuration.
//!
//! Every option has a default, so an empty TOML document (or no file at all)
//! yields a usable configuration.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("config option {option} must be greater than zero")]
    Zero {
        /// Offending option name.
        option: &'static str,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Seconds between the end of one cycle and the start of the next.
    pub probe_interval_secs: u64,
    /// Hard bound on one probe, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Bound on session cleanup, in milliseconds.
    pub close_timeout_ms: u64,
    /// Seconds between history flushes.
    pub flush_interval_secs: u64,
    /// History retention window, in hours.
    pub retention_hours: u32,
    /// Global cap on concurrently probed services.
    pub concurrency: usize,
    /// File name of the persisted history inside `data_dir`.
    pub history_file: String,
    /// Directory holding the persisted history.
    pub data_dir: Utf8PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 300,
            probe_timeout_ms: 15_000,
            close_timeout_ms: 2_000,
            flush_interval_secs: 60,
            retention_hours: 24,
            concurrency: 8,
            history_file: "history.json".to_owned(),
            data_dir: Utf8PathBuf::from("."),
        }
    }
}

impl MonitorConfig {
    /// Parses a TOML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it does not parse.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let read_error = |source: std::io::Error| ConfigError::Read {
            path: path.to_string(),
            source,
        };
        let file_name = path.file_name().ok_or_else(|| {
            read_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "config path must name a file",
            ))
        })?;
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let document = dir.read_to_string(file_name).map_err(read_error)?;
        Self::from_toml_str(&document)
    }

    /// Rejects zero intervals, timeouts, retention, and concurrency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] naming the first offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("probe_interval_secs", self.probe_interval_secs == 0),
            ("probe_timeout_ms", self.probe_timeout_ms == 0),
            ("close_timeout_ms", self.close_timeout_ms == 0),
            ("flush_interval_secs", self.flush_interval_secs == 0),
            ("retention_hours", self.retention_hours == 0),
            ("concurrency", self.concurrency == 0),
        ];
        checks
            .into_iter()
            .find_map(|(option, is_zero)| is_zero.then_some(option))
            .map_or(Ok(()), |option| Err(ConfigError::Zero { option }))
    }

    /// Returns the cycle interval.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Returns the per-probe timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Returns the session close timeout.
    #[must_use]
    pub const fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Returns the flush interval.
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// Returns the retention window.
    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.retention_hours))
    }
}
