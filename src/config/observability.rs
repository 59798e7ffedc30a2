//! Observability configuration: logging level, log file, rotation
//!
//! Standard output carries protocol responses, so diagnostics only ever go
//! to the log file (or standard error when the file cannot be opened).

use serde::Deserialize;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Log Rotation
// ─────────────────────────────────────────────────────────────────────────────

/// Log file rotation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum LogRotation {
    /// Rotate log files hourly
    Hourly,
    /// Rotate log files daily
    Daily,
    /// Never rotate - single log file, appended to by every instance (default)
    #[default]
    Never,
}

impl LogRotation {
    /// Parse rotation string from config
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "daily" => Self::Daily,
            "never" => Self::Never,
            _ => Self::Never, // Default to a single file for unknown values
        }
    }

    /// Convert to string for TOML serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log file path; with rotation enabled this is the file name prefix
    pub file: PathBuf,
    /// Log file rotation strategy
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from("/tmp/w3mimg-sixel.log"),
            rotation: LogRotation::Never,
        }
    }
}

/// Logging settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file: Option<String>,
    pub rotation: Option<String>,
}

impl LoggingConfig {
    /// Create from file config with defaults; env values win over the file
    pub fn from_file(
        file: Option<FileLogging>,
        env_file: Option<String>,
        env_level: Option<String>,
    ) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            level: env_level.or(file.level).unwrap_or(defaults.level),
            file: env_file
                .or(file.file)
                .map(PathBuf::from)
                .unwrap_or(defaults.file),
            rotation: file
                .rotation
                .map(|s| LogRotation::from_str(&s))
                .unwrap_or(defaults.rotation),
        }
    }
}
