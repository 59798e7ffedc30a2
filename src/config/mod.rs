//! Configuration for the image display bridge
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/w3mimg-sixel/config.toml, or $W3MIMG_CONFIG)
//! 3. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod encoder;
mod geometry;
mod observability;
mod serialization;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use encoder::{EncoderConfig, FileEncoder};
pub use geometry::{FileGeometry, GeometryConfig};
pub use observability::{FileLogging, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of image slots a draw index is clamped into
pub const DEFAULT_MAX_IMAGE: usize = 1024;

/// Environment variable names
pub(crate) mod env_keys {
    pub const CONFIG: &str = "W3MIMG_CONFIG";
    pub const LOG_FILE: &str = "W3MIMG_LOG_FILE";
    pub const LOG_LEVEL: &str = "W3MIMG_LOG_LEVEL";
    pub const ENCODER: &str = "W3MIMG_ENCODER";
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Image slots available to draw commands
    pub max_image: usize,

    /// Terminal geometry defaults and escape-query timing
    pub geometry: GeometryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// External image encoder
    pub encoder: EncoderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_image: DEFAULT_MAX_IMAGE,
            geometry: GeometryConfig::default(),
            logging: LoggingConfig::default(),
            encoder: EncoderConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub max_image: Option<usize>,

    /// Optional [geometry] section
    pub geometry: Option<FileGeometry>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,

    /// Optional [encoder] section
    pub encoder: Option<FileEncoder>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: $W3MIMG_CONFIG or ~/.config/w3mimg-sixel/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(env_keys::CONFIG) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|p| p.join(".config").join("w3mimg-sixel").join("config.toml"))
    }

    /// Read and parse a config file. A missing file yields the empty layer.
    ///
    /// A file that exists but cannot be read or parsed is an error: a broken
    /// config should fail fast instead of silently falling back to defaults.
    pub(crate) fn read_file_config(path: &Path) -> Result<FileConfig> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e)
                .with_context(|| format!("cannot read config file {}", path.display())),
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn load() -> Result<Self> {
        let file = match Self::config_path() {
            Some(path) => Self::read_file_config(&path)?,
            None => FileConfig::default(),
        };
        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed file layer with an environment lookup
    pub(crate) fn from_sources<F>(file: FileConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_image = file
            .max_image
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_IMAGE);

        let geometry = GeometryConfig::from_file(file.geometry);
        let logging = LoggingConfig::from_file(
            file.logging,
            env(env_keys::LOG_FILE),
            env(env_keys::LOG_LEVEL),
        );
        let encoder = EncoderConfig::from_file(file.encoder, env(env_keys::ENCODER));

        Self {
            max_image,
            geometry,
            logging,
            encoder,
        }
    }
}
