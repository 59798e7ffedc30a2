//! Terminal geometry configuration
//!
//! The static defaults are the last tier of geometry detection, so every
//! value here must stay positive: zero or negative file values are replaced
//! by the built-in defaults.

use serde::Deserialize;
use std::time::Duration;

/// Geometry defaults and escape-sequence query timing
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryConfig {
    /// Fallback terminal width in pixels
    pub term_width: i32,
    /// Fallback terminal height in pixels
    pub term_height: i32,
    /// Fallback cell width in pixels
    pub cell_width: i32,
    /// Fallback cell height in pixels
    pub cell_height: i32,
    /// How long one readiness wait blocks during the escape-sequence query
    pub select_timeout: Duration,
    /// How many readiness waits before the escape-sequence query gives up
    pub select_check_limit: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            term_width: 1280,
            term_height: 1024,
            cell_width: 8,
            cell_height: 16,
            select_timeout: Duration::from_millis(100),
            select_check_limit: 4,
        }
    }
}

/// Geometry settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileGeometry {
    pub term_width: Option<i32>,
    pub term_height: Option<i32>,
    pub cell_width: Option<i32>,
    pub cell_height: Option<i32>,
    pub select_timeout_ms: Option<u64>,
    pub select_check_limit: Option<u32>,
}

impl GeometryConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileGeometry>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();
        let positive = |v: Option<i32>, default: i32| v.filter(|v| *v > 0).unwrap_or(default);

        let mut config = Self {
            term_width: positive(file.term_width, defaults.term_width),
            term_height: positive(file.term_height, defaults.term_height),
            cell_width: positive(file.cell_width, defaults.cell_width),
            cell_height: positive(file.cell_height, defaults.cell_height),
            select_timeout: file
                .select_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.select_timeout),
            select_check_limit: file
                .select_check_limit
                .filter(|n| *n > 0)
                .unwrap_or(defaults.select_check_limit),
        };

        // A cell larger than the whole terminal would leave an empty grid
        if config.cell_width > config.term_width || config.cell_height > config.term_height {
            config.cell_width = defaults.cell_width.min(config.term_width);
            config.cell_height = defaults.cell_height.min(config.term_height);
        }

        config
    }

    /// Select timeout in whole milliseconds (for serialization and poll)
    pub fn select_timeout_ms(&self) -> u64 {
        u64::try_from(self.select_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
