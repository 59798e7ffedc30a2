//! External encoder configuration

use serde::Deserialize;

/// Program used to turn an image file into sixel output
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    /// Encoder executable, looked up on $PATH when not absolute
    pub program: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: "img2sixel".to_string(),
        }
    }
}

/// Encoder settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileEncoder {
    pub program: Option<String>,
}

impl EncoderConfig {
    /// Create from file config with defaults; `env_program` wins over the file
    pub fn from_file(file: Option<FileEncoder>, env_program: Option<String>) -> Self {
        let file = file.unwrap_or_default();

        Self {
            program: env_program
                .or(file.program)
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| Self::default().program),
        }
    }
}
