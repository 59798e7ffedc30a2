//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Render the configuration as a commented TOML document
    pub fn to_toml(&self) -> String {
        let geometry = &self.geometry;
        let logging = &self.logging;

        format!(
            r#"# w3mimg-sixel configuration
#
# Environment variables override this file:
#   W3MIMG_LOG_FILE, W3MIMG_LOG_LEVEL, W3MIMG_ENCODER

# Image slots a draw index is clamped into
max_image = {max_image}

[geometry]
# Used when the terminal reports no pixel size at all
term_width = {term_width}
term_height = {term_height}
cell_width = {cell_width}
cell_height = {cell_height}
# Escape-sequence size query: wait per attempt, number of attempts
select_timeout_ms = {select_timeout_ms}
select_check_limit = {select_check_limit}

[logging]
level = {level}              # trace, debug, info, warn, error
file = {file}
rotation = "{rotation}"        # never, hourly, daily

[encoder]
program = {program}          # libsixel's img2sixel or a compatible tool
"#,
            max_image = self.max_image,
            term_width = geometry.term_width,
            term_height = geometry.term_height,
            cell_width = geometry.cell_width,
            cell_height = geometry.cell_height,
            select_timeout_ms = geometry.select_timeout_ms(),
            select_check_limit = geometry.select_check_limit,
            level = toml_string(&logging.level),
            file = toml_string(&logging.file.display().to_string()),
            rotation = logging.rotation.as_str(),
            program = toml_string(&self.encoder.program),
        )
    }
}

/// Quote and escape a value as a TOML string
fn toml_string(s: &str) -> String {
    toml::Value::String(s.to_owned()).to_string()
}
