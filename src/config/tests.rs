//! Configuration tests
//!
//! Guards the file format and the env > file > defaults precedence.

use super::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn no_env(_: &str) -> Option<String> {
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

/// Verify that serialized config can be parsed back.
#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );

    let reloaded = Config::from_sources(parsed.unwrap(), no_env);
    assert_eq!(reloaded.max_image, config.max_image);
    assert_eq!(reloaded.geometry, config.geometry);
    assert_eq!(reloaded.logging, config.logging);
    assert_eq!(reloaded.encoder, config.encoder);
}

/// Non-default values must survive serialization too
#[test]
fn test_config_roundtrip_custom_values() {
    let mut config = Config::default();
    config.max_image = 64;
    config.geometry.cell_width = 10;
    config.geometry.cell_height = 20;
    config.geometry.select_timeout = Duration::from_millis(250);
    config.logging.rotation = LogRotation::Daily;
    config.logging.file = PathBuf::from("/var/tmp/w3m img.log");
    config.encoder.program = "/opt/libsixel/bin/img2sixel".to_string();

    let parsed: FileConfig = toml::from_str(&config.to_toml()).expect("valid TOML");
    let reloaded = Config::from_sources(parsed, no_env);

    assert_eq!(reloaded.max_image, 64);
    assert_eq!(reloaded.geometry, config.geometry);
    assert_eq!(reloaded.logging, config.logging);
    assert_eq!(reloaded.encoder, config.encoder);
}

/// Quotes, backslashes and control bytes must come out as valid TOML escapes
#[test]
fn test_config_roundtrip_escapes_strings() {
    let mut config = Config::default();
    config.logging.level = r#"w3mimg_sixel[span{name="draw"}]=debug"#.to_string();
    config.logging.file = PathBuf::from("/tmp/w3m\x1b\\img\t.log");
    config.encoder.program = "C:\\tools\\\"img2sixel\"".to_string();

    let toml_str = config.to_toml();
    let parsed: FileConfig = toml::from_str(&toml_str)
        .unwrap_or_else(|e| panic!("invalid TOML:\n{toml_str}\nError: {e}"));
    let reloaded = Config::from_sources(parsed, no_env);

    assert_eq!(reloaded.logging, config.logging);
    assert_eq!(reloaded.encoder, config.encoder);
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let file: FileConfig = toml::from_str(
        r#"
[logging]
level = "warn"
file = "/tmp/from-file.log"

[encoder]
program = "file-encoder"
"#,
    )
    .unwrap();

    let env: HashMap<&str, &str> = HashMap::from([
        (env_keys::LOG_LEVEL, "debug"),
        (env_keys::ENCODER, "env-encoder"),
    ]);
    let config = Config::from_sources(file, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, PathBuf::from("/tmp/from-file.log"));
    assert_eq!(config.encoder.program, "env-encoder");
}

#[test]
fn test_empty_file_gives_defaults() {
    let config = Config::from_sources(FileConfig::default(), no_env);
    let defaults = Config::default();

    assert_eq!(config.max_image, DEFAULT_MAX_IMAGE);
    assert_eq!(config.geometry, defaults.geometry);
    assert_eq!(config.logging, defaults.logging);
    assert_eq!(config.encoder.program, "img2sixel");
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_non_positive_geometry_falls_back_to_defaults() {
    let file: FileConfig = toml::from_str(
        r#"
max_image = 0

[geometry]
term_width = 0
cell_width = -3
cell_height = 0
select_timeout_ms = 0
select_check_limit = 0
"#,
    )
    .unwrap();
    let config = Config::from_sources(file, no_env);
    let defaults = GeometryConfig::default();

    assert_eq!(config.max_image, DEFAULT_MAX_IMAGE);
    assert_eq!(config.geometry, defaults);
}

#[test]
fn test_cell_larger_than_terminal_is_rejected() {
    let file: FileConfig = toml::from_str(
        r#"
[geometry]
term_width = 4
term_height = 200
cell_width = 8
cell_height = 16
"#,
    )
    .unwrap();
    let config = Config::from_sources(file, no_env);

    assert!(config.geometry.cell_width <= config.geometry.term_width);
    assert!(config.geometry.cell_width > 0);
    assert!(config.geometry.cell_height > 0);
}

#[test]
fn test_blank_encoder_program_uses_default() {
    let config = EncoderConfig::from_file(
        Some(FileEncoder {
            program: Some("   ".to_string()),
        }),
        None,
    );
    assert_eq!(config.program, "img2sixel");
}

#[test]
fn test_log_rotation_parsing() {
    assert_eq!(LogRotation::from_str("HOURLY"), LogRotation::Hourly);
    assert_eq!(LogRotation::from_str("daily"), LogRotation::Daily);
    assert_eq!(LogRotation::from_str("never"), LogRotation::Never);
    assert_eq!(LogRotation::from_str("weekly"), LogRotation::Never);
}

// ─────────────────────────────────────────────────────────────────────────────
// File loading tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = Config::read_file_config(&dir.path().join("absent.toml")).unwrap();
    assert!(file.max_image.is_none());
    assert!(file.geometry.is_none());
}

#[test]
fn test_invalid_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "max_image = \"lots\"\n[geometry\n").unwrap();

    let err = Config::read_file_config(&path).unwrap_err();
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn test_valid_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "max_image = 32\n[geometry]\ncell_width = 9\n").unwrap();

    let file = Config::read_file_config(&path).unwrap();
    let config = Config::from_sources(file, no_env);
    assert_eq!(config.max_image, 32);
    assert_eq!(config.geometry.cell_width, 9);
    assert_eq!(config.geometry.cell_height, 16);
}
