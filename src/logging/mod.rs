// Logging module - diagnostics for a process whose stdout is a protocol channel
//
// Events are formatted without ANSI colors and written through a non-blocking
// worker to the configured log file. Every instance appends to the same file
// unless rotation is enabled. If the file cannot be opened, events go to
// standard error instead; never to standard output.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogRotation, LoggingConfig};

/// Where log output ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    File(PathBuf),
    Stderr,
}

/// Keeps the background writer alive; drop it last so buffered events flush
pub struct LogHandle {
    pub destination: LogDestination,
    /// Why the log file was not used, if it wasn't
    pub fallback_reason: Option<String>,
    _guard: WorkerGuard,
}

/// Install the global subscriber
///
/// Precedence for the filter: RUST_LOG > configured level.
pub fn init(config: &LoggingConfig) -> LogHandle {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let (writer, guard, destination, fallback_reason) = match open_appender(config) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (writer, guard, LogDestination::File(config.file.clone()), None)
        }
        Err(reason) => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            (writer, guard, LogDestination::Stderr, Some(reason))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    LogHandle {
        destination,
        fallback_reason,
        _guard: guard,
    }
}

/// Filter directive for this crate at `level`
pub fn default_directive(level: &str) -> String {
    format!("w3mimg_sixel={}", level.trim().to_lowercase())
}

fn open_appender(config: &LoggingConfig) -> Result<RollingFileAppender, String> {
    let (dir, name) = split_log_path(&config.file)
        .ok_or_else(|| format!("log path {} has no file name", config.file.display()))?;

    build_appender(&dir, &name, config.rotation)
        .map_err(|e| format!("cannot open log file {}: {e}", config.file.display()))
}

fn build_appender(dir: &Path, name: &OsString, rotation: LogRotation) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(to_rotation(rotation))
        .filename_prefix(name.to_string_lossy())
        .build(dir)
}

fn to_rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Split a log file path into the appender's directory and file prefix
fn split_log_path(path: &Path) -> Option<(PathBuf, OsString)> {
    let name = path.file_name()?.to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("info"), "w3mimg_sixel=info");
        assert_eq!(default_directive(" DEBUG "), "w3mimg_sixel=debug");
    }

    #[test]
    fn test_split_log_path() {
        assert_eq!(
            split_log_path(Path::new("/tmp/w3mimg-sixel.log")),
            Some((PathBuf::from("/tmp"), OsString::from("w3mimg-sixel.log")))
        );
        assert_eq!(
            split_log_path(Path::new("bare.log")),
            Some((PathBuf::from("."), OsString::from("bare.log")))
        );
        assert_eq!(split_log_path(Path::new("/")), None);
    }

    #[test]
    fn test_rotation_mapping() {
        assert_eq!(to_rotation(LogRotation::Never), Rotation::NEVER);
        assert_eq!(to_rotation(LogRotation::Hourly), Rotation::HOURLY);
        assert_eq!(to_rotation(LogRotation::Daily), Rotation::DAILY);
    }

    #[test]
    fn test_appender_opens_in_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            file: dir.path().join("logs").join("w3mimg.log"),
            ..LoggingConfig::default()
        };
        assert!(open_appender(&config).is_ok());
    }

    #[test]
    fn test_appender_fails_under_regular_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = LoggingConfig {
            file: file.path().join("w3mimg.log"),
            ..LoggingConfig::default()
        };

        let Err(reason) = open_appender(&config) else {
            panic!("log file under a regular file should not open");
        };
        assert!(reason.contains("cannot open log file"));
    }
}
