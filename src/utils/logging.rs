//! Logging system initialization
//!
//! Sets up tracing-based logging with file output to
//! %APPDATA%\claude-notch-windows\logs\notch.log. Logs are rotated on every startup,
//! keeping the previous nine runs.

use crate::config::SettingsManager;
use crate::error::{NotchError, Result, StringError};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Maximum number of historical log files to keep (notch.log.1 through notch.log.9)
const MAX_LOG_FILES: u8 = 9;

/// Directory holding the log files
pub fn get_log_dir() -> PathBuf {
    SettingsManager::get_settings_dir().join("logs")
}

/// Path of the current log file
pub fn get_log_path() -> PathBuf {
    get_log_dir().join("notch.log")
}

/// Initialize the logging system
///
/// Log level defaults to INFO but can be configured via `RUST_LOG`.
pub fn init_logging() -> Result<()> {
    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir)?;
    rotate_logs_on_startup(&get_log_path())?;

    // Rotation happens above, once per run
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("notch")
        .filename_suffix("log")
        .build(&log_dir)
        .map_err(|e| NotchError::LoggingError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| NotchError::LoggingError(Box::new(e)))?;

    tracing::info!("Claude Notch v{} started", env!("CARGO_PKG_VERSION"));

    Ok(())
}

/// Shift `notch.log` -> `notch.log.1` -> ... -> `notch.log.9`, dropping the oldest
///
/// A missing current log is not an error.
fn rotate_logs_on_startup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let numbered = |n: u8| -> Result<PathBuf> {
        let name = log_path
            .file_name()
            .ok_or_else(|| NotchError::LoggingError(StringError::new("Invalid log filename")))?;
        let mut name = name.to_os_string();
        name.push(format!(".{n}"));
        Ok(log_path.with_file_name(name))
    };

    let oldest = numbered(MAX_LOG_FILES)?;
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }

    for n in (1..MAX_LOG_FILES).rev() {
        let from = numbered(n)?;
        if from.exists() {
            std::fs::rename(&from, numbered(n + 1)?)?;
        }
    }

    std::fs::rename(log_path, numbered(1)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dir;
    use std::fs;

    #[test]
    fn test_log_path_location() {
        let path = get_log_path();
        assert!(path.ends_with("logs/notch.log") || path.ends_with(r"logs\notch.log"));
    }

    #[test]
    fn test_rotate_moves_current_log() {
        let dir = create_test_dir();
        let log_path = dir.path().join("notch.log");
        fs::write(&log_path, "run 1").unwrap();

        rotate_logs_on_startup(&log_path).unwrap();

        assert!(!log_path.exists());
        assert_eq!(fs::read_to_string(dir.path().join("notch.log.1")).unwrap(), "run 1");
    }

    #[test]
    fn test_rotate_keeps_order_across_runs() {
        let dir = create_test_dir();
        let log_path = dir.path().join("notch.log");

        for run in 1..=4 {
            fs::write(&log_path, format!("run {run}")).unwrap();
            rotate_logs_on_startup(&log_path).unwrap();
        }

        for n in 1..=4 {
            let content = fs::read_to_string(dir.path().join(format!("notch.log.{n}"))).unwrap();
            assert_eq!(content, format!("run {}", 5 - n));
        }
    }

    #[test]
    fn test_rotate_caps_history() {
        let dir = create_test_dir();
        let log_path = dir.path().join("notch.log");

        for run in 1..=12 {
            fs::write(&log_path, format!("run {run}")).unwrap();
            rotate_logs_on_startup(&log_path).unwrap();
        }

        assert!(!dir.path().join("notch.log.10").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join(format!("notch.log.{MAX_LOG_FILES}"))).unwrap(),
            "run 4"
        );
        assert_eq!(fs::read_to_string(dir.path().join("notch.log.1")).unwrap(), "run 12");
    }

    #[test]
    fn test_rotate_without_current_log() {
        let dir = create_test_dir();
        let log_path = dir.path().join("notch.log");
        fs::write(dir.path().join("notch.log.1"), "old").unwrap();

        rotate_logs_on_startup(&log_path).unwrap();

        assert!(!dir.path().join("notch.log.2").exists());
        assert_eq!(fs::read_to_string(dir.path().join("notch.log.1")).unwrap(), "old");
    }

    #[test]
    fn test_rotate_with_gaps() {
        let dir = create_test_dir();
        let log_path = dir.path().join("notch.log");
        fs::write(&log_path, "current").unwrap();
        fs::write(dir.path().join("notch.log.5"), "ancient").unwrap();

        rotate_logs_on_startup(&log_path).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("notch.log.1")).unwrap(), "current");
        assert_eq!(fs::read_to_string(dir.path().join("notch.log.6")).unwrap(), "ancient");
        assert!(!dir.path().join("notch.log.5").exists());
    }
}
