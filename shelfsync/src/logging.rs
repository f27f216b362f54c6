//! Logging setup.
//!
//! Installs a `tracing` subscriber with an env filter (`RUST_LOG` takes
//! precedence over the configured level), a stderr layer, and an optional
//! non-blocking file layer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogSettings;

const TIME_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

/// Errors from installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("invalid log file path {}", path.display())]
    InvalidFile { path: PathBuf },

    #[error("failed to create log directory: {0}")]
    Io(#[from] io::Error),

    #[error("invalid time format: {0}")]
    TimeFormat(String),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// What to log and where.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `shelfsync=debug`.
    pub level: String,
    /// Also write to this file.
    pub file: Option<PathBuf>,
    /// Colour the stderr output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            ansi: true,
        }
    }
}

impl From<&LogSettings> for LoggingConfig {
    fn from(settings: &LogSettings) -> Self {
        Self {
            level: settings.level.clone(),
            file: settings.file.clone(),
            ..Self::default()
        }
    }
}

/// Keeps the file writer alive; drop it at exit to flush.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter {
                filter: config.level.clone(),
                reason: e.to_string(),
            })?
        }
    };

    let format = time::format_description::parse(TIME_FORMAT)
        .map_err(|e| LoggingError::TimeFormat(e.to_string()))?;
    let timer = LocalTime::new(format);

    let stderr_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_ansi(config.ansi)
        .with_writer(io::stderr);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let (dir, name) = match (path.parent(), path.file_name()) {
                (Some(dir), Some(name)) => (dir, name),
                _ => return Err(LoggingError::InvalidFile { path: path.clone() }),
            };
            let dir = if dir.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                dir.to_path_buf()
            };
            std::fs::create_dir_all(&dir)?;

            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_timer(timer)
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}
