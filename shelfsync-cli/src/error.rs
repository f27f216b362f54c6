//! CLI error type.

use std::fmt;

use shelfsync::config::ConfigError;
use shelfsync::logging::LoggingError;
use shelfsync::manifest::ManifestError;
use shelfsync::transfer::FetchError;
use shelfsync::SyncError;

/// Errors surfaced to the user by the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem, with a message for the user.
    Config(String),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// The manifest could not be loaded.
    Manifest(ManifestError),
    /// The HTTP client could not be created.
    Http(FetchError),
    /// A compare, update or fetch run failed.
    Sync(SyncError),
    /// The user pressed Ctrl+C.
    Interrupted,
    /// The run finished but some transfers failed.
    Incomplete { failed: usize, abandoned: usize },
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Interrupted => 130,
            CliError::Incomplete { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Manifest(e) => write!(f, "Manifest error: {}", e),
            CliError::Http(e) => write!(f, "HTTP client error: {}", e),
            CliError::Sync(e) => write!(f, "{}", e),
            CliError::Interrupted => write!(f, "Interrupted"),
            CliError::Incomplete { failed, abandoned } => write!(
                f,
                "{} transfer(s) failed, {} abandoned; run fetch again to retry",
                failed, abandoned
            ),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        CliError::Manifest(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Http(e)
    }
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Interrupted => CliError::Interrupted,
            SyncError::Manifest(e) => CliError::Manifest(e),
            other => CliError::Sync(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 1);
        assert_eq!(CliError::from(SyncError::Interrupted).exit_code(), 130);
        assert_eq!(
            CliError::Incomplete {
                failed: 1,
                abandoned: 0
            }
            .exit_code(),
            2
        );
    }

    #[test]
    fn test_display() {
        let err = CliError::Incomplete {
            failed: 3,
            abandoned: 2,
        };
        assert_eq!(
            err.to_string(),
            "3 transfer(s) failed, 2 abandoned; run fetch again to retry"
        );
    }
}
