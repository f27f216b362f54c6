//! Top-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::integrity::IntegrityError;
use crate::logging::LoggingError;
use crate::manifest::ManifestError;
use crate::transfer::FetchError;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a compare, update or fetch run.
///
/// Failures of individual transfers are not errors at this level; they are
/// collected in the run report.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// A destination could not be prepared for writing.
    #[error("failed to prepare {}: {source}", path.display())]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The run was cancelled.
    #[error("interrupted")]
    Interrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_module_errors() {
        let err: SyncError = ManifestError::UnsupportedVersion(9).into();
        assert!(matches!(err, SyncError::Manifest(_)));
        assert_eq!(SyncError::Interrupted.to_string(), "interrupted");
    }
}
