//! Error types for the validation cache.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised while loading or saving the validation cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read validation cache {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("failed to write validation cache {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The file exists but is not a valid cache document.
    #[error("malformed validation cache {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("validation cache {} has unsupported version {version}", path.display())]
    UnsupportedVersion { path: PathBuf, version: u32 },
}
