//! Error types for local file inspection.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for integrity checks.
pub type IntegrityResult<T> = Result<T, IntegrityError>;

/// Errors raised while inspecting a local file.
///
/// A corrupt file is not an error; these cover files that cannot be
/// inspected at all.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// Failed to read a local file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// A digest string is not MD5 or SHA-256 hex.
    #[error("unrecognised digest '{0}'")]
    UnknownDigest(String),
}
