//! Error types for range transfers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::integrity::ByteRange;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for transfers.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors from the fetch capability itself.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The request failed before a response arrived.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

/// Broad class of a transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The destination cannot be written as-is.
    StaleInput,
    /// Network or local I/O failure; the next validation pass retries it.
    TransferFault,
    /// The server did not honour the requested range.
    ProtocolViolation,
}

/// A failed work item.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Destination is a directory or has no parent directory.
    #[error("cannot write {}: {reason}", path.display())]
    StaleInput { path: PathBuf, reason: String },

    /// Fetch failed before or while receiving the body.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Server answered with a non-success status.
    #[error("GET {url} ({range}) failed with status {status}")]
    Status {
        url: String,
        range: ByteRange,
        status: u16,
    },

    /// Reading the response body failed.
    #[error("reading {url} ({range}) failed: {source}")]
    Read {
        url: String,
        range: ByteRange,
        source: io::Error,
    },

    /// Writing to the destination failed.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The server served something other than the requested range.
    #[error("unexpected server behaviour for {url} ({requested}): {detail}")]
    ProtocolViolation {
        url: String,
        requested: ByteRange,
        detail: String,
    },
}

impl TransferError {
    /// Classify the failure.
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::StaleInput { .. } => FaultKind::StaleInput,
            Self::ProtocolViolation { .. } => FaultKind::ProtocolViolation,
            Self::Fetch(_) | Self::Status { .. } | Self::Read { .. } | Self::Write { .. } => {
                FaultKind::TransferFault
            }
        }
    }

    /// True if the worker that hit this must stop.
    pub fn is_fatal_to_worker(&self) -> bool {
        self.kind() == FaultKind::ProtocolViolation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let stale = TransferError::StaleInput {
            path: PathBuf::from("/a"),
            reason: "destination is a directory".to_string(),
        };
        assert_eq!(stale.kind(), FaultKind::StaleInput);
        assert!(!stale.is_fatal_to_worker());

        let status = TransferError::Status {
            url: "https://cdn/a".to_string(),
            range: ByteRange::new(0, 9),
            status: 503,
        };
        assert_eq!(status.kind(), FaultKind::TransferFault);
        assert_eq!(
            status.to_string(),
            "GET https://cdn/a (0-9) failed with status 503"
        );

        let timeout = TransferError::from(FetchError::Timeout {
            url: "https://cdn/a".to_string(),
            timeout_secs: 30,
        });
        assert_eq!(timeout.kind(), FaultKind::TransferFault);

        let violation = TransferError::ProtocolViolation {
            url: "https://cdn/a".to_string(),
            requested: ByteRange::new(0, 9),
            detail: "served bytes 0-19".to_string(),
        };
        assert!(violation.is_fatal_to_worker());
    }
}
