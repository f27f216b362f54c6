//! Error types for manifest loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors raised while loading or validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// The document is not valid manifest JSON.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document declares a format version this build does not understand.
    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u32),

    /// A checksum is not a recognised hex digest.
    #[error("item {item_id} file '{file}': invalid checksum '{checksum}'")]
    InvalidChecksum {
        item_id: u64,
        file: String,
        checksum: String,
    },

    /// A chunk table does not tile the file exactly.
    #[error("item {item_id} file '{file}': invalid chunk table: {reason}")]
    InvalidChunkTable {
        item_id: u64,
        file: String,
        reason: String,
    },

    /// A file name is not a single plain path component.
    #[error("item {item_id}: invalid file name '{file}'")]
    InvalidFileName { item_id: u64, file: String },

    /// A directory hint is not a single plain path component.
    #[error("item {item_id}: invalid directory hint '{dir_hint}'")]
    InvalidDirHint { item_id: u64, dir_hint: String },

    /// Two files of one item share a name.
    #[error("item {item_id} lists file '{file}' more than once")]
    DuplicateFile { item_id: u64, file: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_chunk_table_display() {
        let err = ManifestError::InvalidChunkTable {
            item_id: 3,
            file: "setup.exe".to_string(),
            reason: "chunk 1 starts at 9, expected 8".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "item 3 file 'setup.exe': invalid chunk table: chunk 1 starts at 9, expected 8"
        );
    }
}
