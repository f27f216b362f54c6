//! Validation records: the cached outcome of comparing one file.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::range::{self, ByteRange};
use crate::manifest::RemoteFile;

/// Identity of a file across runs: (item id, file name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    pub item_id: u64,
    pub file_name: String,
}

impl FileKey {
    pub fn new(item_id: u64, file_name: impl Into<String>) -> Self {
        Self {
            item_id,
            file_name: file_name.into(),
        }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.item_id, self.file_name)
    }
}

/// What the manifest said about a file when it was last validated.
///
/// A changed signature means the cached verdict no longer applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl Signature {
    /// Signature of a manifest entry.
    pub fn of(file: &RemoteFile) -> Self {
        Self {
            size: file.size,
            checksum: file.checksum.as_ref().map(|c| c.to_ascii_lowercase()),
        }
    }
}

/// Outcome of validating one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub key: FileKey,
    pub signature: Signature,
    /// Ordered, non-overlapping ranges still required.
    #[serde(default)]
    pub needed: Vec<ByteRange>,
    /// The local file is oversized and must be deleted before refetching.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub drop: bool,
}

impl ValidationRecord {
    /// A record that needs the whole file.
    pub fn fresh(item_id: u64, file: &RemoteFile) -> Self {
        Self {
            key: FileKey::new(item_id, file.name.clone()),
            signature: Signature::of(file),
            needed: range::whole_file(file.size),
            drop: false,
        }
    }

    /// True when nothing is left to fetch.
    pub fn is_complete(&self) -> bool {
        self.needed.is_empty()
    }

    /// True when this record conclusively vouches for `file`.
    pub fn vouches_for(&self, file: &RemoteFile) -> bool {
        self.is_complete() && self.signature == Signature::of(file)
    }

    /// Bytes still required.
    pub fn needed_bytes(&self) -> u64 {
        range::total_len(&self.needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_record_needs_everything() {
        let file = RemoteFile::new("a.bin", "u", 100);
        let record = ValidationRecord::fresh(7, &file);
        assert_eq!(record.key, FileKey::new(7, "a.bin"));
        assert_eq!(record.needed, vec![ByteRange::new(0, 99)]);
        assert_eq!(record.needed_bytes(), 100);
        assert!(!record.drop);
    }

    #[test]
    fn test_vouches_only_for_unchanged_complete_file() {
        let file = RemoteFile::new("a.bin", "u", 100);
        let mut record = ValidationRecord::fresh(7, &file);
        assert!(!record.vouches_for(&file));

        record.needed.clear();
        assert!(record.vouches_for(&file));

        let resized = RemoteFile::new("a.bin", "u", 101);
        assert!(!record.vouches_for(&resized));

        let rehashed = file.clone().with_checksum("0cc175b9c0f1b6a831c399e269772661");
        assert!(!record.vouches_for(&rehashed));
    }

    #[test]
    fn test_signature_ignores_digest_case() {
        let lower = RemoteFile::new("a", "u", 1).with_checksum("0cc175b9c0f1b6a831c399e269772661");
        let upper = RemoteFile::new("a", "u", 1).with_checksum("0CC175B9C0F1B6A831C399E269772661");
        assert_eq!(Signature::of(&lower), Signature::of(&upper));
    }
}
