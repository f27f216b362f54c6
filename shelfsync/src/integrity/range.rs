//! Inclusive byte ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An inclusive byte range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a range. `end` is inclusive.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "inverted range {}-{}", start, end);
        Self { start, end }
    }

    /// The whole of a file of `size` bytes, or `None` for an empty file.
    pub fn whole(size: u64) -> Option<Self> {
        size.checked_sub(1).map(|end| Self::new(0, end))
    }

    /// The bytes from `offset` to the end of a `size`-byte file.
    pub fn tail(offset: u64, size: u64) -> Option<Self> {
        (offset < size).then(|| Self::new(offset, size - 1))
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for an HTTP `Range` request header.
    pub fn to_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// The needed ranges for a whole file of `size` bytes.
pub fn whole_file(size: u64) -> Vec<ByteRange> {
    ByteRange::whole(size).into_iter().collect()
}

/// Total number of bytes across `ranges`.
pub fn total_len(ranges: &[ByteRange]) -> u64 {
    ranges.iter().map(ByteRange::len).sum()
}
