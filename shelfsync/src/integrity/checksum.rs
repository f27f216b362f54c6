//! Checksum calculation for file verification.
//!
//! Catalog digests are lowercase hex strings. The algorithm is implied by
//! the digest length: 32 characters is MD5, 64 is SHA-256.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::{IntegrityError, IntegrityResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithm of a catalog checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Md5,
    Sha256,
}

impl DigestKind {
    /// Infer the algorithm from a hex digest, or `None` if it is not one.
    pub fn detect(digest: &str) -> Option<Self> {
        if !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match digest.len() {
            32 => Some(Self::Md5),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

/// Incremental hasher over either supported algorithm.
pub enum Hasher {
    Md5(md5::Context),
    Sha256(Sha256),
}

impl Hasher {
    /// Create a hasher for `kind`.
    pub fn new(kind: DigestKind) -> Self {
        match kind {
            DigestKind::Md5 => Self::Md5(md5::Context::new()),
            DigestKind::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    /// Create a hasher matching the algorithm of `expected`.
    pub fn for_digest(expected: &str) -> Option<Self> {
        DigestKind::detect(expected).map(Self::new)
    }

    /// Feed bytes.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(data),
            Self::Sha256(hasher) => hasher.update(data),
        }
    }

    /// Lowercase hex digest of everything fed so far.
    pub fn finalize(self) -> String {
        match self {
            Self::Md5(ctx) => format!("{:x}", ctx.compute()),
            Self::Sha256(hasher) => format!("{:x}", hasher.finalize()),
        }
    }
}

/// Compare a computed digest against a catalog digest.
pub fn digest_matches(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected)
}

/// Digest of an in-memory buffer.
pub fn checksum_bytes(kind: DigestKind, data: &[u8]) -> String {
    let mut hasher = Hasher::new(kind);
    hasher.update(data);
    hasher.finalize()
}

/// Calculate the checksum of a file.
///
/// # Returns
///
/// The lowercase hexadecimal digest of the file contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn calculate_file_checksum(path: &Path, kind: DigestKind) -> IntegrityResult<String> {
    let mut file = File::open(path).map_err(|e| IntegrityError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Hasher::new(kind);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| IntegrityError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Check a file against an expected catalog digest.
///
/// Returns `Ok(false)` for a mismatch and an error only if the file cannot be
/// read or the digest is not recognised.
pub fn file_matches(path: &Path, expected: &str) -> IntegrityResult<bool> {
    let kind = DigestKind::detect(expected)
        .ok_or_else(|| IntegrityError::UnknownDigest(expected.to_string()))?;
    let actual = calculate_file_checksum(path, kind)?;
    Ok(digest_matches(&actual, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    #[test]
    fn test_detect_kind() {
        assert_eq!(DigestKind::detect(HELLO_MD5), Some(DigestKind::Md5));
        assert_eq!(DigestKind::detect(HELLO_SHA256), Some(DigestKind::Sha256));
        assert_eq!(DigestKind::detect("abc"), None);
        assert_eq!(DigestKind::detect(&"z".repeat(32)), None);
    }

    #[test]
    fn test_calculate_file_checksum() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        assert_eq!(
            calculate_file_checksum(&file_path, DigestKind::Sha256).unwrap(),
            HELLO_SHA256
        );
        assert_eq!(
            calculate_file_checksum(&file_path, DigestKind::Md5).unwrap(),
            HELLO_MD5
        );
    }

    #[test]
    fn test_calculate_empty_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("empty.txt");

        File::create(&file_path).unwrap();

        assert_eq!(
            calculate_file_checksum(&file_path, DigestKind::Md5).unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_calculate_nonexistent_file() {
        let result = calculate_file_checksum(Path::new("/nonexistent/file.txt"), DigestKind::Md5);
        assert!(matches!(result, Err(IntegrityError::ReadFailed { .. })));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = vec![0xABu8; 100_000];
        let mut hasher = Hasher::new(DigestKind::Md5);
        for block in data.chunks(7_000) {
            hasher.update(block);
        }
        assert_eq!(hasher.finalize(), checksum_bytes(DigestKind::Md5, &data));
    }

    #[test]
    fn test_file_matches_ignores_case() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();

        assert!(file_matches(&file_path, &HELLO_MD5.to_uppercase()).unwrap());
        assert!(!file_matches(&file_path, "d41d8cd98f00b204e9800998ecf8427e").unwrap());
    }
}
