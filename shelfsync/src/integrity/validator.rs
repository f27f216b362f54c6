//! Comparison of a manifest entry against its local copy.
//!
//! The checks run from strongest to weakest signal:
//!
//! 1. A cached record with an unchanged signature and nothing outstanding is
//!    trusted without touching the filesystem.
//! 2. A missing file needs everything.
//! 3. An oversized file needs everything and must be dropped first.
//! 4. A chunk table pins corruption down to individual chunks; a short read
//!    is an unfinished tail, not corruption.
//! 5. Without a chunk table, a short file needs its tail, and an equal-sized
//!    file is checked by whole-file checksum, then container self-check, and
//!    is otherwise trusted on size alone.

use std::cmp::min;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::checksum::{digest_matches, file_matches, Hasher};
use super::container::{verify_container, ContainerFormat};
use super::error::{IntegrityError, IntegrityResult};
use super::range::{self, ByteRange};
use super::record::ValidationRecord;
use crate::manifest::{Chunk, RemoteFile};

/// Read block size while hashing chunks (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Classification of a file after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Nothing to fetch.
    Valid,
    /// No local file exists.
    Missing,
    /// A local file exists but some ranges must be refetched.
    Corrupt,
}

/// Chunk-level and whole-file checksums disagree about a file.
///
/// Known to happen with some catalog entries. The chunk verdict wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inconsistency {
    /// At least one chunk failed its checksum.
    pub chunks_corrupt: bool,
    /// The whole-file checksum matched.
    pub file_checksum_matches: bool,
}

/// Result of validating one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub record: ValidationRecord,
    pub status: FileStatus,
    pub inconsistency: Option<Inconsistency>,
    /// The verdict came from the cache without reading the file.
    pub from_cache: bool,
}

impl Validation {
    fn inspected(record: ValidationRecord, status: FileStatus) -> Self {
        Self {
            record,
            status,
            inconsistency: None,
            from_cache: false,
        }
    }
}

/// Validate `file` of item `item_id` against the local copy at `path`.
///
/// `cached` is the previous record for this file, if the caller wants
/// incremental behaviour.
pub fn validate(
    item_id: u64,
    file: &RemoteFile,
    cached: Option<&ValidationRecord>,
    path: &Path,
) -> IntegrityResult<Validation> {
    if let Some(record) = cached.filter(|r| r.vouches_for(file)) {
        return Ok(Validation {
            record: record.clone(),
            status: FileStatus::Valid,
            inconsistency: None,
            from_cache: true,
        });
    }

    let mut record = ValidationRecord::fresh(item_id, file);

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(Validation::inspected(record, FileStatus::Missing));
        }
        Err(e) => {
            return Err(IntegrityError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if !metadata.is_file() {
        return Ok(Validation::inspected(record, FileStatus::Corrupt));
    }

    let on_disk = metadata.len();
    if on_disk > file.size {
        record.drop = true;
        return Ok(Validation::inspected(record, FileStatus::Corrupt));
    }

    let mut inconsistency = None;
    record.needed = match file.chunk_table() {
        Some(chunks) => {
            let scan = scan_chunks(path, file, chunks)?;
            inconsistency = scan.inconsistency;
            scan.needed
        }
        None => compare_unchunked(path, file, on_disk)?,
    };

    if let Some(found) = inconsistency {
        tracing::warn!(
            item = item_id,
            file = %file.name,
            chunks_corrupt = found.chunks_corrupt,
            file_checksum_matches = found.file_checksum_matches,
            "Chunk checksums disagree with whole-file checksum, trusting chunks"
        );
    }

    let status = if record.needed.is_empty() {
        FileStatus::Valid
    } else {
        FileStatus::Corrupt
    };

    Ok(Validation {
        record,
        status,
        inconsistency,
        from_cache: false,
    })
}

struct ChunkScan {
    needed: Vec<ByteRange>,
    inconsistency: Option<Inconsistency>,
}

/// Single pass over the file, hashing each declared chunk.
fn scan_chunks(path: &Path, file: &RemoteFile, chunks: &[Chunk]) -> IntegrityResult<ChunkScan> {
    let read_failed = |e: io::Error| IntegrityError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut reader = BufReader::new(File::open(path).map_err(read_failed)?);
    let mut whole = file.checksum.as_deref().and_then(Hasher::for_digest);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    let mut needed = Vec::new();
    let mut chunks_corrupt = false;
    let mut complete = true;

    for chunk in chunks {
        let mut hasher = Hasher::for_digest(&chunk.checksum)
            .ok_or_else(|| IntegrityError::UnknownDigest(chunk.checksum.clone()))?;

        let want = chunk.len();
        let mut got = 0u64;
        while got < want {
            let block = min(BUFFER_SIZE as u64, want - got) as usize;
            let n = reader.read(&mut buffer[..block]).map_err(read_failed)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
            if let Some(whole) = whole.as_mut() {
                whole.update(&buffer[..n]);
            }
            got += n as u64;
        }

        if got < want {
            complete = false;
            needed.push(ByteRange::new(chunk.start + got, chunk.end));
        } else if !digest_matches(&hasher.finalize(), &chunk.checksum) {
            chunks_corrupt = true;
            needed.push(chunk.range());
        }
    }

    let inconsistency = match (complete, whole, file.checksum.as_deref()) {
        (true, Some(whole), Some(expected)) => {
            let file_checksum_matches = digest_matches(&whole.finalize(), expected);
            (chunks_corrupt == file_checksum_matches).then_some(Inconsistency {
                chunks_corrupt,
                file_checksum_matches,
            })
        }
        _ => None,
    };

    Ok(ChunkScan {
        needed,
        inconsistency,
    })
}

fn compare_unchunked(path: &Path, file: &RemoteFile, on_disk: u64) -> IntegrityResult<Vec<ByteRange>> {
    if on_disk < file.size {
        // Plain partial download; the prefix is assumed good.
        return Ok(ByteRange::tail(on_disk, file.size).into_iter().collect());
    }

    let intact = if let Some(expected) = file.checksum.as_deref() {
        file_matches(path, expected)?
    } else if let Some(format) = ContainerFormat::detect(Path::new(&file.name)) {
        verify_container(path, format)?
    } else {
        true
    };

    Ok(if intact {
        Vec::new()
    } else {
        range::whole_file(file.size)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::checksum::{checksum_bytes, DigestKind};
    use proptest::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    fn chunked(name: &str, data: &[u8], chunk_size: usize) -> RemoteFile {
        let chunks = data
            .chunks(chunk_size)
            .enumerate()
            .map(|(i, bytes)| {
                let start = (i * chunk_size) as u64;
                Chunk {
                    start,
                    end: start + bytes.len() as u64 - 1,
                    checksum: checksum_bytes(DigestKind::Md5, bytes),
                }
            })
            .collect();
        RemoteFile::new(name, "https://cdn/file", data.len() as u64)
            .with_checksum(checksum_bytes(DigestKind::Md5, data))
            .with_chunks(chunks)
    }

    fn write(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_missing_file_needs_everything() {
        let temp = TempDir::new().unwrap();
        let file = RemoteFile::new("setup.exe", "u", 500);

        let result = validate(1, &file, None, &temp.path().join("setup.exe")).unwrap();

        assert_eq!(result.status, FileStatus::Missing);
        assert_eq!(result.record.needed, vec![ByteRange::new(0, 499)]);
        assert!(!result.record.drop);
    }

    #[test]
    fn test_exact_chunked_file_is_valid() {
        let temp = TempDir::new().unwrap();
        let data = content(1000);
        let file = chunked("setup.exe", &data, 256);
        let path = write(&temp, "setup.exe", &data);

        let result = validate(1, &file, None, &path).unwrap();

        assert_eq!(result.status, FileStatus::Valid);
        assert!(result.record.needed.is_empty());
        assert_eq!(result.inconsistency, None);
    }

    #[test]
    fn test_exact_unchunked_file_is_valid_with_and_without_checksum() {
        let temp = TempDir::new().unwrap();
        let data = content(300);
        let path = write(&temp, "manual.pdf", &data);

        let plain = RemoteFile::new("manual.pdf", "u", 300);
        let summed = plain
            .clone()
            .with_checksum(checksum_bytes(DigestKind::Sha256, &data));

        assert_eq!(validate(1, &plain, None, &path).unwrap().status, FileStatus::Valid);
        assert_eq!(validate(1, &summed, None, &path).unwrap().status, FileStatus::Valid);
    }

    #[test]
    fn test_one_corrupt_chunk() {
        let temp = TempDir::new().unwrap();
        let data = content(1000);
        let file = chunked("setup.exe", &data, 256);

        let mut damaged = data.clone();
        damaged[600] ^= 0xFF;
        let path = write(&temp, "setup.exe", &damaged);

        let result = validate(1, &file, None, &path).unwrap();
        assert_eq!(result.status, FileStatus::Corrupt);
        assert_eq!(result.record.needed, vec![ByteRange::new(512, 767)]);
        assert_eq!(result.inconsistency, None);

        // Repair only the flagged range.
        fs::write(&path, &data).unwrap();
        let result = validate(1, &file, None, &path).unwrap();
        assert!(result.record.needed.is_empty());
    }

    #[test]
    fn test_truncated_chunked_file() {
        let temp = TempDir::new().unwrap();
        let data = content(1000);
        let file = chunked("setup.exe", &data, 256);
        let path = write(&temp, "setup.exe", &data[..300]);

        let result = validate(1, &file, None, &path).unwrap();

        assert_eq!(result.status, FileStatus::Corrupt);
        assert_eq!(
            result.record.needed,
            vec![
                ByteRange::new(300, 511),
                ByteRange::new(512, 767),
                ByteRange::new(768, 999),
            ]
        );
    }

    #[test]
    fn test_oversized_file_is_dropped() {
        let temp = TempDir::new().unwrap();
        let data = content(1000);
        let mut bigger = data.clone();
        bigger.extend_from_slice(b"trailing");
        let path = write(&temp, "setup.exe", &bigger);

        for file in [
            chunked("setup.exe", &data, 256),
            RemoteFile::new("setup.exe", "u", 1000),
        ] {
            let result = validate(1, &file, None, &path).unwrap();
            assert!(result.record.drop);
            assert_eq!(result.record.needed, vec![ByteRange::new(0, 999)]);
            assert_eq!(result.status, FileStatus::Corrupt);
        }
    }

    #[test]
    fn test_short_unchunked_file_needs_tail() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "ost.mp3", &content(40));
        let file = RemoteFile::new("ost.mp3", "u", 100);

        let result = validate(1, &file, None, &path).unwrap();

        assert_eq!(result.record.needed, vec![ByteRange::new(40, 99)]);
        assert!(!result.record.drop);
    }

    #[test]
    fn test_equal_size_checksum_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "ost.mp3", &content(100));
        let file = RemoteFile::new("ost.mp3", "u", 100)
            .with_checksum(checksum_bytes(DigestKind::Md5, b"something else"));

        let result = validate(1, &file, None, &path).unwrap();
        assert_eq!(result.record.needed, vec![ByteRange::new(0, 99)]);
    }

    #[test]
    fn test_equal_size_broken_container() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "wallpapers.zip", &[0u8; 128]);
        let file = RemoteFile::new("wallpapers.zip", "u", 128);

        let result = validate(1, &file, None, &path).unwrap();
        assert_eq!(result.status, FileStatus::Corrupt);
        assert_eq!(result.record.needed, vec![ByteRange::new(0, 127)]);
    }

    #[test]
    fn test_equal_size_without_signal_is_trusted() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "notes.txt", &[0u8; 128]);
        let file = RemoteFile::new("notes.txt", "u", 128);

        let result = validate(1, &file, None, &path).unwrap();
        assert_eq!(result.status, FileStatus::Valid);
    }

    #[test]
    fn test_whole_file_disagreement_is_reported() {
        let temp = TempDir::new().unwrap();
        let data = content(1000);
        let file = chunked("setup.exe", &data, 256)
            .with_checksum(checksum_bytes(DigestKind::Md5, b"stale"));
        let path = write(&temp, "setup.exe", &data);

        let result = validate(1, &file, None, &path).unwrap();

        assert_eq!(
            result.inconsistency,
            Some(Inconsistency {
                chunks_corrupt: false,
                file_checksum_matches: false,
            })
        );
        assert!(result.record.needed.is_empty());
        assert_eq!(result.status, FileStatus::Valid);
    }

    #[test]
    fn test_cached_record_skips_filesystem() {
        let temp = TempDir::new().unwrap();
        let data = content(1000);
        let file = chunked("setup.exe", &data, 256);
        let path = write(&temp, "setup.exe", &data);

        let first = validate(1, &file, None, &path).unwrap();
        assert!(!first.from_cache);

        // The file is gone, so only the cache can answer.
        fs::remove_file(&path).unwrap();
        let second = validate(1, &file, Some(&first.record), &path).unwrap();

        assert!(second.from_cache);
        assert_eq!(second.record, first.record);
        assert_eq!(second.status, FileStatus::Valid);
    }

    #[test]
    fn test_cached_record_with_outstanding_ranges_is_rechecked() {
        let temp = TempDir::new().unwrap();
        let data = content(1000);
        let file = chunked("setup.exe", &data, 256);
        let path = write(&temp, "setup.exe", &data[..100]);

        let first = validate(1, &file, None, &path).unwrap();
        fs::write(&path, &data).unwrap();
        let second = validate(1, &file, Some(&first.record), &path).unwrap();

        assert!(!second.from_cache);
        assert!(second.record.needed.is_empty());
    }

    #[test]
    fn test_stale_signature_is_rechecked() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.bin", &content(10));
        let old = RemoteFile::new("a.bin", "u", 10);
        let first = validate(1, &old, None, &path).unwrap();

        let grown = RemoteFile::new("a.bin", "u", 20);
        let second = validate(1, &grown, Some(&first.record), &path).unwrap();

        assert!(!second.from_cache);
        assert_eq!(second.record.needed, vec![ByteRange::new(10, 19)]);
    }

    proptest! {
        #[test]
        fn prop_truncation_never_requests_earlier_bytes(len in 0usize..1000) {
            let temp = TempDir::new().unwrap();
            let data = content(1000);
            let file = chunked("setup.exe", &data, 128);
            let path = write(&temp, "setup.exe", &data[..len]);

            let result = validate(1, &file, None, &path).unwrap();
            let first = result.record.needed.first().copied().unwrap();

            prop_assert_eq!(first.start, len as u64);
            prop_assert_eq!(file.chunk_index_at(first.start), Some(len / 128));
            prop_assert_eq!(result.record.needed.last().unwrap().end, 999);
        }
    }
}
