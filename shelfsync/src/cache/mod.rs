//! Persisted validation results.
//!
//! The cache maps (item id, file name) to the last [`ValidationRecord`] so
//! that repeated runs can skip files that were already complete and whose
//! manifest entry has not changed.
//!
//! The on-disk format is versioned JSON with stable field names:
//!
//! ```text
//! { "version": 1, "saved_at": "2026-10-17T12:00:00+00:00", "records": [ ... ] }
//! ```
//!
//! Records are written sorted by key so the file is deterministic.

mod error;

pub use error::{CacheError, CacheResult};

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::integrity::{FileKey, ValidationRecord};

/// Cache format version written and accepted by this crate.
pub const CACHE_VERSION: u32 = 1;

/// How much to trust the cache during a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparisonMode {
    /// Ignore the cache and inspect every file.
    Full,
    /// Reuse cached verdicts for unchanged, complete files.
    #[default]
    Incremental,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    saved_at: String,
    records: Vec<ValidationRecord>,
}

/// In-memory view of the validation cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationCache {
    records: BTreeMap<FileKey, ValidationRecord>,
}

impl ValidationCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from a complete set of records.
    pub fn from_records(records: impl IntoIterator<Item = ValidationRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.key.clone(), r)).collect(),
        }
    }

    /// Load the cache file. A missing file yields an empty cache.
    pub fn load(path: &Path) -> CacheResult<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(CacheError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let parsed: CacheFile =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| CacheError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        if parsed.version != CACHE_VERSION {
            return Err(CacheError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: parsed.version,
            });
        }

        Ok(Self::from_records(parsed.records))
    }

    /// Save the cache, replacing the file atomically.
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let write_failed = |path: &Path, e: io::Error| CacheError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_failed(parent, e))?;
        }

        let document = CacheFile {
            version: CACHE_VERSION,
            saved_at: chrono::Local::now().to_rfc3339(),
            records: self.records.values().cloned().collect(),
        };

        // Write to temp file first, then rename for atomicity
        let temp_path = temp_path_for(path);
        let file = File::create(&temp_path).map_err(|e| write_failed(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &document)
            .map_err(|e| write_failed(&temp_path, io::Error::other(e)))?;
        writer.flush().map_err(|e| write_failed(&temp_path, e))?;
        drop(writer);

        fs::rename(&temp_path, path).map_err(|e| write_failed(path, e))?;

        tracing::debug!(path = %path.display(), records = self.records.len(), "Saved validation cache");
        Ok(())
    }

    /// The record to consult for `key` under `mode`.
    pub fn lookup(&self, key: &FileKey, mode: ComparisonMode) -> Option<&ValidationRecord> {
        match mode {
            ComparisonMode::Full => None,
            ComparisonMode::Incremental => self.records.get(key),
        }
    }

    /// The stored record for `key`.
    pub fn get(&self, key: &FileKey) -> Option<&ValidationRecord> {
        self.records.get(key)
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, record: ValidationRecord) {
        self.records.insert(record.key.clone(), record);
    }

    /// Records in key order.
    pub fn records(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
