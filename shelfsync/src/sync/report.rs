//! Results of validation passes and fetch runs.

use std::path::PathBuf;

use crate::integrity::{FileKey, FileStatus, Inconsistency};
use crate::manifest::FileKind;
use crate::transfer::RunReport;

/// Verdict for one file in a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub key: FileKey,
    pub kind: FileKind,
    pub path: PathBuf,
    pub status: FileStatus,
    pub needed_bytes: u64,
    pub from_cache: bool,
    pub inconsistency: Option<Inconsistency>,
}

/// Outcome of a validation pass, in manifest order.
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub entries: Vec<AuditEntry>,
    /// Files that could not be read, with the reason.
    pub unreadable: Vec<(FileKey, String)>,
    /// Files skipped because their name is unknown.
    pub unnamed: usize,
}

impl AuditReport {
    pub fn valid(&self) -> impl Iterator<Item = &AuditEntry> {
        self.with_status(FileStatus::Valid)
    }

    pub fn missing(&self) -> impl Iterator<Item = &AuditEntry> {
        self.with_status(FileStatus::Missing)
    }

    pub fn corrupt(&self) -> impl Iterator<Item = &AuditEntry> {
        self.with_status(FileStatus::Corrupt)
    }

    fn with_status(&self, status: FileStatus) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.status == status)
    }

    /// Entries whose chunk and whole-file checksums disagreed.
    pub fn inconsistent(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(|e| e.inconsistency.is_some())
    }

    /// Total bytes still required.
    pub fn needed_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.needed_bytes).sum()
    }

    /// Verdicts taken from the cache.
    pub fn cache_hits(&self) -> usize {
        self.entries.iter().filter(|e| e.from_cache).count()
    }

    /// True if every file is valid.
    pub fn is_complete(&self) -> bool {
        self.unreadable.is_empty() && self.entries.iter().all(|e| e.status == FileStatus::Valid)
    }
}

/// Outcome of [`Synchronizer::fetch`](super::Synchronizer::fetch).
#[derive(Debug, Default)]
pub struct FetchSummary {
    /// The validation pass over the selection.
    pub audit: AuditReport,
    /// Items the confirmation callback declined.
    pub declined: Vec<u64>,
    /// The transfer run.
    pub run: RunReport,
}
