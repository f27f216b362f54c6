//! Progress and error reporting for transfer runs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::error::TransferError;
use super::state::PathProgress;
use crate::scheduler::WorkItem;

/// Receives periodic progress and the final error summary of a run.
pub trait Reporter: Send + Sync {
    /// Called at every report interval with the paths still in flight.
    fn progress(&self, snapshot: &[PathProgress]);

    /// Called once at the end of a run or on interruption, with failures
    /// grouped by destination path. The map is empty for a clean run.
    fn errors(&self, errors: &BTreeMap<PathBuf, Vec<TransferError>>);
}

/// Reporter that writes to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn progress(&self, snapshot: &[PathProgress]) {
        for line in snapshot {
            tracing::info!(
                path = %line.path.display(),
                remaining = %format_size(line.remaining),
                rate = %format_rate(line.bytes_per_sec),
                workers = line.workers,
                "Transfer progress"
            );
        }
    }

    fn errors(&self, errors: &BTreeMap<PathBuf, Vec<TransferError>>) {
        tracing::info!(paths = errors.len(), "Paths with errors");
        for (path, failures) in errors {
            for error in failures {
                tracing::error!(path = %path.display(), error = %error, "Transfer error");
            }
        }
    }
}

/// Outcome of a transfer run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Work items finished without error.
    pub completed: usize,
    /// Failures grouped by destination path.
    pub errors: BTreeMap<PathBuf, Vec<TransferError>>,
    /// Items left in the queue after every worker stopped.
    pub abandoned: Vec<WorkItem>,
    /// The run was cancelled before the queue drained.
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// True if every scheduled item was transferred.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.abandoned.is_empty() && !self.interrupted
    }
}

/// Format a size in bytes as a human-readable string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format a transfer rate.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_size(bytes_per_sec.max(0.0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::ByteRange;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(2048.0), "2.00 KB/s");
        assert_eq!(format_rate(0.0), "0 bytes/s");
    }

    #[test]
    fn test_run_report_clean() {
        let mut report = RunReport::default();
        assert!(report.is_clean());

        report.errors.insert(
            PathBuf::from("/lib/a"),
            vec![TransferError::Status {
                url: "u".to_string(),
                range: ByteRange::new(0, 1),
                status: 500,
            }],
        );
        assert_eq!(report.error_count(), 1);
        assert!(!report.is_clean());
    }
}
