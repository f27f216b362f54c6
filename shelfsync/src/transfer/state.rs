//! Shared state of a transfer run.
//!
//! Workers record every block they write and every failure; the reporting
//! loop takes periodic snapshots. All access goes through one mutex.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::error::TransferError;
use crate::scheduler::PriorityQueue;

/// Run state shared between workers and the reporter.
pub type SharedRunState = Arc<Mutex<RunState>>;

/// One block written by one worker.
#[derive(Debug, Clone, Copy)]
pub struct ThroughputSample {
    pub worker: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Progress line for one destination path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathProgress {
    pub path: PathBuf,
    /// Bytes still to be written.
    pub remaining: u64,
    /// Sum over workers of bytes written divided by time spent since the
    /// previous snapshot.
    pub bytes_per_sec: f64,
    /// Distinct workers that wrote to this path since the previous snapshot.
    pub workers: usize,
}

/// Mutable state of a transfer run.
#[derive(Debug, Default)]
pub struct RunState {
    remaining: BTreeMap<PathBuf, u64>,
    samples: HashMap<PathBuf, Vec<ThroughputSample>>,
    errors: BTreeMap<PathBuf, Vec<TransferError>>,
    completed: usize,
}

impl RunState {
    /// Initialise remaining bytes from the work in `queue`.
    pub fn for_queue(queue: &PriorityQueue) -> Self {
        let mut remaining: BTreeMap<PathBuf, u64> = BTreeMap::new();
        for item in queue.iter() {
            *remaining.entry(item.dest.clone()).or_default() += item.range.len();
        }
        Self {
            remaining,
            ..Self::default()
        }
    }

    /// Record a block written to `path`.
    pub fn record_block(&mut self, path: &Path, worker: usize, bytes: u64, elapsed: Duration) {
        self.settle(path, bytes);
        self.samples
            .entry(path.to_path_buf())
            .or_default()
            .push(ThroughputSample {
                worker,
                bytes,
                elapsed,
            });
    }

    /// Write off `bytes` of `path` that will not be transferred in this run.
    pub fn settle(&mut self, path: &Path, bytes: u64) {
        if let Some(left) = self.remaining.get_mut(path) {
            *left = left.saturating_sub(bytes);
        }
    }

    /// Record a work item that finished without error.
    pub fn record_completed(&mut self) {
        self.completed += 1;
    }

    /// Work items finished without error.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Record a failed work item for `path`.
    pub fn record_error(&mut self, path: &Path, error: TransferError) {
        self.errors.entry(path.to_path_buf()).or_default().push(error);
    }

    /// Bytes still to be written to `path`.
    pub fn remaining(&self, path: &Path) -> u64 {
        self.remaining.get(path).copied().unwrap_or(0)
    }

    /// Bytes still to be written across all paths.
    pub fn total_remaining(&self) -> u64 {
        self.remaining.values().sum()
    }

    /// Number of failures recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Progress for every path with bytes remaining, sorted by path.
    ///
    /// Throughput samples are cleared, so each snapshot covers only the
    /// interval since the previous one.
    pub fn take_snapshot(&mut self) -> Vec<PathProgress> {
        let samples = std::mem::take(&mut self.samples);

        self.remaining
            .iter()
            .filter(|(_, left)| **left > 0)
            .map(|(path, left)| {
                let (bytes_per_sec, workers) = samples
                    .get(path)
                    .map(|s| throughput(s))
                    .unwrap_or((0.0, 0));
                PathProgress {
                    path: path.clone(),
                    remaining: *left,
                    bytes_per_sec,
                    workers,
                }
            })
            .collect()
    }

    /// Take all recorded errors, grouped by path.
    pub fn take_errors(&mut self) -> BTreeMap<PathBuf, Vec<TransferError>> {
        std::mem::take(&mut self.errors)
    }
}

fn throughput(samples: &[ThroughputSample]) -> (f64, usize) {
    let mut per_worker: BTreeMap<usize, (u64, Duration)> = BTreeMap::new();
    for sample in samples {
        let entry = per_worker.entry(sample.worker).or_default();
        entry.0 += sample.bytes;
        entry.1 += sample.elapsed;
    }

    let rate = per_worker
        .values()
        .filter(|(_, elapsed)| !elapsed.is_zero())
        .map(|(bytes, elapsed)| *bytes as f64 / elapsed.as_secs_f64())
        .sum();

    let workers: BTreeSet<usize> = samples.iter().map(|s| s.worker).collect();
    (rate, workers.len())
}
