//! Worker pool and the reporting loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::fetch::RangeFetcher;
use super::progress::{Reporter, RunReport};
use super::state::{RunState, SharedRunState};
use super::worker::{Worker, WorkerExit, WorkerSummary, DEFAULT_BLOCK_SIZE};
use crate::scheduler::{PriorityQueue, WorkQueue};

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default interval between progress reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs a fixed number of workers over one queue.
#[derive(Debug, Clone)]
pub struct TransferPool {
    /// Number of worker threads (minimum 1).
    pub workers: usize,
    pub block_size: usize,
    pub report_interval: Duration,
}

impl TransferPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            block_size: DEFAULT_BLOCK_SIZE,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Transfer everything in `queue`.
    ///
    /// The calling thread runs the reporting loop until every worker has
    /// stopped or `cancel` is set. The error summary is handed to `reporter`
    /// in both cases. On cancellation the workers are left running and the
    /// returned report has `interrupted` set.
    pub fn run(
        &self,
        queue: PriorityQueue,
        fetcher: Arc<dyn RangeFetcher>,
        reporter: &dyn Reporter,
        cancel: &AtomicBool,
    ) -> RunReport {
        let started = Instant::now();
        let scheduled = queue.len();
        let state: SharedRunState = Arc::new(Mutex::new(RunState::for_queue(&queue)));
        let queue = Arc::new(WorkQueue::from(queue));

        tracing::info!(
            items = scheduled,
            workers = self.workers,
            "Starting transfers"
        );

        let handles: Vec<JoinHandle<WorkerSummary>> = (0..self.workers)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    Arc::clone(&queue),
                    Arc::clone(&fetcher),
                    Arc::clone(&state),
                    self.block_size,
                );
                thread::spawn(move || worker.run())
            })
            .collect();

        let mut last_report = Instant::now();
        let mut interrupted = false;

        while !handles.iter().all(JoinHandle::is_finished) {
            if cancel.load(Ordering::SeqCst) {
                interrupted = true;
                break;
            }

            thread::sleep(POLL_INTERVAL.min(self.report_interval));

            if last_report.elapsed() >= self.report_interval {
                let snapshot = state.lock().take_snapshot();
                if !snapshot.is_empty() {
                    reporter.progress(&snapshot);
                }
                last_report = Instant::now();
            }
        }

        let mut report = RunReport {
            interrupted,
            ..RunReport::default()
        };

        if interrupted {
            tracing::warn!(pending = queue.len(), "Transfers interrupted");
        } else {
            let mut stopped = 0;
            for handle in handles {
                match handle.join() {
                    Ok(summary) if summary.exit == WorkerExit::Stopped => stopped += 1,
                    Ok(_) => {}
                    Err(_) => {
                        tracing::error!("Transfer worker panicked");
                        stopped += 1;
                    }
                }
            }

            report.abandoned = queue.drain();
            if !report.abandoned.is_empty() {
                tracing::error!(
                    workers = stopped,
                    abandoned = report.abandoned.len(),
                    "All workers stopped with work remaining"
                );
            }
        }

        {
            let mut state = state.lock();
            report.completed = state.completed();
            report.errors = state.take_errors();
        }
        report.elapsed = started.elapsed();

        reporter.errors(&report.errors);

        tracing::info!(
            completed = report.completed,
            failed = report.error_count(),
            abandoned = report.abandoned.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Transfers finished"
        );

        report
    }
}

impl Default for TransferPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}
