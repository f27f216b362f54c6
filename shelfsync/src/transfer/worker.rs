//! Transfer workers.
//!
//! A worker repeatedly takes the highest-priority item from the shared
//! queue, fetches exactly that byte range and writes it at the same offset
//! in the destination file. Files are opened without truncation so several
//! workers can fill disjoint ranges of one file concurrently.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::error::{TransferError, TransferResult};
use super::fetch::RangeFetcher;
use super::state::SharedRunState;
use crate::scheduler::{WorkItem, WorkQueue};

/// Default size of one read/write block.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Why a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The queue was empty.
    Drained,
    /// The server violated the range protocol; the worker gave up.
    Stopped,
}

/// Outcome of one worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub id: usize,
    pub completed: usize,
    pub failed: usize,
    pub exit: WorkerExit,
}

/// A single transfer worker.
pub struct Worker {
    id: usize,
    queue: Arc<WorkQueue>,
    fetcher: Arc<dyn RangeFetcher>,
    state: SharedRunState,
    block_size: usize,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<WorkQueue>,
        fetcher: Arc<dyn RangeFetcher>,
        state: SharedRunState,
        block_size: usize,
    ) -> Self {
        Self {
            id,
            queue,
            fetcher,
            state,
            block_size: block_size.max(1),
        }
    }

    /// Process items until the queue is empty or a protocol violation.
    pub fn run(self) -> WorkerSummary {
        let mut summary = WorkerSummary {
            id: self.id,
            completed: 0,
            failed: 0,
            exit: WorkerExit::Drained,
        };

        while let Some(item) = self.queue.pop() {
            let mut written = 0u64;
            match self.transfer(&item, &mut written) {
                Ok(()) => {
                    summary.completed += 1;
                    self.state.lock().record_completed();
                    tracing::debug!(
                        worker = self.id,
                        path = %item.dest.display(),
                        range = %item.range,
                        "Range transferred"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    let fatal = e.is_fatal_to_worker();
                    if fatal {
                        tracing::error!(
                            worker = self.id,
                            path = %item.dest.display(),
                            error = %e,
                            "Protocol violation, stopping worker"
                        );
                    } else {
                        tracing::warn!(
                            worker = self.id,
                            path = %item.dest.display(),
                            error = %e,
                            "Transfer failed"
                        );
                    }

                    let mut state = self.state.lock();
                    state.settle(&item.dest, item.range.len().saturating_sub(written));
                    state.record_error(&item.dest, e);
                    drop(state);

                    if fatal {
                        summary.exit = WorkerExit::Stopped;
                        break;
                    }
                }
            }
        }

        summary
    }

    fn transfer(&self, item: &WorkItem, written: &mut u64) -> TransferResult<()> {
        let file = open_destination(&item.dest)?;
        let mut writer = BufWriter::with_capacity(self.block_size, file);
        writer
            .seek(SeekFrom::Start(item.range.start))
            .map_err(|e| write_error(&item.dest, e))?;

        let mut response = self.fetcher.fetch(&item.url, Some(item.range))?;

        if !response.is_success() {
            return Err(TransferError::Status {
                url: item.url.clone(),
                range: item.range,
                status: response.status,
            });
        }

        match response.content_range {
            Some(served) if served.range == item.range => {}
            Some(served) => {
                return Err(violation(item, format!("server sent {}", served)));
            }
            None => {
                return Err(violation(item, "response has no Content-Range".to_string()));
            }
        }
        if let Some(length) = response.content_length {
            if length != item.range.len() {
                return Err(violation(item, format!("announced {} bytes", length)));
            }
        }

        let mut buffer = vec![0u8; self.block_size];
        let mut remaining = item.range.len();

        while remaining > 0 {
            let started = Instant::now();
            let want = remaining.min(buffer.len() as u64) as usize;
            let n = match response.body.read(&mut buffer[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(TransferError::Read {
                        url: item.url.clone(),
                        range: item.range,
                        source: e,
                    })
                }
            };

            writer
                .write_all(&buffer[..n])
                .map_err(|e| write_error(&item.dest, e))?;

            remaining -= n as u64;
            *written += n as u64;
            self.state
                .lock()
                .record_block(&item.dest, self.id, n as u64, started.elapsed());
        }

        let position = writer
            .stream_position()
            .map_err(|e| write_error(&item.dest, e))?;
        writer.flush().map_err(|e| write_error(&item.dest, e))?;

        if position != item.range.end + 1 {
            return Err(violation(
                item,
                format!(
                    "body ended at offset {}, expected {}",
                    position,
                    item.range.end + 1
                ),
            ));
        }

        let mut probe = [0u8; 1];
        if matches!(response.body.read(&mut probe), Ok(n) if n > 0) {
            return Err(violation(item, "body longer than requested".to_string()));
        }

        Ok(())
    }
}

/// Open `path` for offset writes without truncating it.
fn open_destination(path: &Path) -> TransferResult<File> {
    if path.is_dir() {
        return Err(TransferError::StaleInput {
            path: path.to_path_buf(),
            reason: "destination is a directory".to_string(),
        });
    }

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TransferError::StaleInput {
                path: path.to_path_buf(),
                reason: "destination directory is missing".to_string(),
            },
            _ => write_error(path, e),
        })
}

fn write_error(path: &Path, source: io::Error) -> TransferError {
    TransferError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn violation(item: &WorkItem, detail: String) -> TransferError {
    TransferError::ProtocolViolation {
        url: item.url.clone(),
        requested: item.range,
        detail,
    }
}
