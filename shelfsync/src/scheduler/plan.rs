//! Expansion of validation records into an ordered set of transfers.

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use super::policy::{Priority, PriorityMode};
use super::queue::PriorityQueue;
use super::work::WorkItem;
use crate::integrity::{ByteRange, ValidationRecord};
use crate::manifest::{FileKind, RemoteFile};

/// A selected file together with its validation verdict and destination.
#[derive(Debug, Clone)]
pub struct PlannedFile<'a> {
    pub item_id: u64,
    pub kind: FileKind,
    pub file: &'a RemoteFile,
    pub record: &'a ValidationRecord,
    pub dest: PathBuf,
}

impl PlannedFile<'_> {
    /// True if the file needs preparation or transfers.
    pub fn has_work(&self) -> bool {
        !self.record.needed.is_empty() || self.record.drop || self.is_missing_empty_file()
    }

    fn is_missing_empty_file(&self) -> bool {
        self.file.size == 0 && !self.dest.exists()
    }
}

/// Expand `files`, in item order, into a priority queue of work items.
///
/// Chunked files get one work item per needed range per chunk, so a needed
/// range spanning several chunks is split at chunk boundaries. Non-chunked
/// files get one work item per needed range.
pub fn schedule(files: &[PlannedFile<'_>], mode: PriorityMode) -> PriorityQueue {
    let mut queue = PriorityQueue::new();
    let mut file_sequence = 0u64;

    for planned in files.iter().filter(|p| !p.record.needed.is_empty()) {
        let file = planned.file;
        let make = |range: ByteRange, priority: Priority| WorkItem {
            key: planned.record.key.clone(),
            url: file.url.clone(),
            range,
            dest: planned.dest.clone(),
            priority,
        };

        match file.chunk_table() {
            Some(chunks) => {
                let sequence = file_sequence;
                file_sequence += 1;

                for needed in &planned.record.needed {
                    for (index, chunk) in chunks.iter().enumerate() {
                        let start = needed.start.max(chunk.start);
                        let end = needed.end.min(chunk.end);
                        if start > end {
                            continue;
                        }
                        let value = match mode {
                            PriorityMode::Interleaved => index as u64,
                            PriorityMode::Sequential => sequence,
                        };
                        queue.push(make(ByteRange::new(start, end), Priority::chunk(value)));
                    }
                }
            }
            None => {
                for needed in &planned.record.needed {
                    queue.push(make(*needed, Priority::range(needed.end)));
                }
            }
        }
    }

    tracing::debug!(
        items = queue.len(),
        bytes = queue.total_bytes(),
        mode = %mode,
        "Scheduled transfers"
    );
    queue
}

/// Get the destination of `planned` ready for offset writes.
///
/// Deletes an oversized local copy, creates the destination directory, and
/// creates missing zero-length files (which never produce transfers).
pub fn prepare_destination(planned: &PlannedFile<'_>) -> io::Result<()> {
    let dest = &planned.dest;

    if planned.record.drop {
        match fs::remove_file(dest) {
            Ok(()) => {
                tracing::info!(path = %dest.display(), "Deleted oversized file before refetch");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    if planned.is_missing_empty_file() {
        File::create(dest)?;
    }

    Ok(())
}
