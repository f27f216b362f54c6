//! Priority queue for transfer scheduling.
//!
//! Work items are ordered by priority (lower values first), then by enqueue
//! order (FIFO within the same priority). The FIFO tie-break keeps the chunks
//! of one file together in sequential mode.
//!
//! # Example
//!
//! ```ignore
//! use shelfsync::scheduler::{PriorityQueue, Priority};
//!
//! let mut queue = PriorityQueue::new();
//! queue.push(extra_item);      // Priority::range(999)
//! queue.push(setup_chunk);     // Priority::chunk(0)
//!
//! // The chunk comes out first despite being pushed second
//! assert_eq!(queue.pop().unwrap().priority, Priority::chunk(0));
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use parking_lot::Mutex;

use super::work::WorkItem;

// =============================================================================
// Queued Item
// =============================================================================

/// A work item waiting in the queue, with its insertion sequence.
#[derive(Debug)]
struct QueuedItem {
    item: WorkItem,
    sequence: u64,
}

// Ordering for BinaryHeap: lower priority value first, then lower sequence first
impl PartialEq for QueuedItem {
    fn eq(&self, other: &Self) -> bool {
        self.item.priority == other.item.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedItem {}

impl PartialOrd for QueuedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so both keys are reversed.
        other
            .item
            .priority
            .cmp(&self.item.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

// =============================================================================
// Priority Queue
// =============================================================================

/// Min-priority queue of work items with FIFO tie-break.
///
/// Not thread-safe; [`WorkQueue`] wraps it in a mutex.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<QueuedItem>,
    next_sequence: u64,
}

impl PriorityQueue {
    /// Creates a new empty priority queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item to the queue.
    pub fn push(&mut self, item: WorkItem) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(QueuedItem { item, sequence });
    }

    /// Removes and returns the item with the lowest priority value.
    pub fn pop(&mut self) -> Option<WorkItem> {
        self.heap.pop().map(|q| q.item)
    }

    /// Returns the next item without removing it.
    pub fn peek(&self) -> Option<&WorkItem> {
        self.heap.peek().map(|q| &q.item)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Total bytes across all queued items.
    pub fn total_bytes(&self) -> u64 {
        self.heap.iter().map(|q| q.item.range.len()).sum()
    }

    /// Items in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
        self.heap.iter().map(|q| &q.item)
    }

    /// Consume the queue, returning items in dequeue order.
    pub fn into_ordered(mut self) -> Vec<WorkItem> {
        let mut items = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.pop() {
            items.push(item);
        }
        items
    }
}

// =============================================================================
// Work Queue
// =============================================================================

/// Thread-safe queue shared by the worker pool.
#[derive(Debug, Default)]
pub struct WorkQueue {
    inner: Mutex<PriorityQueue>,
}

impl WorkQueue {
    pub fn new(queue: PriorityQueue) -> Self {
        Self {
            inner: Mutex::new(queue),
        }
    }

    /// Take the next item. Returns `None` immediately once drained.
    pub fn pop(&self) -> Option<WorkItem> {
        self.inner.lock().pop()
    }

    pub fn push(&self, item: WorkItem) {
        self.inner.lock().push(item);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Remove everything still queued.
    pub fn drain(&self) -> Vec<WorkItem> {
        std::mem::take(&mut *self.inner.lock()).into_ordered()
    }
}

impl From<PriorityQueue> for WorkQueue {
    fn from(queue: PriorityQueue) -> Self {
        Self::new(queue)
    }
}
