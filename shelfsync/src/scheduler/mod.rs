//! Transfer scheduling.
//!
//! Turns the needed ranges of selected files into [`WorkItem`]s ordered by
//! a [`Priority`] key:
//!
//! - `policy`: [`PriorityMode`] and the priority key
//! - `queue`: min-priority queue with FIFO tie-break, and the shared [`WorkQueue`]
//! - `plan`: [`schedule`] and destination preparation

mod plan;
mod policy;
mod queue;
mod work;

pub use plan::{prepare_destination, schedule, PlannedFile};
pub use policy::{Priority, PriorityMode, Tier};
pub use queue::{PriorityQueue, WorkQueue};
pub use work::WorkItem;
