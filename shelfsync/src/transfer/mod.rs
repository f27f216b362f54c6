//! Range transfers.
//!
//! A fixed pool of worker threads drains a shared [`WorkQueue`](crate::scheduler::WorkQueue),
//! fetching one byte range per item through a [`RangeFetcher`] and writing
//! it at its offset in the destination. The calling thread reports progress
//! and errors through a [`Reporter`].
//!
//! Failures fall into three classes ([`FaultKind`]): stale input and
//! transfer faults are recorded and the worker moves on; a protocol
//! violation (the server did not serve exactly the requested range) stops
//! the worker that saw it.

mod error;
mod fetch;
mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
mod pool;
mod progress;
mod state;
mod worker;

pub use error::{FaultKind, FetchError, FetchResult, TransferError, TransferResult};
pub use fetch::{file_name_from_url, parse_content_range, ContentRange, FetchResponse, RangeFetcher};
pub use http::{HttpFetcher, DEFAULT_TIMEOUT_SECS};
pub use pool::{TransferPool, DEFAULT_REPORT_INTERVAL, DEFAULT_WORKERS};
pub use progress::{format_rate, format_size, LogReporter, Reporter, RunReport};
pub use state::{PathProgress, RunState, SharedRunState, ThroughputSample};
pub use worker::{Worker, WorkerExit, WorkerSummary, DEFAULT_BLOCK_SIZE};
