//! shelfsync - keep a local library of large game assets in sync
//!
//! This library validates a local file tree against a manifest of remote
//! files (installers and bonus content), works out exactly which byte ranges
//! are missing or corrupt, and fetches those ranges with a pool of workers.
//!
//! # Architecture
//!
//! ```text
//! Manifest + local files
//!         │
//!         ├── integrity   (needed ranges per file, drop flag)
//!         │
//!         ├── cache       (persisted ValidationRecords)
//!         │
//!         ├── scheduler   (WorkItems in priority order)
//!         │
//!         └── transfer    (worker pool, RunState, progress reporting)
//! ```
//!
//! [`sync::Synchronizer`] ties the pieces together for the `compare`,
//! `update` and `fetch` operations.

pub mod cache;
pub mod config;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod manifest;
pub mod paths;
pub mod scheduler;
pub mod sync;
pub mod transfer;

pub use error::{SyncError, SyncResult};

/// Library version, recorded in persisted files.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
