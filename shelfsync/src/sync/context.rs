//! Collaborators and settings for one run.

use std::fmt;
use std::sync::Arc;

use crate::config::SyncConfig;
use crate::paths::{DefaultPathResolver, PathResolver};
use crate::transfer::{RangeFetcher, TransferPool};

/// Everything a [`Synchronizer`](super::Synchronizer) needs from outside.
#[derive(Clone)]
pub struct SyncContext {
    pub fetcher: Arc<dyn RangeFetcher>,
    pub resolver: Arc<dyn PathResolver>,
    pub config: SyncConfig,
}

impl SyncContext {
    pub fn new(
        fetcher: Arc<dyn RangeFetcher>,
        resolver: Arc<dyn PathResolver>,
        config: SyncConfig,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            config,
        }
    }

    /// Context using the default path layout under `config.download_dir`.
    pub fn with_default_paths(fetcher: Arc<dyn RangeFetcher>, config: SyncConfig) -> Self {
        let resolver = DefaultPathResolver::new(&config.download_dir)
            .with_overrides(config.overrides.clone());
        Self::new(fetcher, Arc::new(resolver), config)
    }

    /// Worker pool configured from the settings.
    pub fn transfer_pool(&self) -> TransferPool {
        TransferPool::new(self.config.workers)
            .with_block_size(self.config.block_size)
            .with_report_interval(self.config.report_interval)
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
