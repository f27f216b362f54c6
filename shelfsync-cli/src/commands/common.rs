//! Arguments and setup shared by compare, update and fetch.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use shelfsync::config::{ConfigFile, SyncConfig};
use shelfsync::manifest::Manifest;
use shelfsync::scheduler::PriorityMode;
use shelfsync::sync::{SyncContext, Synchronizer};
use shelfsync::transfer::HttpFetcher;

use crate::error::CliError;

/// Paths used by every synchronization command.
#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// Manifest file (default: [paths] manifest_file in config.ini)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Library root (default: [paths] download_dir in config.ini)
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Validation cache file (default: [paths] cache_file in config.ini)
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Also list files that are already valid
    #[arg(long, short)]
    pub verbose: bool,
}

/// Transfer ordering selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PriorityArg {
    /// Round-robin over the chunks of all selected files
    Interleaved,
    /// Finish each file before starting the next
    Sequential,
}

impl From<PriorityArg> for PriorityMode {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Interleaved => PriorityMode::Interleaved,
            PriorityArg::Sequential => PriorityMode::Sequential,
        }
    }
}

/// Runtime configuration from config.ini with command line paths applied.
pub fn sync_config(args: &SyncArgs, config: &ConfigFile) -> SyncConfig {
    let mut sync = SyncConfig::from_file(config);
    if let Some(dir) = &args.download_dir {
        sync.download_dir = dir.clone();
    }
    if let Some(file) = &args.cache_file {
        sync.cache_file = file.clone();
    }
    sync
}

/// Load the manifest and open the synchronizer.
///
/// Files listed without a name get one from their download link first.
pub fn open(
    args: &SyncArgs,
    config: &ConfigFile,
    sync_config: SyncConfig,
) -> Result<(Synchronizer, Manifest), CliError> {
    let manifest_path = args
        .manifest
        .clone()
        .unwrap_or_else(|| config.paths.manifest_file.clone());
    if !manifest_path.exists() {
        return Err(CliError::Config(format!(
            "Manifest not found at {}. Use --manifest or set manifest_file in config.ini [paths] section.",
            manifest_path.display()
        )));
    }

    let mut manifest = Manifest::load(&manifest_path)?;
    tracing::info!(
        path = %manifest_path.display(),
        items = manifest.items.len(),
        "Loaded manifest"
    );

    let fetcher = HttpFetcher::with_timeout(sync_config.timeout)?;
    let ctx = SyncContext::with_default_paths(Arc::new(fetcher), sync_config);
    let synchronizer = Synchronizer::open(ctx)?;

    let unnamed = manifest
        .items
        .iter()
        .flat_map(|i| i.files())
        .filter(|(_, f)| f.name.is_empty())
        .count();
    if unnamed > 0 {
        println!("Resolving {} file name(s)...", unnamed);
        synchronizer.resolve_names(&mut manifest)?;
    }

    Ok((synchronizer, manifest))
}
