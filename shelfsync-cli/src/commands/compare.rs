//! `compare` and `update`: validation passes without transfers.

use shelfsync::config::ConfigFile;

use super::common::{self, SyncArgs};
use crate::error::CliError;
use crate::output::print_audit;

/// Full pass, ignoring cached verdicts.
pub fn run_compare(args: SyncArgs, config: &ConfigFile) -> Result<(), CliError> {
    let (mut sync, manifest) = common::open(&args, config, common::sync_config(&args, config))?;
    let report = sync.compare(&manifest)?;
    print_audit(&report, args.verbose);
    Ok(())
}

/// Incremental pass, reusing cached verdicts for unchanged files.
pub fn run_update(args: SyncArgs, config: &ConfigFile) -> Result<(), CliError> {
    let (mut sync, manifest) = common::open(&args, config, common::sync_config(&args, config))?;
    let report = sync.update(&manifest)?;
    print_audit(&report, args.verbose);
    println!("{} verdict(s) reused from cache", report.cache_hits());
    Ok(())
}
