//! `fetch`: validate, then transfer what is missing or corrupt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Args;
use console::style;
use dialoguer::Confirm;
use shelfsync::config::ConfigFile;
use shelfsync::manifest::Item;
use shelfsync::sync::Selection;
use shelfsync::transfer::format_size;

use super::common::{self, PriorityArg, SyncArgs};
use crate::error::CliError;
use crate::output::{print_audit, print_run, ConsoleReporter};

/// Arguments for `fetch`.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Only fetch these item ids (repeatable)
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<u64>,

    /// Skip installer files
    #[arg(long)]
    pub skip_setups: bool,

    /// Skip bonus files
    #[arg(long)]
    pub skip_extras: bool,

    /// Ask before fetching each item
    #[arg(long)]
    pub confirm: bool,

    /// Number of concurrent transfers (default: [transfer] workers)
    #[arg(long, short)]
    pub workers: Option<usize>,

    /// Transfer ordering (default: [transfer] priority)
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,
}

impl FetchArgs {
    fn selection(&self) -> Selection {
        let mut selection = Selection::all();
        if !self.ids.is_empty() {
            selection = selection.with_ids(self.ids.iter().copied());
        }
        selection.skip_setups = self.skip_setups;
        selection.skip_extras = self.skip_extras;
        selection
    }
}

/// Run `fetch`.
pub fn run(args: FetchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let mut sync_config = common::sync_config(&args.sync, config);
    if let Some(workers) = args.workers {
        sync_config = sync_config.with_workers(workers);
    }
    if let Some(priority) = args.priority {
        sync_config = sync_config.with_priority_mode(priority.into());
    }

    let (mut sync, manifest) = common::open(&args.sync, config, sync_config)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        println!();
        println!("Received interrupt, stopping...");
        cancel_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let ask = args.confirm;
    let mut confirm = |item: &Item, bytes: u64| -> bool {
        if !ask {
            return true;
        }
        let prompt = format!("Fetch {} ({})?", item.title, format_size(bytes));
        match Confirm::new().with_prompt(prompt).default(true).interact() {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(item = item.id, error = %e, "Confirmation prompt failed");
                false
            }
        }
    };

    let summary = sync.fetch(
        &manifest,
        &args.selection(),
        &mut confirm,
        &ConsoleReporter,
        &cancel,
    )?;

    print_audit(&summary.audit, args.sync.verbose);
    if !summary.declined.is_empty() {
        println!("{} item(s) skipped", summary.declined.len());
    }
    print_run(&summary.run);

    let failed = summary.run.error_count();
    let abandoned = summary.run.abandoned.len();
    if failed > 0 || abandoned > 0 {
        return Err(CliError::Incomplete { failed, abandoned });
    }

    println!("{}", style("Done.").green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfsync::manifest::FileKind;

    fn args() -> FetchArgs {
        FetchArgs {
            sync: SyncArgs {
                manifest: None,
                download_dir: None,
                cache_file: None,
                verbose: false,
            },
            ids: Vec::new(),
            skip_setups: false,
            skip_extras: true,
            confirm: false,
            workers: None,
            priority: None,
        }
    }

    #[test]
    fn test_selection_from_args() {
        let selection = args().selection();
        assert!(selection.includes_item(99));
        assert!(!selection.includes_kind(FileKind::Extra));

        let mut with_ids = args();
        with_ids.ids = vec![1, 2];
        let selection = with_ids.selection();
        assert!(selection.includes_item(2));
        assert!(!selection.includes_item(3));
    }
}
