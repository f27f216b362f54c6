//! `config` subcommands.

use std::path::Path;

use clap::Subcommand;
use shelfsync::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values if none exists
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, path: &Path, config: &ConfigFile) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            run_show(config);
            Ok(())
        }
        ConfigCommands::Init => run_init(path),
    }
}

fn run_show(config: &ConfigFile) {
    println!("[paths]");
    println!("  download_dir = {}", config.paths.download_dir.display());
    println!("  manifest_file = {}", config.paths.manifest_file.display());
    println!("  cache_file = {}", config.paths.cache_file.display());
    println!();
    println!("[transfer]");
    println!("  workers = {}", config.transfer.workers);
    println!("  priority = {}", config.transfer.priority);
    println!("  timeout_secs = {}", config.transfer.timeout_secs);
    println!("  block_size = {}", config.transfer.block_size);
    println!("  report_interval_ms = {}", config.transfer.report_interval_ms);
    println!();
    println!("[logging]");
    println!("  level = {}", config.logging.level);
    match &config.logging.file {
        Some(file) => println!("  file = {}", file.display()),
        None => println!("  file = (not set)"),
    }

    if !config.overrides.is_empty() {
        println!();
        println!("[overrides]");
        for (key, dir) in &config.overrides {
            println!("  {} = {}", key, dir);
        }
    }
}

fn run_init(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        println!("Configuration already exists at {}", path.display());
        return Ok(());
    }
    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
