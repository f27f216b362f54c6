//! shelfsync CLI
//!
//! Validates a local game library against a manifest and fetches whatever is
//! missing or corrupt.

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use shelfsync::config::{config_file_path, ConfigFile};
use shelfsync::logging::{init_logging, LoggingConfig};

use commands::common::SyncArgs;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "shelfsync")]
#[command(version = shelfsync::VERSION)]
#[command(about = "Keep a local game library in sync with its manifest", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.shelfsync/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. debug or shelfsync=trace (overrides [logging] level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every file, ignoring cached results, and report
    Compare(SyncArgs),

    /// Validate, reusing cached results for unchanged files, and report
    Update(SyncArgs),

    /// Validate the selection and fetch missing or corrupt ranges
    Fetch(FetchArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let path = cli.config.unwrap_or_else(config_file_path);
    let config = ConfigFile::load_from(&path)?;

    if let Commands::Config { command } = cli.command {
        return commands::config::run(command, &path, &config);
    }

    let mut logging = LoggingConfig::from(&config.logging);
    if let Some(level) = cli.log_level {
        logging.level = level;
    }
    let _guard = init_logging(&logging)?;

    match cli.command {
        Commands::Compare(args) => commands::compare::run_compare(args, &config),
        Commands::Update(args) => commands::compare::run_update(args, &config),
        Commands::Fetch(args) => commands::fetch::run(args, &config),
        Commands::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "shelfsync",
            "fetch",
            "--id",
            "3",
            "--id",
            "5",
            "--skip-extras",
            "--priority",
            "sequential",
            "-w",
            "8",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.ids, vec![3, 5]);
                assert!(args.skip_extras);
                assert_eq!(args.workers, Some(8));
                assert_eq!(args.priority, Some(commands::common::PriorityArg::Sequential));
            }
            _ => panic!("expected fetch"),
        }
    }
}
