//! Console output for audits and transfer runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use console::style;
use shelfsync::integrity::FileStatus;
use shelfsync::sync::AuditReport;
use shelfsync::transfer::{format_rate, format_size, PathProgress, Reporter, RunReport, TransferError};

/// Prints progress lines and the end-of-run error summary to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn progress(&self, snapshot: &[PathProgress]) {
        for line in snapshot {
            println!(
                "  {} {} left, {} ({} worker{})",
                style(line.path.display()).dim(),
                format_size(line.remaining),
                style(format_rate(line.bytes_per_sec)).cyan(),
                line.workers,
                if line.workers == 1 { "" } else { "s" }
            );
        }
    }

    fn errors(&self, errors: &BTreeMap<PathBuf, Vec<TransferError>>) {
        let summary = format!("{} path(s) had errors", errors.len());
        println!();
        if errors.is_empty() {
            println!("{}", style(summary).green());
            return;
        }
        println!("{}", style(format!("{}:", summary)).red().bold());
        for (path, failures) in errors {
            println!("  {}", path.display());
            for error in failures {
                println!("    - {}", error);
            }
        }
    }
}

/// Print a validation pass.
pub fn print_audit(report: &AuditReport, verbose: bool) {
    for entry in &report.entries {
        let label = match entry.status {
            FileStatus::Valid if !verbose => continue,
            FileStatus::Valid => style("OK     ").green(),
            FileStatus::Missing => style("MISSING").yellow(),
            FileStatus::Corrupt => style("CORRUPT").red(),
        };
        if entry.needed_bytes > 0 {
            println!(
                "{} {} ({} needed)",
                label,
                entry.path.display(),
                format_size(entry.needed_bytes)
            );
        } else {
            println!("{} {}", label, entry.path.display());
        }
    }

    for entry in report.inconsistent() {
        println!(
            "{} {}: chunk and whole-file checksums disagree",
            style("WARNING").yellow(),
            entry.path.display()
        );
    }
    for (key, reason) in &report.unreadable {
        println!("{} {}: {}", style("ERROR  ").red(), key, reason);
    }

    println!();
    println!(
        "{} valid, {} missing, {} corrupt ({} to fetch)",
        report.valid().count(),
        report.missing().count(),
        report.corrupt().count(),
        format_size(report.needed_bytes())
    );
    if report.unnamed > 0 {
        println!("{} file(s) skipped: name unknown", report.unnamed);
    }
}

/// Print the outcome of a transfer run.
pub fn print_run(report: &RunReport) {
    println!();
    println!(
        "Transferred {} range(s) in {:.1}s",
        report.completed,
        report.elapsed.as_secs_f64()
    );
    if !report.abandoned.is_empty() {
        println!(
            "{}",
            style(format!(
                "{} range(s) abandoned: every worker stopped on a server protocol violation",
                report.abandoned.len()
            ))
            .red()
        );
    }
}
