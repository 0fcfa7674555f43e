//! Sync command implementation

use std::path::Path;

use colored::Colorize;

use replica_core::{SyncOutcome, SyncReport};

use crate::commands::status::print_plan;
use crate::context::ReplicaContext;
use crate::error::Result;

/// Run the sync command
///
/// With `dry_run` the pass is only planned and printed.
pub async fn run_sync(path: &Path, strategy: Option<&str>, dry_run: bool, json: bool) -> Result<()> {
    let ctx = ReplicaContext::discover(path)?.with_strategy(strategy)?;
    let reconciler = ctx.reconciler()?;

    if dry_run {
        let plan = reconciler.plan().await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            println!(
                "{} Dry run ({}), nothing will be changed:",
                "=>".blue().bold(),
                ctx.config.strategy
            );
            print_plan(&plan);
        }
        return Ok(());
    }

    if !json {
        println!(
            "{} Synchronizing with {} ({})...",
            "=>".blue().bold(),
            ctx.config.branch.cyan(),
            ctx.config.strategy
        );
    }

    let report = reconciler.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    match report.outcome {
        SyncOutcome::Skipped => {
            println!("{} Another sync is running; skipped.", "SKIPPED".yellow().bold());
            return;
        }
        _ if report.is_noop() && report.failures.is_empty() => {
            println!("{} Already in sync. No changes needed.", "OK".green().bold());
        }
        SyncOutcome::Completed => {
            println!("{} Synchronization complete:", "OK".green().bold());
        }
        SyncOutcome::Partial => {
            println!("{} Synchronization partially applied:", "PARTIAL".yellow().bold());
        }
    }

    let counts = [
        ("downloaded", report.downloaded),
        ("uploaded", report.uploaded),
        ("removed locally", report.removed_local),
        ("removed remotely", report.removed_remote),
        ("merged", report.merged),
        ("kept side by side", report.conflicted),
        ("skipped for size", report.oversized),
    ];
    for (label, count) in counts.into_iter().filter(|(_, n)| *n > 0) {
        println!("   {} {count} {label}", "+".green());
    }
    for failure in &report.failures {
        println!("   {} {}: {}", "!".red(), failure.path.cyan(), failure.message);
    }
    if let Some(commit) = &report.new_commit {
        println!("   Commit {}", commit.dimmed());
    }
}
