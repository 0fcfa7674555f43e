//! Status command implementation

use std::collections::BTreeSet;
use std::path::Path;

use colored::{ColoredString, Colorize};

use replica_core::SyncPlan;

use crate::context::ReplicaContext;
use crate::error::Result;

/// Run the status command
///
/// Plans a pass with the configured strategy and prints what it would do.
pub async fn run_status(path: &Path, json: bool) -> Result<()> {
    let ctx = ReplicaContext::discover(path)?;
    let plan = ctx.reconciler()?.plan().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "{} Replica {} against {} ({})",
        "=>".blue().bold(),
        ctx.root.as_str().cyan(),
        ctx.config.branch.cyan(),
        ctx.config.strategy
    );
    print_plan(&plan);
    Ok(())
}

fn print_section(title: ColoredString, marker: ColoredString, paths: &BTreeSet<String>) {
    if paths.is_empty() {
        return;
    }
    println!("{title}");
    for path in paths {
        println!("   {marker} {path}");
    }
}

/// Print the resolution grouped by action.
pub fn print_plan(plan: &SyncPlan) {
    match &plan.base {
        Some(base) => println!("   Last synced at {}", base.dimmed()),
        None => println!("   {}", "Never synced".dimmed()),
    }
    println!("   Remote head {}", plan.head.dimmed());

    if plan.in_sync() {
        println!("{} Already in sync. No changes needed.", "OK".green().bold());
        return;
    }

    let r = &plan.resolution;
    print_section("Download:".green().bold(), "+".green(), &r.downloads);
    print_section("Upload:".blue().bold(), "^".blue(), &r.uploads);
    print_section("Remove locally:".yellow().bold(), "-".yellow(), &r.removes);
    print_section("Conflicts:".red().bold(), "!".red(), &r.conflicts);
    print_section("Too large:".dimmed(), "~".dimmed(), &r.oversized);
}
