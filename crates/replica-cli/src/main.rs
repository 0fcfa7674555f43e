//! Replica Sync CLI
//!
//! Reconciles a local directory with a git remote from the command line.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: failed to initialize logging: {}", "warning".yellow().bold(), e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Some(cmd) => execute_command(&cli.root, cmd).await,
        None => {
            println!("{} Replica Sync CLI", "replica".green().bold());
            println!();
            println!("Run {} for available commands.", "replica --help".cyan());
            Ok(())
        }
    }
}

async fn execute_command(root: &std::path::Path, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init {
            remote,
            branch,
            strategy,
        } => commands::run_init(root, &remote, &branch, strategy.as_deref()),
        Commands::Status { json } => commands::run_status(root, json).await,
        Commands::Sync {
            strategy,
            dry_run,
            json,
        } => commands::run_sync(root, strategy.as_deref(), dry_run, json).await,
        Commands::Merge {
            ancestor,
            ours,
            theirs,
            lines,
            output,
        } => commands::run_merge(&ancestor, &ours, &theirs, lines, output.as_deref()),
    }
}
