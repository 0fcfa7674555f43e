//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Replica Sync - reconcile a local directory with a git remote
#[derive(Parser, Debug)]
#[command(name = "replica")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Root of the local replica
    #[arg(short = 'C', long, global = true, default_value = ".", env = "REPLICA_ROOT")]
    pub root: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Set up a replica in the root directory
    ///
    /// Writes .replica/config.toml and creates a bare git repository at
    /// the remote path if none exists there.
    ///
    /// Examples:
    ///   replica init --remote ../notes.git
    ///   replica init --remote /srv/notes.git --strategy pull
    Init {
        /// Path of the remote git repository
        #[arg(short, long)]
        remote: String,

        /// Remote branch to reconcile against
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// pull, push or bidirectional
        #[arg(short, long)]
        strategy: Option<String>,
    },

    /// Show what a sync would change
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Reconcile the local replica with the remote
    Sync {
        /// Override the configured strategy for this pass
        #[arg(short, long)]
        strategy: Option<String>,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON for CI/CD integration
        #[arg(long)]
        json: bool,
    },

    /// Three-way merge of three files, printing the result
    ///
    /// Exits with status 1 if the two sides edit the same region.
    Merge {
        /// Common ancestor
        ancestor: PathBuf,

        /// Our version
        ours: PathBuf,

        /// Their version
        theirs: PathBuf,

        /// Merge whole lines instead of characters
        #[arg(long)]
        lines: bool,

        /// Write the merged text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
