//! Init command implementation
//!
//! Writes the replica config and makes sure the remote exists.

use std::path::Path;

use colored::Colorize;

use replica_core::{SyncConfig, SyncStrategy};
use replica_fs::NormalizedPath;
use replica_git::GitRemote;

use crate::error::{CliError, Result};

/// Run the init command
pub fn run_init(path: &Path, remote: &str, branch: &str, strategy: Option<&str>) -> Result<()> {
    println!(
        "{} Initializing replica in {}...",
        "=>".blue().bold(),
        path.display().to_string().cyan()
    );

    let config = init_replica(path, remote, branch, strategy)?;

    println!("   Remote: {}", remote.yellow());
    println!("   Branch: {}", config.branch.yellow());
    println!("   Strategy: {}", config.strategy.to_string().yellow());
    println!("{} Replica initialized!", "OK".green().bold());
    Ok(())
}

/// Create `.replica/config.toml` under `path` and a bare remote if needed.
pub fn init_replica(
    path: &Path,
    remote: &str,
    branch: &str,
    strategy: Option<&str>,
) -> Result<SyncConfig> {
    std::fs::create_dir_all(path)?;
    let root = NormalizedPath::new(std::path::absolute(path)?);
    if SyncConfig::path_in(&root).exists() {
        return Err(CliError::user(format!(
            "{} is already a replica",
            path.display()
        )));
    }

    let strategy = strategy
        .map(str::parse::<SyncStrategy>)
        .transpose()?
        .unwrap_or_default();
    let config = SyncConfig {
        strategy,
        branch: branch.to_string(),
        remote: Some(remote.to_string()),
        ..SyncConfig::default()
    };
    config.validate()?;

    let remote_path = Path::new(remote);
    let remote_path = if remote_path.is_absolute() {
        remote_path.to_path_buf()
    } else {
        root.to_native().join(remote_path)
    };
    GitRemote::open_or_init(remote_path)?;

    config.save(&root)?;
    tracing::debug!(root = %root.as_str(), "Wrote replica config");
    Ok(config)
}
