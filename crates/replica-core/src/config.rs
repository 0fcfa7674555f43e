//! Sync configuration
//!
//! Stored at `.replica/config.toml` inside the local replica. Every key is
//! optional; missing keys take the defaults below.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use replica_fs::{ConfigStore, NormalizedPath};
use replica_merge::Granularity;

use crate::{Error, Result};

/// Directory holding replica metadata, relative to the replica root.
pub const STATE_DIR: &str = ".replica";

/// Config file name inside [`STATE_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Placeholder substituted in [`SyncConfig::commit_message`].
const COUNT_PLACEHOLDER: &str = "{count}";

fn default_branch() -> String {
    "main".to_string()
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024
}

fn default_cache_ttl_secs() -> u64 {
    5
}

fn default_hash_concurrency() -> usize {
    8
}

fn default_commit_message() -> String {
    "replica sync: {count} files".to_string()
}

/// Which direction changes flow during a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// Make the local replica match the remote
    Pull,
    /// Send local changes to the remote, never touching local files
    Push,
    /// Exchange changes both ways, merging where both sides edited
    #[default]
    Bidirectional,
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Push => write!(f, "push"),
            Self::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

impl FromStr for SyncStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pull" => Ok(Self::Pull),
            "push" => Ok(Self::Push),
            "bidirectional" | "both" => Ok(Self::Bidirectional),
            other => Err(Error::Config {
                message: format!("unknown strategy '{other}'"),
            }),
        }
    }
}

/// Settings for a replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub strategy: SyncStrategy,

    /// Remote branch to reconcile against
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Location of the remote repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Files larger than this many bytes are never transferred or merged
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// How long listings stay cached, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Upper bound on files hashed at once
    #[serde(default = "default_hash_concurrency")]
    pub hash_concurrency: usize,

    #[serde(default)]
    pub merge_granularity: Granularity,

    /// Commit message template; `{count}` becomes the number of changed files
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: SyncStrategy::default(),
            branch: default_branch(),
            remote: None,
            max_file_size: default_max_file_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
            hash_concurrency: default_hash_concurrency(),
            merge_granularity: Granularity::default(),
            commit_message: default_commit_message(),
        }
    }
}

impl SyncConfig {
    /// Path of the config file for the replica rooted at `root`.
    pub fn path_in(root: &NormalizedPath) -> NormalizedPath {
        root.join(STATE_DIR).join(CONFIG_FILE)
    }

    /// Load the config for a replica, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if it
    /// holds invalid values.
    pub fn load(root: &NormalizedPath) -> Result<Self> {
        let path = Self::path_in(root);
        if !path.exists() {
            tracing::debug!(path = %path.as_str(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let config: Self = ConfigStore::new().load(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config into the replica's state directory.
    pub fn save(&self, root: &NormalizedPath) -> Result<()> {
        self.validate()?;
        ConfigStore::new().save(&Self::path_in(root), self)?;
        Ok(())
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.branch.trim().is_empty() {
            return Err(Error::Config {
                message: "branch must not be empty".into(),
            });
        }
        if self.hash_concurrency == 0 {
            return Err(Error::Config {
                message: "hash_concurrency must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Render the commit message for `count` changed files.
    pub fn commit_message_for(&self, count: usize) -> String {
        self.commit_message
            .replace(COUNT_PLACEHOLDER, &count.to_string())
    }
}
