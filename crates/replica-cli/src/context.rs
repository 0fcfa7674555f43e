//! Replica discovery
//!
//! Commands work from anywhere inside a replica: the root is the nearest
//! ancestor holding `.replica/config.toml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use replica_core::{FileCheckpointStore, Reconciler, STATE_DIR, SyncConfig, SyncStrategy};
use replica_fs::{DirStorage, NormalizedPath};
use replica_git::GitRemote;

use crate::error::{CliError, Result};

/// Walk up from `start` to the directory that owns a replica config.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| SyncConfig::path_in(&NormalizedPath::new(dir)).exists())
        .map(Path::to_path_buf)
}

/// An initialized replica and its configuration.
#[derive(Debug)]
pub struct ReplicaContext {
    pub root: NormalizedPath,
    pub config: SyncConfig,
}

impl ReplicaContext {
    /// Locate and load the replica containing `start`.
    pub fn discover(start: &Path) -> Result<Self> {
        let start = std::path::absolute(start)?;
        let root = find_root(&start).ok_or_else(|| {
            CliError::user(format!(
                "{} is not inside a replica (no {STATE_DIR}/config.toml); run `replica init --remote <path>` first",
                start.display()
            ))
        })?;
        let root = NormalizedPath::new(root);
        let config = SyncConfig::load(&root)?;
        Ok(Self { root, config })
    }

    /// Apply a `--strategy` override for this invocation.
    pub fn with_strategy(mut self, strategy: Option<&str>) -> Result<Self> {
        if let Some(s) = strategy {
            self.config.strategy = s.parse::<SyncStrategy>()?;
        }
        Ok(self)
    }

    /// Remote location, relative paths resolved against the replica root.
    pub fn remote_path(&self) -> Result<PathBuf> {
        let remote = self.config.remote.as_deref().ok_or_else(|| {
            CliError::user("No remote configured; set `remote` in .replica/config.toml")
        })?;
        let path = Path::new(remote);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.to_native().join(path)
        })
    }

    /// Wire a reconciler over the directory, the git remote and the checkpoint file.
    pub fn reconciler(&self) -> Result<Reconciler> {
        let remote = GitRemote::open(self.remote_path()?)?;
        tracing::debug!(root = %self.root.as_str(), remote = %remote.path().display(), "Opening replica");
        Ok(Reconciler::new(
            Arc::new(remote),
            Arc::new(DirStorage::new(self.root.clone())),
            Arc::new(FileCheckpointStore::in_replica(&self.root)),
            self.config.clone(),
        ))
    }
}
