//! Sync checkpoint persistence
//!
//! The checkpoint is the only state carried from one pass to the next. It
//! anchors both change logs and names the revision whose content serves as
//! the common ancestor for merges.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use replica_fs::NormalizedPath;

use crate::config::STATE_DIR;
use crate::{Error, Result};

/// Checkpoint file name inside the state directory.
pub const CHECKPOINT_FILE: &str = "checkpoint.toml";

/// Point at which the two replicas were last known to agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    /// Start time of the pass that produced this checkpoint
    pub last_synced_at: DateTime<Utc>,
    /// Remote revision both replicas matched at the end of that pass
    pub current_commit: String,
    /// Remote files the local replica did not hold at the end of that pass,
    /// such as oversized files and failed downloads
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unsynced: BTreeSet<String>,
}

impl SyncCheckpoint {
    pub fn new(last_synced_at: DateTime<Utc>, current_commit: impl Into<String>) -> Self {
        Self {
            last_synced_at,
            current_commit: current_commit.into(),
            unsynced: BTreeSet::new(),
        }
    }

    pub fn with_unsynced(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.unsynced = paths.into_iter().collect();
        self
    }
}

/// Load and save of the checkpoint.
pub trait CheckpointStore: Send + Sync {
    /// The saved checkpoint, or `None` before the first completed pass.
    fn load(&self) -> Result<Option<SyncCheckpoint>>;

    fn save(&self, checkpoint: &SyncCheckpoint) -> Result<()>;
}

/// Checkpoint kept as a TOML file.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `.replica/checkpoint.toml` beneath a replica root.
    pub fn in_replica(root: &NormalizedPath) -> Self {
        Self::new(root.join(STATE_DIR).join(CHECKPOINT_FILE).to_native())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, message: impl ToString) -> Error {
        Error::Checkpoint {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<Option<SyncCheckpoint>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e)),
        };
        file.lock_shared().map_err(|e| self.error(e))?;

        // Read through the locked handle
        let mut content = String::new();
        (&file)
            .read_to_string(&mut content)
            .map_err(|e| self.error(e))?;

        if content.trim().is_empty() {
            return Ok(None);
        }
        let checkpoint = toml::from_str(&content).map_err(|e| self.error(e))?;
        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &SyncCheckpoint) -> Result<()> {
        let content = toml::to_string_pretty(checkpoint)?;

        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        lock_file.lock_exclusive().map_err(|e| self.error(e))?;

        let temp_path = self.path.with_extension("toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| self.error(e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| self.error(e))?;

        tracing::debug!(commit = %checkpoint.current_commit, "Saved checkpoint");
        Ok(())
    }
}

/// Checkpoint held in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    inner: Mutex<Option<SyncCheckpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(checkpoint: SyncCheckpoint) -> Self {
        Self {
            inner: Mutex::new(Some(checkpoint)),
        }
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Result<Option<SyncCheckpoint>> {
        Ok(self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, checkpoint: &SyncCheckpoint) -> Result<()> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = Some(checkpoint.clone());
        Ok(())
    }
}
