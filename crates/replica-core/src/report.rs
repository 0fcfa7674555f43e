//! Pass summaries

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a pass ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Every planned action succeeded
    #[default]
    Completed,
    /// Some paths failed; the rest were applied and the checkpoint advanced
    Partial,
    /// Another pass was already running
    Skipped,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Partial => write!(f, "partial"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// A path whose action failed without aborting the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFailure {
    pub path: String,
    pub message: String,
}

/// Counts of everything a pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Files written locally from the remote
    pub downloaded: usize,
    /// Files written to the remote
    pub uploaded: usize,
    /// Files deleted locally
    pub removed_local: usize,
    /// Files deleted on the remote
    pub removed_remote: usize,
    /// Conflicts resolved by merging
    pub merged: usize,
    /// Conflicts materialized side by side
    pub conflicted: usize,
    /// Files skipped for size
    pub oversized: usize,
    pub failures: Vec<PathFailure>,
    /// Revision created by the pass, if it committed anything
    pub new_commit: Option<String>,
}

impl SyncReport {
    pub fn skipped() -> Self {
        Self {
            outcome: SyncOutcome::Skipped,
            ..Self::default()
        }
    }

    pub(crate) fn fail(&mut self, path: impl Into<String>, error: impl fmt::Display) {
        let path = path.into();
        tracing::warn!(path = %path, error = %error, "Path failed");
        self.failures.push(PathFailure {
            path,
            message: error.to_string(),
        });
    }

    /// Whether the pass changed nothing on either side.
    pub fn is_noop(&self) -> bool {
        self.downloaded
            + self.uploaded
            + self.removed_local
            + self.removed_remote
            + self.merged
            + self.conflicted
            == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} downloaded, {} uploaded, {} removed locally, {} removed remotely, \
             {} merged, {} conflicted, {} oversized, {} failed",
            self.outcome,
            self.downloaded,
            self.uploaded,
            self.removed_local,
            self.removed_remote,
            self.merged,
            self.conflicted,
            self.oversized,
            self.failures.len()
        )
    }
}
