//! Remote repository interface
//!
//! The engine never talks to a host directly. Anything that can answer
//! these five questions about a versioned tree can serve as the remote.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::change::ChangeRecord;

/// Kind of an entry in a remote listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry of a remote tree at some revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub path: String,
    /// Git blob id of the content, comparable with `replica_fs::blob_hash`
    pub content_hash: String,
    pub byte_size: u64,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn file(path: impl Into<String>, content_hash: impl Into<String>, byte_size: u64) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            byte_size,
            kind: EntryKind::File,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Content written by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAddition {
    pub path: String,
    pub content: Vec<u8>,
}

impl FileAddition {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A version-controlled remote replica.
///
/// Revisions are opaque strings issued by the remote. Transport and
/// authentication failures surface as [`crate::Error::Transport`].
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Current tip of `branch`.
    async fn head_revision(&self, branch: &str) -> Result<String>;

    /// Every entry of the tree at `revision`.
    async fn list_files_at(&self, revision: &str) -> Result<Vec<RemoteEntry>>;

    /// Content of `path` at `revision`.
    ///
    /// Fails with [`crate::Error::MissingRemoteFile`] when the path does not
    /// exist there.
    async fn read_file_content(&self, revision: &str, path: &str) -> Result<Vec<u8>>;

    /// Files changed between `base` and `revision`.
    async fn changes_since(&self, base: &str, revision: &str) -> Result<Vec<ChangeRecord>>;

    /// Write all additions and deletions as one commit on `branch`.
    ///
    /// Fails with [`crate::Error::StaleHead`] unless the branch tip is still
    /// `expected_head`. Returns the new revision.
    async fn commit_atomically(
        &self,
        branch: &str,
        expected_head: &str,
        additions: Vec<FileAddition>,
        deletions: Vec<String>,
        message: &str,
    ) -> Result<String>;
}
