//! Reconciliation engine for Replica Sync
//!
//! This crate ties the layer-0 crates together into sync passes:
//!
//! - **Delta resolution**: structural diff plus change logs become
//!   download, upload, remove and conflict sets under a strategy
//! - **Conflict handling**: three-way merge where possible, side-by-side
//!   copies otherwise
//! - **Reconciler**: plans and applies passes, one at a time, advancing the
//!   checkpoint only when a pass gets through its commit
//!
//! # Architecture
//!
//! ```text
//!                      replica-cli
//!                          |
//!            replica-core --- replica-git
//!                          |
//!      +-------------------+------------------+
//!      |                   |                  |
//!  replica-fs        replica-merkle     replica-merge
//! ```
//!
//! The remote host and the local replica are reached only through
//! [`RemoteRepository`] and [`replica_fs::LocalStorage`].

pub mod cache;
pub mod change;
pub mod checkpoint;
pub mod config;
pub mod conflict;
pub mod error;
pub mod filter;
pub mod hashing;
pub mod reconcile;
pub mod remote;
pub mod report;
pub mod resolver;

pub use cache::{ListingCache, ListingCaches};
pub use change::{ChangeAction, ChangeRecord, local_changes};
pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, SyncCheckpoint};
pub use config::{STATE_DIR, SyncConfig, SyncStrategy};
pub use conflict::{ConflictResolution, artifact_path, resolve_conflict};
pub use error::{Error, Result};
pub use filter::{AcceptAll, PathFilter};
pub use reconcile::{Reconciler, SyncPlan};
pub use remote::{EntryKind, FileAddition, RemoteEntry, RemoteRepository};
pub use report::{PathFailure, SyncOutcome, SyncReport};
pub use resolver::{Resolution, resolve};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_head_is_retryable() {
        let error = Error::StaleHead {
            branch: "main".into(),
            expected: "abc".into(),
            actual: "def".into(),
        };
        assert!(error.is_retryable());
        assert!(error.to_string().contains("main"));
        assert!(!Error::transport("connection reset").is_retryable());
    }
}
