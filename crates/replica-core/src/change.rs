//! Change logs
//!
//! Each side reports the paths it mutated since the checkpoint. The remote
//! side comes from the host; the local side is derived here from the listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use replica_fs::FileEntry;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Modified,
    Removed,
}

/// One path mutated since the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub path: String,
    pub action: ChangeAction,
}

impl ChangeRecord {
    pub fn new(path: impl Into<String>, action: ChangeAction) -> Self {
        Self {
            path: path.into(),
            action,
        }
    }

    pub fn added(path: impl Into<String>) -> Self {
        Self::new(path, ChangeAction::Added)
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self::new(path, ChangeAction::Modified)
    }

    pub fn removed(path: impl Into<String>) -> Self {
        Self::new(path, ChangeAction::Removed)
    }
}

/// Derive the local change log from a hashed listing.
///
/// A file counts as changed when it was modified after `since` and its
/// content differs from the base revision: `Added` when the base did not
/// have it, `Modified` otherwise. A base path missing from the listing was
/// removed locally, unless it is `unsynced`: the replica never held it.
pub fn local_changes(
    entries: &[(FileEntry, String)],
    base: &BTreeMap<String, String>,
    unsynced: &BTreeSet<String>,
    since: DateTime<Utc>,
) -> Vec<ChangeRecord> {
    let mut changes: Vec<ChangeRecord> = entries
        .iter()
        .filter(|(entry, hash)| entry.mtime > since && base.get(&entry.path) != Some(hash))
        .map(|(entry, _)| {
            if base.contains_key(&entry.path) {
                ChangeRecord::modified(&entry.path)
            } else {
                ChangeRecord::added(&entry.path)
            }
        })
        .collect();

    let present: BTreeSet<&str> = entries.iter().map(|(e, _)| e.path.as_str()).collect();
    changes.extend(
        base.keys()
            .filter(|path| !present.contains(path.as_str()) && !unsynced.contains(*path))
            .map(ChangeRecord::removed),
    );

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}

/// Paths named in a change log.
pub(crate) fn touched(changes: &[ChangeRecord]) -> BTreeSet<String> {
    changes.iter().map(|c| c.path.clone()).collect()
}

/// Paths a change log reports as removed.
pub(crate) fn removed(changes: &[ChangeRecord]) -> BTreeSet<String> {
    changes
        .iter()
        .filter(|c| c.action == ChangeAction::Removed)
        .map(|c| c.path.clone())
        .collect()
}
