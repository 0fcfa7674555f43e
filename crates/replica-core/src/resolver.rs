//! Delta resolution
//!
//! Turns a structural diff plus the two change logs into the concrete
//! actions of a pass. Local is the left side of the diff, remote the right.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use replica_merkle::Differences;

use crate::change::{self, ChangeRecord};
use crate::config::SyncStrategy;

/// Actions decided for one pass.
///
/// No path appears in more than one of `downloads`, `uploads`, `removes`
/// and `conflicts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Remote content to write locally
    pub downloads: BTreeSet<String>,
    /// Local state to commit; a path missing locally is committed as a deletion
    pub uploads: BTreeSet<String>,
    /// Local files to delete
    pub removes: BTreeSet<String>,
    /// Paths changed on both sides since the checkpoint
    pub conflicts: BTreeSet<String>,
    /// Paths skipped for exceeding the size ceiling
    pub oversized: BTreeSet<String>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.downloads.is_empty()
            && self.uploads.is_empty()
            && self.removes.is_empty()
            && self.conflicts.is_empty()
    }

    /// Drop downloads and conflicts whose remote size exceeds `max_bytes`.
    ///
    /// Returns the number of paths dropped.
    pub fn exclude_oversized(&mut self, remote_sizes: &BTreeMap<String, u64>, max_bytes: u64) -> usize {
        let too_big = |path: &String| remote_sizes.get(path).is_some_and(|&size| size > max_bytes);

        let dropped: BTreeSet<String> = self
            .downloads
            .iter()
            .chain(self.conflicts.iter())
            .filter(|p| too_big(*p))
            .cloned()
            .collect();

        for path in &dropped {
            tracing::warn!(path = %path, max_bytes, "Skipping oversized file");
            self.downloads.remove(path);
            self.conflicts.remove(path);
        }
        let count = dropped.len();
        self.oversized.extend(dropped);
        count
    }
}

/// Combine the diff and change logs under `strategy`.
///
/// Either log being `None` means there is no checkpoint yet; a
/// bidirectional pass then trusts the structure alone: local-only and
/// differing files are uploaded, remote-only files downloaded, nothing is
/// deleted and nothing conflicts.
pub fn resolve(
    diff: &Differences,
    local_changes: Option<&[ChangeRecord]>,
    remote_changes: Option<&[ChangeRecord]>,
    strategy: SyncStrategy,
) -> Resolution {
    let resolution = match strategy {
        SyncStrategy::Pull => Resolution {
            downloads: union(&diff.only_right, &diff.differing),
            removes: diff.only_left.clone(),
            ..Resolution::default()
        },
        SyncStrategy::Push => Resolution {
            uploads: union(&diff.only_left, &diff.differing),
            ..Resolution::default()
        },
        SyncStrategy::Bidirectional => match (local_changes, remote_changes) {
            (Some(local), Some(remote)) => bidirectional(diff, local, remote),
            _ => {
                tracing::info!("No checkpoint, reconciling from structure alone");
                Resolution {
                    uploads: union(&diff.only_left, &diff.differing),
                    downloads: diff.only_right.clone(),
                    ..Resolution::default()
                }
            }
        },
    };

    tracing::debug!(
        %strategy,
        downloads = resolution.downloads.len(),
        uploads = resolution.uploads.len(),
        removes = resolution.removes.len(),
        conflicts = resolution.conflicts.len(),
        "Resolved deltas"
    );
    resolution
}

fn bidirectional(
    diff: &Differences,
    local: &[ChangeRecord],
    remote: &[ChangeRecord],
) -> Resolution {
    let local_touched = change::touched(local);
    let remote_touched = change::touched(remote);

    let conflicts: BTreeSet<String> = local_touched.intersection(&remote_touched).cloned().collect();

    let removes: BTreeSet<String> = change::removed(remote)
        .into_iter()
        .filter(|p| !local_touched.contains(p))
        .collect();

    // A remote-only path is a local deletion only if the local log says so;
    // otherwise the replica never held it and it is fetched instead
    let local_removed = change::removed(local);
    let uploads: BTreeSet<String> = diff
        .only_left
        .iter()
        .chain(&diff.differing)
        .chain(diff.only_right.intersection(&local_removed))
        .filter(|p| !remote_touched.contains(*p))
        .cloned()
        .collect();

    let downloads: BTreeSet<String> = union(&diff.only_right, &diff.differing)
        .into_iter()
        .filter(|p| !local_touched.contains(p) && !uploads.contains(p))
        .collect();

    let without_conflicts = |set: BTreeSet<String>| -> BTreeSet<String> {
        set.into_iter().filter(|p| !conflicts.contains(p)).collect()
    };

    Resolution {
        downloads: without_conflicts(downloads),
        uploads: without_conflicts(uploads),
        removes: without_conflicts(removes),
        conflicts: conflicts.clone(),
        oversized: BTreeSet::new(),
    }
}

fn union(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    a.union(b).cloned().collect()
}
