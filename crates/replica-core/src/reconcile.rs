//! Reconciliation passes
//!
//! A pass runs in two halves. Planning gathers both trees and both change
//! logs concurrently, diffs the trees and resolves the deltas; it mutates
//! nothing. Applying then downloads, removes, materializes conflicts and
//! finally pushes every upload as one atomic commit. The checkpoint moves
//! only once all of that has happened.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinSet;
use tracing::instrument;

use replica_fs::{FileEntry, LocalStorage, blob_hash};
use replica_merge::Granularity;
use replica_merkle::{build_tree, diff};

use crate::cache::ListingCaches;
use crate::change::{ChangeRecord, local_changes};
use crate::checkpoint::{CheckpointStore, SyncCheckpoint};
use crate::config::SyncConfig;
use crate::conflict::{ConflictResolution, resolve_conflict};
use crate::filter::{AcceptAll, PathFilter};
use crate::hashing::hash_local_files;
use crate::remote::{FileAddition, RemoteEntry, RemoteRepository};
use crate::report::{SyncOutcome, SyncReport};
use crate::resolver::{Resolution, resolve};
use crate::{Error, Result};

/// Everything decided by planning a pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlan {
    /// Remote head the plan was computed against
    pub head: String,
    /// Checkpoint revision, absent before the first sync
    pub base: Option<String>,
    pub local_root_hash: String,
    pub remote_root_hash: String,
    pub resolution: Resolution,
    #[serde(skip)]
    remote_files: BTreeMap<String, RemoteEntry>,
}

impl SyncPlan {
    /// Whether the replicas already agree.
    pub fn in_sync(&self) -> bool {
        self.resolution.is_empty()
    }
}

/// Clears the running flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Result of materializing one conflicted path.
struct Materialized {
    merged: bool,
    conflicted: bool,
    downloaded: bool,
    uploads: Vec<FileAddition>,
}

/// Drives reconciliation between one local replica and one remote branch.
///
/// At most one pass runs at a time; a second concurrent call to
/// [`Reconciler::run`] returns a skipped report immediately.
pub struct Reconciler {
    remote: Arc<dyn RemoteRepository>,
    local: Arc<dyn LocalStorage>,
    checkpoints: Arc<dyn CheckpointStore>,
    filter: Arc<dyn PathFilter>,
    caches: Arc<ListingCaches>,
    config: SyncConfig,
    running: AtomicBool,
}

impl Reconciler {
    pub fn new(
        remote: Arc<dyn RemoteRepository>,
        local: Arc<dyn LocalStorage>,
        checkpoints: Arc<dyn CheckpointStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            remote,
            local,
            checkpoints,
            filter: Arc::new(AcceptAll),
            caches: Arc::new(ListingCaches::new(config.cache_ttl())),
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Exclude paths the filter rejects from both replicas.
    pub fn with_filter(mut self, filter: impl PathFilter + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Share listing caches with other reconcilers or callers.
    pub fn with_caches(mut self, caches: Arc<ListingCaches>) -> Self {
        self.caches = caches;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The checkpoint the next pass will start from.
    pub fn checkpoint(&self) -> Result<Option<SyncCheckpoint>> {
        self.checkpoints.load()
    }

    /// Compute what a pass would do without doing it.
    #[instrument(skip(self), fields(branch = %self.config.branch, strategy = %self.config.strategy))]
    pub async fn plan(&self) -> Result<SyncPlan> {
        let checkpoint = self.checkpoints.load()?;
        self.prepare(checkpoint.as_ref()).await
    }

    /// Run one full pass.
    ///
    /// # Errors
    ///
    /// Fails before touching anything when a replica cannot be enumerated
    /// or the remote is unreachable. Fails with [`Error::StaleHead`] when
    /// the branch moved during the pass; local changes already applied stay
    /// and the checkpoint is left as it was.
    #[instrument(skip(self), fields(branch = %self.config.branch, strategy = %self.config.strategy))]
    pub async fn run(&self) -> Result<SyncReport> {
        let Some(_guard) = PassGuard::acquire(&self.running) else {
            tracing::info!("Pass already running, skipping");
            return Ok(SyncReport::skipped());
        };

        let started_at = Utc::now();
        let checkpoint = self.checkpoints.load()?;
        let plan = self.prepare(checkpoint.as_ref()).await?;
        tracing::info!(
            head = %plan.head,
            downloads = plan.resolution.downloads.len(),
            uploads = plan.resolution.uploads.len(),
            removes = plan.resolution.removes.len(),
            conflicts = plan.resolution.conflicts.len(),
            "Starting pass"
        );

        let mut report = SyncReport {
            oversized: plan.resolution.oversized.len(),
            ..SyncReport::default()
        };

        self.apply_downloads(&plan, &mut report).await;
        self.apply_removes(&plan, &mut report).await;
        let conflict_uploads = self.materialize_conflicts(&plan, started_at, &mut report).await;
        self.caches.local.invalidate();

        let (additions, deletions) = self.collect_uploads(&plan, conflict_uploads, &mut report).await;
        let unsynced = self.unsynced_after(&plan, &deletions).await?;
        if !additions.is_empty() || !deletions.is_empty() {
            let count = additions.len() + deletions.len();
            let (added, deleted) = (additions.len(), deletions.len());
            let revision = self
                .remote
                .commit_atomically(
                    &self.config.branch,
                    &plan.head,
                    additions,
                    deletions,
                    &self.config.commit_message_for(count),
                )
                .await?;
            tracing::info!(revision = %revision, files = count, "Committed to remote");
            self.caches.remote.invalidate();
            report.uploaded = added;
            report.removed_remote = deleted;
            report.new_commit = Some(revision);
        }

        let synced_commit = report.new_commit.clone().unwrap_or_else(|| plan.head.clone());
        self.checkpoints
            .save(&SyncCheckpoint::new(started_at, synced_commit).with_unsynced(unsynced))?;

        report.outcome = if report.failures.is_empty() {
            SyncOutcome::Completed
        } else {
            SyncOutcome::Partial
        };
        tracing::info!(summary = %report, "Pass finished");
        Ok(report)
    }

    async fn prepare(&self, checkpoint: Option<&SyncCheckpoint>) -> Result<SyncPlan> {
        let head = self.remote.head_revision(&self.config.branch).await?;
        let base = checkpoint.map(|c| c.current_commit.clone());

        let (remote_listing, local_listing, remote_changes, base_hashes) = tokio::try_join!(
            self.remote_listing(&head),
            self.local_listing(),
            self.remote_changes(base.as_deref(), &head),
            self.base_hashes(base.as_deref()),
        )?;

        let local_hashes: BTreeMap<String, String> = local_listing
            .iter()
            .map(|(entry, hash)| (entry.path.clone(), hash.clone()))
            .collect();
        let remote_files: BTreeMap<String, RemoteEntry> = remote_listing
            .into_iter()
            .map(|entry| (entry.path.clone(), entry))
            .collect();

        let local_tree = build_tree(local_hashes.keys(), |p: &str| {
            lookup(&local_hashes, p, |h| h.clone())
        })?;
        let remote_tree = build_tree(remote_files.keys(), |p: &str| {
            lookup(&remote_files, p, |e| e.content_hash.clone())
        })?;
        let differences = diff(&local_tree, &remote_tree);

        let local_log = match (checkpoint, &base_hashes) {
            (Some(cp), Some(base_hashes)) => Some(local_changes(
                &local_listing,
                base_hashes,
                &cp.unsynced,
                cp.last_synced_at,
            )),
            _ => None,
        };

        let mut resolution = resolve(
            &differences,
            local_log.as_deref(),
            remote_changes.as_deref(),
            self.config.strategy,
        );
        let sizes: BTreeMap<String, u64> = remote_files
            .iter()
            .map(|(path, entry)| (path.clone(), entry.byte_size))
            .collect();
        resolution.exclude_oversized(&sizes, self.config.max_file_size);

        Ok(SyncPlan {
            head,
            base,
            local_root_hash: local_tree.hash().to_string(),
            remote_root_hash: remote_tree.hash().to_string(),
            resolution,
            remote_files,
        })
    }

    /// Files on the remote at `revision`, filtered.
    async fn remote_listing(&self, revision: &str) -> Result<Vec<RemoteEntry>> {
        if let Some(cached) = self.caches.remote.get(revision) {
            tracing::debug!(revision, "Remote listing from cache");
            return Ok(cached);
        }
        let listing: Vec<RemoteEntry> = self
            .remote
            .list_files_at(revision)
            .await?
            .into_iter()
            .filter(|e| e.is_file() && self.filter.accepts(&e.path))
            .collect();
        self.caches.remote.put(revision, listing.clone());
        Ok(listing)
    }

    /// Local files with their blob hashes, filtered.
    async fn local_listing(&self) -> Result<Vec<(FileEntry, String)>> {
        if let Some(cached) = self.caches.local.get("") {
            tracing::debug!("Local listing from cache");
            return Ok(cached);
        }

        let local = Arc::clone(&self.local);
        let entries = tokio::task::spawn_blocking(move || local.list_files())
            .await?
            .map_err(|e| Error::Enumeration {
                side: "local",
                message: e.to_string(),
            })?;
        let entries: Vec<FileEntry> = entries
            .into_iter()
            .filter(|e| self.filter.accepts(&e.path))
            .collect();

        let paths = entries.iter().map(|e| e.path.clone()).collect();
        let mut hashes =
            hash_local_files(Arc::clone(&self.local), paths, self.config.hash_concurrency).await?;
        let listing: Vec<(FileEntry, String)> = entries
            .into_iter()
            .filter_map(|e| hashes.remove(&e.path).map(|h| (e, h)))
            .collect();

        self.caches.local.put("", listing.clone());
        Ok(listing)
    }

    async fn remote_changes(
        &self,
        base: Option<&str>,
        head: &str,
    ) -> Result<Option<Vec<ChangeRecord>>> {
        let Some(base) = base else {
            return Ok(None);
        };
        if base == head {
            return Ok(Some(Vec::new()));
        }
        let changes = self
            .remote
            .changes_since(base, head)
            .await?
            .into_iter()
            .filter(|c| self.filter.accepts(&c.path))
            .collect();
        Ok(Some(changes))
    }

    /// Content hashes of the files at the checkpoint revision.
    async fn base_hashes(&self, base: Option<&str>) -> Result<Option<BTreeMap<String, String>>> {
        let Some(base) = base else {
            return Ok(None);
        };
        let listing = self.remote.list_files_at(base).await?;
        Ok(Some(
            listing
                .into_iter()
                .filter(|e| e.is_file() && self.filter.accepts(&e.path))
                .map(|e| (e.path, e.content_hash))
                .collect(),
        ))
    }

    async fn apply_downloads(&self, plan: &SyncPlan, report: &mut SyncReport) {
        for path in &plan.resolution.downloads {
            let content = match self.remote.read_file_content(&plan.head, path).await {
                Ok(content) => content,
                Err(e) => {
                    report.fail(path, e);
                    continue;
                }
            };
            let target = path.clone();
            match self.on_local(move |local| local.write_bytes(&target, &content)).await {
                Ok(()) => {
                    tracing::debug!(path = %path, "Downloaded");
                    report.downloaded += 1;
                }
                Err(e) => report.fail(path, e),
            }
        }
    }

    async fn apply_removes(&self, plan: &SyncPlan, report: &mut SyncReport) {
        for path in &plan.resolution.removes {
            let target = path.clone();
            match self.on_local(move |local| local.remove(&target)).await {
                Ok(()) => {
                    tracing::debug!(path = %path, "Removed locally");
                    report.removed_local += 1;
                }
                Err(e) => report.fail(path, e),
            }
        }
    }

    /// Resolve every conflicted path concurrently.
    ///
    /// Returns the content each resolution wants committed.
    async fn materialize_conflicts(
        &self,
        plan: &SyncPlan,
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Vec<FileAddition> {
        let mut tasks = JoinSet::new();
        for path in &plan.resolution.conflicts {
            let remote = Arc::clone(&self.remote);
            let local = Arc::clone(&self.local);
            let path = path.clone();
            let head = plan.head.clone();
            let base = plan.base.clone();
            let on_remote = plan.remote_files.contains_key(&path);
            let granularity = self.config.merge_granularity;

            tasks.spawn(async move {
                let outcome = materialize(
                    remote.as_ref(),
                    local,
                    &path,
                    &head,
                    base.as_deref(),
                    on_remote,
                    granularity,
                    now,
                )
                .await;
                (path, outcome)
            });
        }

        let mut uploads = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(done))) => {
                    report.merged += usize::from(done.merged);
                    report.conflicted += usize::from(done.conflicted);
                    report.downloaded += usize::from(done.downloaded);
                    uploads.extend(done.uploads);
                }
                Ok((path, Err(e))) => report.fail(path, e),
                Err(e) => report.fail("<conflict task>", e),
            }
        }
        uploads
    }

    /// Read local state for every upload path.
    ///
    /// Paths missing locally become deletions; content identical to the
    /// remote head is dropped.
    async fn collect_uploads(
        &self,
        plan: &SyncPlan,
        mut additions: Vec<FileAddition>,
        report: &mut SyncReport,
    ) -> (Vec<FileAddition>, Vec<String>) {
        let mut deletions = Vec::new();

        for path in &plan.resolution.uploads {
            let target = path.clone();
            let read = self
                .on_local(move |local| {
                    if local.exists(&target) {
                        local.read_bytes(&target).map(Some)
                    } else {
                        Ok(None)
                    }
                })
                .await;

            match read {
                Ok(Some(content)) => additions.push(FileAddition::new(path.clone(), content)),
                Ok(None) if plan.remote_files.contains_key(path) => deletions.push(path.clone()),
                Ok(None) => {}
                Err(e) => report.fail(path, e),
            }
        }

        additions.retain(|a| {
            plan.remote_files
                .get(&a.path)
                .is_none_or(|entry| entry.content_hash != blob_hash(&a.content))
        });
        (additions, deletions)
    }

    /// Remote files the local replica still lacks once the pass has applied.
    ///
    /// Paths about to be deleted from the remote are not counted.
    async fn unsynced_after(&self, plan: &SyncPlan, deletions: &[String]) -> Result<Vec<String>> {
        let held: BTreeSet<String> = self
            .on_local(|local| local.list_files())
            .await
            .map_err(|e| Error::Enumeration {
                side: "local",
                message: e.to_string(),
            })?
            .into_iter()
            .map(|entry| entry.path)
            .collect();

        let unsynced: Vec<String> = plan
            .remote_files
            .keys()
            .filter(|path| !held.contains(*path) && !deletions.contains(*path))
            .cloned()
            .collect();
        if !unsynced.is_empty() {
            tracing::debug!(count = unsynced.len(), "Remote files not held locally");
        }
        Ok(unsynced)
    }

    async fn on_local<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn LocalStorage) -> replica_fs::Result<T> + Send + 'static,
    {
        let local = Arc::clone(&self.local);
        Ok(tokio::task::spawn_blocking(move || op(local.as_ref())).await??)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

fn lookup<V>(
    map: &BTreeMap<String, V>,
    path: &str,
    hash: impl Fn(&V) -> String,
) -> std::result::Result<String, replica_fs::Error> {
    map.get(path).map(hash).ok_or_else(|| replica_fs::Error::NotFound {
        path: path.to_string(),
    })
}

/// Resolve one conflicted path and apply the local half of the outcome.
#[allow(clippy::too_many_arguments)]
async fn materialize(
    remote: &dyn RemoteRepository,
    local: Arc<dyn LocalStorage>,
    path: &str,
    head: &str,
    base: Option<&str>,
    on_remote: bool,
    granularity: Granularity,
    now: DateTime<Utc>,
) -> Result<Materialized> {
    let ancestor = match base {
        Some(base) => match remote.read_file_content(base, path).await {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path, error = %e, "Ancestor unavailable");
                None
            }
        },
        None => None,
    };
    let theirs = if on_remote {
        Some(remote.read_file_content(head, path).await?)
    } else {
        None
    };

    let ours = {
        let local = Arc::clone(&local);
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            if local.exists(&path) {
                local.read_bytes(&path).map(Some)
            } else {
                Ok(None)
            }
        })
        .await??
    };

    let resolution = resolve_conflict(
        path,
        ancestor.as_deref(),
        ours.as_deref(),
        theirs.as_deref(),
        granularity,
        now,
    );

    let mut done = Materialized {
        merged: false,
        conflicted: false,
        downloaded: false,
        uploads: Vec::new(),
    };
    let write = |target: String, content: Vec<u8>| {
        let local = Arc::clone(&local);
        tokio::task::spawn_blocking(move || local.write_bytes(&target, &content))
    };

    match resolution {
        ConflictResolution::Merged(content) => {
            tracing::debug!(path, "Merged");
            if ours.as_deref() != Some(content.as_slice()) {
                write(path.to_string(), content.clone()).await??;
            }
            done.merged = true;
            done.uploads.push(FileAddition::new(path, content));
        }
        ConflictResolution::SideBySide {
            artifact_path,
            theirs,
        } => {
            tracing::info!(path, artifact = %artifact_path, "Unmergeable conflict, keeping both versions");
            write(artifact_path.clone(), theirs.clone()).await??;
            done.conflicted = true;
            if let Some(ours) = ours {
                done.uploads.push(FileAddition::new(path, ours));
            }
            done.uploads.push(FileAddition::new(artifact_path, theirs));
        }
        ConflictResolution::TakeTheirs(content) => {
            tracing::debug!(path, "Removed locally, restoring remote version");
            write(path.to_string(), content).await??;
            done.downloaded = true;
        }
        ConflictResolution::KeepOurs => {
            tracing::debug!(path, "Removed remotely, keeping local version");
            if let Some(ours) = ours {
                done.uploads.push(FileAddition::new(path, ours));
            }
        }
        ConflictResolution::BothRemoved => {
            tracing::debug!(path, "Removed on both sides");
        }
    }

    Ok(done)
}
