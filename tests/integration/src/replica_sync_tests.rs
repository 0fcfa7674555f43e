//! End-to-end passes between directory replicas and a bare git remote
//!
//! Each test plays two clients, alice and bob, each with a working
//! directory and an on-disk checkpoint, reconciling through one remote.

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use replica_core::{FileCheckpointStore, Reconciler, SyncConfig, SyncOutcome, SyncStrategy};
use replica_fs::{DirStorage, NormalizedPath};
use replica_git::GitRemote;
use replica_test_utils::git::{bare_remote, branch_files, commit_count, commit_files};

struct World {
    _dir: TempDir,
    remote: PathBuf,
    alice: PathBuf,
    bob: PathBuf,
}

impl World {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let remote = dir.path().join("remote.git");
        bare_remote(&remote);
        let alice = dir.path().join("alice");
        let bob = dir.path().join("bob");
        fs::create_dir_all(&alice).unwrap();
        fs::create_dir_all(&bob).unwrap();
        Self {
            _dir: dir,
            remote,
            alice,
            bob,
        }
    }

    /// A fresh reconciler each call, so state only survives through the
    /// checkpoint file.
    fn reconciler(&self, root: &Path, strategy: SyncStrategy) -> Reconciler {
        Reconciler::new(
            Arc::new(GitRemote::open(&self.remote).unwrap()),
            Arc::new(DirStorage::new(root)),
            Arc::new(FileCheckpointStore::in_replica(&NormalizedPath::new(root))),
            SyncConfig {
                strategy,
                cache_ttl_secs: 0,
                ..SyncConfig::default()
            },
        )
    }

    async fn sync(&self, root: &Path) -> replica_core::SyncReport {
        let report = self
            .reconciler(root, SyncStrategy::Bidirectional)
            .run()
            .await
            .unwrap();
        assert_eq!(report.outcome, SyncOutcome::Completed, "{report}");
        report
    }

    fn repo(&self) -> git2::Repository {
        git2::Repository::open_bare(&self.remote).unwrap()
    }

    fn remote_files(&self) -> BTreeMap<String, String> {
        branch_files(&self.repo(), "main")
    }
}

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

/// Every synced file under `root`, ignoring replica state.
fn tree(root: &Path) -> BTreeMap<String, String> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.file_name().is_some_and(|n| n == ".replica") {
                continue;
            }
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                let rel = rel.to_string_lossy().replace('\\', "/");
                out.insert(rel, fs::read_to_string(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[tokio::test]
async fn two_replicas_converge() {
    let w = World::new();
    write(&w.alice, "a.md", "alpha");
    write(&w.alice, "docs/b.md", "beta");

    let first = w.sync(&w.alice).await;
    assert_eq!(first.uploaded, 2);

    let second = w.sync(&w.bob).await;
    assert_eq!(second.downloaded, 2);
    assert_eq!(tree(&w.bob), tree(&w.alice));
    assert_eq!(w.remote_files(), tree(&w.alice));
}

#[tokio::test]
async fn edits_flow_both_ways() {
    let w = World::new();
    write(&w.alice, "a.md", "v1");
    w.sync(&w.alice).await;
    w.sync(&w.bob).await;

    write(&w.bob, "a.md", "v2 from bob");
    let bob = w.sync(&w.bob).await;
    assert_eq!(bob.uploaded, 1);

    let alice = w.sync(&w.alice).await;
    assert_eq!(alice.downloaded, 1);
    assert_eq!(alice.uploaded, 0);
    assert_eq!(read(&w.alice, "a.md"), "v2 from bob");
}

#[tokio::test]
async fn checkpoint_survives_new_reconcilers() {
    let w = World::new();
    write(&w.alice, "a.md", "alpha");
    w.sync(&w.alice).await;
    let commits = commit_count(&w.repo(), "main");

    let report = w.sync(&w.alice).await;

    assert!(report.is_noop(), "{report}");
    assert_eq!(commit_count(&w.repo(), "main"), commits);
    let plan = w
        .reconciler(&w.alice, SyncStrategy::Bidirectional)
        .plan()
        .await
        .unwrap();
    assert!(plan.in_sync());
    assert_eq!(plan.local_root_hash, plan.remote_root_hash);
}

#[tokio::test]
async fn disjoint_edits_merge_across_replicas() {
    let w = World::new();
    write(&w.alice, "note.md", "one\ntwo\nthree\n");
    w.sync(&w.alice).await;
    w.sync(&w.bob).await;

    write(&w.alice, "note.md", "ONE\ntwo\nthree\n");
    w.sync(&w.alice).await;
    write(&w.bob, "note.md", "one\ntwo\nTHREE\n");
    let bob = w.sync(&w.bob).await;

    assert_eq!(bob.merged, 1);
    assert_eq!(read(&w.bob, "note.md"), "ONE\ntwo\nTHREE\n");

    w.sync(&w.alice).await;
    assert_eq!(read(&w.alice, "note.md"), "ONE\ntwo\nTHREE\n");
}

#[tokio::test]
async fn overlapping_edits_leave_a_conflict_artifact() {
    let w = World::new();
    write(&w.alice, "note.md", "draft");
    w.sync(&w.alice).await;
    w.sync(&w.bob).await;

    write(&w.alice, "note.md", "alice's draft");
    w.sync(&w.alice).await;
    write(&w.bob, "note.md", "bob's draft");
    let bob = w.sync(&w.bob).await;

    assert_eq!(bob.conflicted, 1);
    assert_eq!(read(&w.bob, "note.md"), "bob's draft");
    let bob_files = tree(&w.bob);
    let artifact = bob_files
        .keys()
        .find(|p| p.starts_with("note.conflict-"))
        .expect("conflict artifact")
        .clone();
    assert_eq!(bob_files[&artifact], "alice's draft");

    // Alice receives bob's version and the artifact
    w.sync(&w.alice).await;
    assert_eq!(read(&w.alice, "note.md"), "bob's draft");
    assert_eq!(read(&w.alice, &artifact), "alice's draft");
}

#[tokio::test]
async fn deletions_propagate() {
    let w = World::new();
    write(&w.alice, "keep.md", "k");
    write(&w.alice, "drop.md", "d");
    w.sync(&w.alice).await;
    w.sync(&w.bob).await;

    fs::remove_file(w.alice.join("drop.md")).unwrap();
    let alice = w.sync(&w.alice).await;
    assert_eq!(alice.removed_remote, 1);

    let bob = w.sync(&w.bob).await;
    assert_eq!(bob.removed_local, 1);
    assert!(!w.bob.join("drop.md").exists());
    assert_eq!(tree(&w.bob), BTreeMap::from([("keep.md".to_string(), "k".to_string())]));
}

#[tokio::test]
async fn outside_commits_are_pulled() {
    let w = World::new();
    commit_files(
        &w.repo(),
        "main",
        &[("from-elsewhere.md", Some("hello")), ("nested/x.md", Some("x"))],
        "outside writer",
    );

    let report = w
        .reconciler(&w.alice, SyncStrategy::Pull)
        .run()
        .await
        .unwrap();

    assert_eq!(report.downloaded, 2);
    assert_eq!(read(&w.alice, "nested/x.md"), "x");
    assert!(w.alice.join(".replica/checkpoint.toml").exists());
}

#[tokio::test]
async fn push_leaves_local_untouched() {
    let w = World::new();
    commit_files(&w.repo(), "main", &[("remote-only.md", Some("r"))], "seed");
    write(&w.alice, "local.md", "l");

    let report = w
        .reconciler(&w.alice, SyncStrategy::Push)
        .run()
        .await
        .unwrap();

    assert_eq!(report.uploaded, 1);
    assert!(!w.alice.join("remote-only.md").exists());
    assert_eq!(
        w.remote_files(),
        BTreeMap::from([
            ("local.md".to_string(), "l".to_string()),
            ("remote-only.md".to_string(), "r".to_string()),
        ])
    );
}
