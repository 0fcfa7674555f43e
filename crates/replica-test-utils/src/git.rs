//! Git remote fixtures.
//!
//! These talk to `git2` directly so tests can play the part of another
//! client writing to the same remote.

use std::collections::BTreeMap;
use std::path::Path;

use git2::build::TreeUpdateBuilder;
use git2::{FileMode, ObjectType, Oid, Repository, Signature, TreeWalkMode, TreeWalkResult};

/// Initialises an empty bare repository whose HEAD names `main`.
///
/// Realism level: **REAL** - valid object store, unborn branch.
///
/// # Panics
/// Panics if `git2::Repository::init_bare` fails.
pub fn bare_remote(path: &Path) -> Repository {
    let repo = Repository::init_bare(path).unwrap_or_else(|e| {
        panic!("bare_remote: failed to init at {}: {e}", path.display())
    });
    repo.set_head("refs/heads/main")
        .unwrap_or_else(|e| panic!("bare_remote: failed to point HEAD at main: {e}"));
    repo
}

/// Commits `changes` on top of `branch` as an outside writer would.
///
/// `None` content deletes the path. An unborn branch starts from an empty
/// tree.
///
/// Realism level: **REAL WITH HISTORY** - the branch moves to a new commit.
///
/// # Panics
/// Panics if any git operation fails.
pub fn commit_files(
    repo: &Repository,
    branch: &str,
    changes: &[(&str, Option<&str>)],
    message: &str,
) -> Oid {
    let refname = format!("refs/heads/{branch}");

    let parent = repo
        .find_reference(&refname)
        .ok()
        .map(|r| r.peel_to_commit().unwrap_or_else(|e| fail("peel branch", e)));
    let baseline = match &parent {
        Some(commit) => commit.tree().unwrap_or_else(|e| fail("parent tree", e)),
        None => {
            let empty = repo
                .treebuilder(None)
                .and_then(|b| b.write())
                .unwrap_or_else(|e| fail("empty tree", e));
            repo.find_tree(empty).unwrap_or_else(|e| fail("find empty tree", e))
        }
    };

    let mut update = TreeUpdateBuilder::new();
    for (path, content) in changes {
        match content {
            Some(text) => {
                let blob = repo
                    .blob(text.as_bytes())
                    .unwrap_or_else(|e| fail("write blob", e));
                update.upsert(*path, blob, FileMode::Blob);
            }
            None => {
                update.remove(*path);
            }
        }
    }
    let tree_id = update
        .create(repo, &baseline)
        .unwrap_or_else(|e| fail("build tree", e));
    let tree = repo.find_tree(tree_id).unwrap_or_else(|e| fail("find tree", e));

    let signature = Signature::now("Test User", "test@test.com")
        .unwrap_or_else(|e| fail("signature", e));
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(
        Some(&refname),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )
    .unwrap_or_else(|e| fail("commit", e))
}

fn fail<T>(step: &str, e: git2::Error) -> T {
    panic!("commit_files: {step}: {e}")
}

/// Text content of every file at the tip of `branch`.
///
/// Returns an empty map for an unborn branch.
///
/// # Panics
/// Panics if the repository cannot be read.
pub fn branch_files(repo: &Repository, branch: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    let Ok(reference) = repo.find_reference(&format!("refs/heads/{branch}")) else {
        return files;
    };
    let tree = reference
        .peel_to_commit()
        .and_then(|c| c.tree())
        .unwrap_or_else(|e| panic!("branch_files: failed to read {branch}: {e}"));

    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            let blob = repo
                .find_blob(entry.id())
                .unwrap_or_else(|e| panic!("branch_files: missing blob: {e}"));
            let name = entry.name().unwrap_or_default();
            files.insert(
                format!("{root}{name}"),
                String::from_utf8_lossy(blob.content()).into_owned(),
            );
        }
        TreeWalkResult::Ok
    })
    .unwrap_or_else(|e| panic!("branch_files: tree walk failed: {e}"));
    files
}

/// Number of commits reachable from `branch`.
///
/// # Panics
/// Panics if the history cannot be walked.
pub fn commit_count(repo: &Repository, branch: &str) -> usize {
    let Ok(reference) = repo.find_reference(&format!("refs/heads/{branch}")) else {
        return 0;
    };
    let tip = reference
        .target()
        .unwrap_or_else(|| panic!("commit_count: {branch} is symbolic"));
    let mut walk = repo
        .revwalk()
        .unwrap_or_else(|e| panic!("commit_count: revwalk: {e}"));
    walk.push(tip)
        .unwrap_or_else(|e| panic!("commit_count: push tip: {e}"));
    walk.count()
}
