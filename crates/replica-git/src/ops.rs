//! Synchronous git2 operations behind [`crate::GitRemote`]
//!
//! Revisions are full commit ids. The all-zero id stands for an unborn
//! branch: an empty tree with no history.

use std::path::Path;

use git2::build::TreeUpdateBuilder;
use git2::{
    Commit, Delta, DiffOptions, ErrorCode, FileMode, ObjectType, Oid, Repository, Signature, Tree,
    TreeWalkMode, TreeWalkResult,
};

use replica_core::{ChangeRecord, EntryKind, FileAddition, RemoteEntry};

use crate::{Error, Result};

/// Revision of a branch with no commits.
pub fn unborn() -> String {
    Oid::zero().to_string()
}

fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

fn parse_revision(revision: &str) -> Result<Option<Oid>> {
    let oid = Oid::from_str(revision).map_err(|_| Error::InvalidRevision {
        revision: revision.to_string(),
    })?;
    Ok((!oid.is_zero()).then_some(oid))
}

/// Tree at `revision`, or `None` for the unborn revision.
fn tree_at<'r>(repo: &'r Repository, revision: &str) -> Result<Option<Tree<'r>>> {
    let Some(oid) = parse_revision(revision)? else {
        return Ok(None);
    };
    let commit = repo.find_commit(oid).map_err(|_| Error::InvalidRevision {
        revision: revision.to_string(),
    })?;
    Ok(Some(commit.tree()?))
}

/// Tip of `branch`, or `None` when the branch has no commits.
pub fn branch_tip(repo: &Repository, branch: &str) -> Result<Option<Oid>> {
    match repo.find_reference(&branch_ref(branch)) {
        Ok(reference) => Ok(Some(reference.peel_to_commit()?.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn head_revision(repo: &Repository, branch: &str) -> Result<String> {
    Ok(branch_tip(repo, branch)?.map_or_else(unborn, |oid| oid.to_string()))
}

/// Every blob and subtree at `revision`, with slash-separated paths.
pub fn list_files_at(repo: &Repository, revision: &str) -> Result<Vec<RemoteEntry>> {
    let Some(tree) = tree_at(repo, revision)? else {
        return Ok(Vec::new());
    };

    let mut found: Vec<(String, Oid, EntryKind)> = Vec::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        let Some(name) = entry.name() else {
            return TreeWalkResult::Skip;
        };
        let path = format!("{root}{name}");
        match entry.kind() {
            Some(ObjectType::Blob) => found.push((path, entry.id(), EntryKind::File)),
            Some(ObjectType::Tree) => found.push((path, entry.id(), EntryKind::Dir)),
            // Submodule links carry no content
            _ => {}
        }
        TreeWalkResult::Ok
    })?;

    let odb = repo.odb()?;
    found
        .into_iter()
        .map(|(path, oid, kind)| -> Result<RemoteEntry> {
            let byte_size = match kind {
                EntryKind::File => odb.read_header(oid)?.0 as u64,
                EntryKind::Dir => 0,
            };
            Ok(RemoteEntry {
                path,
                content_hash: oid.to_string(),
                byte_size,
                kind,
            })
        })
        .collect()
}

pub fn read_file_content(repo: &Repository, revision: &str, path: &str) -> Result<Vec<u8>> {
    let missing = || Error::FileNotFound {
        revision: revision.to_string(),
        path: path.to_string(),
    };

    let tree = tree_at(repo, revision)?.ok_or_else(missing)?;
    let entry = match tree.get_path(Path::new(path)) {
        Ok(entry) => entry,
        Err(e) if e.code() == ErrorCode::NotFound => return Err(missing()),
        Err(e) => return Err(e.into()),
    };
    if entry.kind() != Some(ObjectType::Blob) {
        return Err(missing());
    }
    Ok(repo.find_blob(entry.id())?.content().to_vec())
}

/// Files added, modified or removed between two revisions.
pub fn changes_since(repo: &Repository, base: &str, revision: &str) -> Result<Vec<ChangeRecord>> {
    let old = tree_at(repo, base)?;
    let new = tree_at(repo, revision)?;

    let mut opts = DiffOptions::new();
    opts.include_typechange(true);
    let diff = repo.diff_tree_to_tree(old.as_ref(), new.as_ref(), Some(&mut opts))?;

    let mut changes = Vec::new();
    for delta in diff.deltas() {
        let path = |file: git2::DiffFile<'_>| {
            file.path()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        };
        let record = match delta.status() {
            Delta::Added => path(delta.new_file()).map(ChangeRecord::added),
            Delta::Deleted => path(delta.old_file()).map(ChangeRecord::removed),
            Delta::Modified | Delta::Typechange => path(delta.new_file()).map(ChangeRecord::modified),
            _ => None,
        };
        changes.extend(record);
    }
    Ok(changes)
}

/// Identity recorded on commits.
#[derive(Debug, Clone)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// Write one commit on `branch` and move the branch to it.
///
/// The branch only moves if it still points at `expected_head`; otherwise
/// the new commit is left dangling and a stale-head error returned.
pub fn commit_atomically(
    repo: &Repository,
    branch: &str,
    expected_head: &str,
    additions: &[FileAddition],
    deletions: &[String],
    message: &str,
    author: &Author,
) -> Result<String> {
    let refname = branch_ref(branch);
    let expected = parse_revision(expected_head)?;
    let stale = |actual: Option<Oid>| Error::StaleHead {
        branch: branch.to_string(),
        expected: expected_head.to_string(),
        actual: actual.map_or_else(unborn, |oid| oid.to_string()),
    };

    let current = branch_tip(repo, branch)?;
    if current != expected {
        return Err(stale(current));
    }

    let parent: Option<Commit<'_>> = expected.map(|oid| repo.find_commit(oid)).transpose()?;
    let baseline = match &parent {
        Some(commit) => commit.tree()?,
        None => repo.find_tree(repo.treebuilder(None)?.write()?)?,
    };

    let mut update = TreeUpdateBuilder::new();
    for addition in additions {
        let blob = repo.blob(&addition.content)?;
        update.upsert(addition.path.as_str(), blob, FileMode::Blob);
    }
    for path in deletions {
        update.remove(path.as_str());
    }
    let tree = repo.find_tree(update.create(repo, &baseline)?)?;

    let signature = Signature::now(&author.name, &author.email)?;
    let parents: Vec<&Commit<'_>> = parent.iter().collect();
    let oid = repo.commit(None, &signature, &signature, message, &tree, &parents)?;

    let moved = match expected {
        Some(old) => repo.reference_matching(&refname, oid, true, old, message),
        None => repo.reference(&refname, oid, false, message),
    };
    if let Err(e) = moved {
        let actual = branch_tip(repo, branch)?;
        if actual != expected {
            return Err(stale(actual));
        }
        return Err(e.into());
    }

    // A fresh bare repository points HEAD at its default branch name
    if repo.head().is_err() {
        repo.set_head(&refname)?;
    }

    tracing::debug!(
        commit = %oid,
        added = additions.len(),
        deleted = deletions.len(),
        "Committed"
    );
    Ok(oid.to_string())
}
