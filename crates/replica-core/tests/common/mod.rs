//! Shared fakes for replica-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use replica_core::{
    ChangeRecord, Error, FileAddition, RemoteEntry, RemoteRepository, Result,
};
use replica_fs::{MemoryStorage, blob_hash};

type Snapshot = BTreeMap<String, Vec<u8>>;

#[derive(Default)]
struct State {
    /// Every snapshot ever committed; the revision id is `rev-{index}`
    history: Vec<Snapshot>,
    head: usize,
    offline: bool,
    /// Another writer commits just before our next commit lands
    race_next_commit: bool,
    /// Paths whose content reads fail
    unreadable: BTreeSet<String>,
    commits: usize,
}

/// In-memory versioned remote with a single branch.
pub struct MemoryRemote {
    state: Mutex<State>,
}

fn rev(index: usize) -> String {
    format!("rev-{index}")
}

fn parse_rev(revision: &str) -> Result<usize> {
    revision
        .strip_prefix("rev-")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| Error::transport(format!("unknown revision {revision}")))
}

impl MemoryRemote {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let snapshot = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
            .collect();
        Self {
            state: Mutex::new(State {
                history: vec![snapshot],
                ..State::default()
            }),
        }
    }

    /// Commit from another client. `None` deletes the path.
    pub fn push(&self, changes: &[(&str, Option<&str>)]) -> String {
        let mut state = self.state.lock().unwrap();
        let mut next = state.history[state.head].clone();
        for (path, content) in changes {
            match content {
                Some(c) => next.insert(path.to_string(), c.as_bytes().to_vec()),
                None => next.remove(*path),
            };
        }
        state.history.push(next);
        state.head = state.history.len() - 1;
        rev(state.head)
    }

    pub fn files(&self) -> BTreeMap<String, String> {
        let state = self.state.lock().unwrap();
        state.history[state.head]
            .iter()
            .map(|(p, c)| (p.clone(), String::from_utf8_lossy(c).into_owned()))
            .collect()
    }

    pub fn head(&self) -> String {
        rev(self.state.lock().unwrap().head)
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Make reads of `path` fail until called again with `false`.
    pub fn set_unreadable(&self, path: &str, unreadable: bool) {
        let mut state = self.state.lock().unwrap();
        if unreadable {
            state.unreadable.insert(path.to_string());
        } else {
            state.unreadable.remove(path);
        }
    }

    pub fn race_next_commit(&self) {
        self.state.lock().unwrap().race_next_commit = true;
    }

    /// Commits made through `commit_atomically`.
    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    fn snapshot(&self, revision: &str) -> Result<Snapshot> {
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(Error::transport("remote unreachable"));
        }
        let index = parse_rev(revision)?;
        state
            .history
            .get(index)
            .cloned()
            .ok_or_else(|| Error::transport(format!("unknown revision {revision}")))
    }
}

#[async_trait]
impl RemoteRepository for MemoryRemote {
    async fn head_revision(&self, _branch: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(Error::transport("remote unreachable"));
        }
        Ok(rev(state.head))
    }

    async fn list_files_at(&self, revision: &str) -> Result<Vec<RemoteEntry>> {
        Ok(self
            .snapshot(revision)?
            .iter()
            .map(|(path, content)| RemoteEntry::file(path, blob_hash(content), content.len() as u64))
            .collect())
    }

    async fn read_file_content(&self, revision: &str, path: &str) -> Result<Vec<u8>> {
        if self.state.lock().unwrap().unreadable.contains(path) {
            return Err(Error::transport(format!("read of {path} interrupted")));
        }
        self.snapshot(revision)?
            .remove(path)
            .ok_or_else(|| Error::MissingRemoteFile {
                revision: revision.to_string(),
                path: path.to_string(),
            })
    }

    async fn changes_since(&self, base: &str, revision: &str) -> Result<Vec<ChangeRecord>> {
        let old = self.snapshot(base)?;
        let new = self.snapshot(revision)?;
        let mut changes = Vec::new();
        for (path, content) in &new {
            match old.get(path) {
                None => changes.push(ChangeRecord::added(path)),
                Some(previous) if previous != content => changes.push(ChangeRecord::modified(path)),
                Some(_) => {}
            }
        }
        for path in old.keys() {
            if !new.contains_key(path) {
                changes.push(ChangeRecord::removed(path));
            }
        }
        Ok(changes)
    }

    async fn commit_atomically(
        &self,
        branch: &str,
        expected_head: &str,
        additions: Vec<FileAddition>,
        deletions: Vec<String>,
        _message: &str,
    ) -> Result<String> {
        if std::mem::take(&mut self.state.lock().unwrap().race_next_commit) {
            self.push(&[("raced.md", Some("someone else"))]);
        }

        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(Error::transport("remote unreachable"));
        }
        let actual = rev(state.head);
        if actual != expected_head {
            return Err(Error::StaleHead {
                branch: branch.to_string(),
                expected: expected_head.to_string(),
                actual,
            });
        }

        let mut next = state.history[state.head].clone();
        for addition in additions {
            next.insert(addition.path, addition.content);
        }
        for path in deletions {
            next.remove(&path);
        }
        state.history.push(next);
        state.head = state.history.len() - 1;
        state.commits += 1;
        Ok(rev(state.head))
    }
}

/// Local storage seeded with files stamped at `mtime`.
pub fn local_files(files: &[(&str, &str)], mtime: DateTime<Utc>) -> MemoryStorage {
    let storage = MemoryStorage::new();
    for (path, content) in files {
        storage.insert(path, *content, mtime);
    }
    storage
}

/// Text view of a storage snapshot.
pub fn text_of(storage: &MemoryStorage) -> BTreeMap<String, String> {
    storage
        .snapshot()
        .into_iter()
        .map(|(p, c)| (p, String::from_utf8_lossy(&c).into_owned()))
        .collect()
}
