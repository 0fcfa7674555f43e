//! [`RemoteRepository`] over a git repository on disk

use async_trait::async_trait;
use git2::Repository;
use std::path::{Path, PathBuf};

use replica_core::{ChangeRecord, FileAddition, RemoteEntry, RemoteRepository};

use crate::ops::{self, Author};
use crate::{Error, Result};

const DEFAULT_AUTHOR_NAME: &str = "replica";
const DEFAULT_AUTHOR_EMAIL: &str = "replica@localhost";

/// A git repository used as the remote replica.
///
/// Meant for bare repositories: commits move branch references directly
/// and never touch a working tree. The repository is reopened for every
/// call, so several processes can share it.
#[derive(Debug, Clone)]
pub struct GitRemote {
    path: PathBuf,
    author: Author,
}

impl GitRemote {
    /// Use the existing repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepositoryNotFound`] if no repository lives there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        Repository::open(&path).map_err(|_| Error::RepositoryNotFound { path: path.clone() })?;
        Ok(Self::unchecked(path))
    }

    /// Open the repository at `path`, creating a bare one if none exists.
    pub fn open_or_init(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if Repository::open(&path).is_err() {
            tracing::info!(path = %path.display(), "Initializing bare remote repository");
            Repository::init_bare(&path)?;
        }
        Ok(Self::unchecked(path))
    }

    fn unchecked(path: PathBuf) -> Self {
        Self {
            path,
            author: Author {
                name: DEFAULT_AUTHOR_NAME.to_string(),
                email: DEFAULT_AUTHOR_EMAIL.to_string(),
            },
        }
    }

    /// Record commits under a different identity.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author = Author {
            name: name.into(),
            email: email.into(),
        };
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` against a freshly opened repository on the blocking pool.
    async fn with_repo<T, F>(&self, op: F) -> replica_core::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Repository) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let repo = Repository::open(&path).map_err(|_| Error::RepositoryNotFound { path })?;
            op(&repo)
        })
        .await;

        match joined {
            Ok(result) => result.map_err(Into::into),
            Err(e) => Err(Error::Task {
                message: e.to_string(),
            }
            .into()),
        }
    }
}

#[async_trait]
impl RemoteRepository for GitRemote {
    async fn head_revision(&self, branch: &str) -> replica_core::Result<String> {
        let branch = branch.to_string();
        self.with_repo(move |repo| ops::head_revision(repo, &branch)).await
    }

    async fn list_files_at(&self, revision: &str) -> replica_core::Result<Vec<RemoteEntry>> {
        let revision = revision.to_string();
        self.with_repo(move |repo| ops::list_files_at(repo, &revision)).await
    }

    async fn read_file_content(&self, revision: &str, path: &str) -> replica_core::Result<Vec<u8>> {
        let (revision, path) = (revision.to_string(), path.to_string());
        self.with_repo(move |repo| ops::read_file_content(repo, &revision, &path))
            .await
    }

    async fn changes_since(
        &self,
        base: &str,
        revision: &str,
    ) -> replica_core::Result<Vec<ChangeRecord>> {
        let (base, revision) = (base.to_string(), revision.to_string());
        self.with_repo(move |repo| ops::changes_since(repo, &base, &revision))
            .await
    }

    async fn commit_atomically(
        &self,
        branch: &str,
        expected_head: &str,
        additions: Vec<FileAddition>,
        deletions: Vec<String>,
        message: &str,
    ) -> replica_core::Result<String> {
        let (branch, expected_head, message) = (
            branch.to_string(),
            expected_head.to_string(),
            message.to_string(),
        );
        let author = self.author.clone();
        self.with_repo(move |repo| {
            ops::commit_atomically(
                repo,
                &branch,
                &expected_head,
                &additions,
                &deletions,
                &message,
                &author,
            )
        })
        .await
    }
}
