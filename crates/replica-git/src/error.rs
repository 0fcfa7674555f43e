//! Error types for replica-git

use std::path::PathBuf;

/// Result type for replica-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in replica-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] replica_fs::Error),

    #[error("No git repository at {path}")]
    RepositoryNotFound { path: PathBuf },

    #[error("Invalid revision '{revision}'")]
    InvalidRevision { revision: String },

    #[error("{path} does not exist at {revision}")]
    FileNotFound { revision: String, path: String },

    #[error("Branch {branch} moved: expected {expected}, found {actual}")]
    StaleHead {
        branch: String,
        expected: String,
        actual: String,
    },

    #[error("Background task failed: {message}")]
    Task { message: String },
}

impl From<Error> for replica_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::StaleHead {
                branch,
                expected,
                actual,
            } => Self::StaleHead {
                branch,
                expected,
                actual,
            },
            Error::FileNotFound { revision, path } => Self::MissingRemoteFile { revision, path },
            Error::Fs(e) => Self::Fs(e),
            other => Self::transport(other.to_string()),
        }
    }
}
