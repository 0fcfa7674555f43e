//! Error types for replica-core

use std::path::PathBuf;

/// Result type for replica-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in replica-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote host could not be reached or refused the request
    #[error("Remote transport error: {message}")]
    Transport { message: String },

    /// The branch moved between planning and committing
    #[error("Branch {branch} moved: expected {expected}, found {actual}")]
    StaleHead {
        branch: String,
        expected: String,
        actual: String,
    },

    /// A replica could not be listed
    #[error("Failed to enumerate {side} replica: {message}")]
    Enumeration { side: &'static str, message: String },

    /// File absent from the remote at a revision
    #[error("{path} does not exist at {revision}")]
    MissingRemoteFile { revision: String, path: String },

    /// Checkpoint could not be read or written
    #[error("Checkpoint error at {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// Invalid sync configuration
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// A background task panicked or was cancelled
    #[error("Background task failed: {message}")]
    Task { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from replica-fs
    #[error(transparent)]
    Fs(#[from] replica_fs::Error),

    /// Tree error from replica-merkle
    #[error(transparent)]
    Merkle(#[from] replica_merkle::Error),

    /// Merge error from replica-merge
    #[error(transparent)]
    Merge(#[from] replica_merge::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Whether running the same pass again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleHead { .. })
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task {
            message: e.to_string(),
        }
    }
}
