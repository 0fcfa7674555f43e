//! Error types for replica-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from replica-core
    #[error(transparent)]
    Core(#[from] replica_core::Error),

    /// Error from replica-fs
    #[error(transparent)]
    Fs(#[from] replica_fs::Error),

    /// Error from replica-git
    #[error(transparent)]
    Git(#[from] replica_git::Error),

    /// Error from replica-merge
    #[error(transparent)]
    Merge(#[from] replica_merge::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The merge found overlapping edits
    #[error("merge conflict: ours changed {ours:?}, theirs changed {theirs:?}")]
    Conflict {
        ours: std::ops::Range<usize>,
        theirs: std::ops::Range<usize>,
    },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
