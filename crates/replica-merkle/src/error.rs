//! Error types for replica-merkle

/// Result type for replica-merkle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a tree
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Path '{path}' appears more than once")]
    DuplicatePath { path: String },

    #[error("Path '{path}' is used both as a file and as a directory")]
    PathConflict { path: String },

    #[error("Failed to hash '{path}': {source}")]
    Hash {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Fs(#[from] replica_fs::Error),
}
