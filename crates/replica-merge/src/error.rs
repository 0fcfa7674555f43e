//! Error types for replica-merge

/// Result type for replica-merge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in replica-merge operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Content could not be treated as text
    #[error("Cannot merge {side} version: {reason}")]
    Decode { side: &'static str, reason: String },
}
