//! Content fingerprints
//!
//! File content is fingerprinted the way git addresses blobs, so a file that
//! is byte-identical on the local replica and in the remote repository gets
//! the same hash without transferring it. Everything else (directory
//! summaries) uses plain SHA-256.

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Compute the git blob hash of `content`.
///
/// This is SHA-1 over the header `"blob <len>\0"` followed by the raw
/// bytes, rendered as 40 lowercase hex characters. It equals the object id
/// git assigns to the same content.
pub fn blob_hash(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 digest of string content as lowercase hex.
pub fn digest_str(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
