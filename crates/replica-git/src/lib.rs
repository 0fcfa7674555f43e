//! Git-backed remote replica for Replica Sync
//!
//! [`GitRemote`] implements [`replica_core::RemoteRepository`] over a bare
//! repository on disk. Blob ids double as content hashes, so remote
//! listings compare directly against [`replica_fs::blob_hash`] of local
//! files.

pub mod error;
pub mod ops;
mod remote;

pub use error::{Error, Result};
pub use ops::Author;
pub use remote::GitRemote;
