//! Filesystem abstraction for Replica Sync
//!
//! Provides slash-normalized path handling, git-compatible content hashing,
//! safe I/O operations and the local storage adapters consumed by the
//! reconciliation engine.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod storage;

pub use checksum::{blob_hash, digest_str};
pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use path::{NormalizedPath, normalize_relative};
pub use storage::{DirStorage, FileEntry, LocalStorage, MemoryStorage};
