//! Three-way text merging for Replica Sync
//!
//! Given the common ancestor of a file and two divergent versions, produce
//! a merged text when the two sides edited disjoint regions, or report a
//! conflict when they touched the same region differently.

pub mod decode;
mod edit;
pub mod error;
pub mod merge;

pub use decode::{decode_text, is_binary};
pub use error::{Error, Result};
pub use merge::{Granularity, MergeOutcome, merge, merge_bytes, merge_with};
