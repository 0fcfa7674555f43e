//! Content-addressed Merkle trees for Replica Sync
//!
//! A replica snapshot (a flat list of paths plus a way to fingerprint each
//! file) is folded into a [`MerkleNode`] tree whose root hash summarizes the
//! whole replica. Two trees can then be compared with [`diff`], which skips
//! every subtree whose hash matches on both sides.

pub mod builder;
pub mod diff;
pub mod error;
pub mod node;

pub use builder::{build_tree, dir_hash};
pub use diff::{Differences, diff};
pub use error::{Error, Result};
pub use node::MerkleNode;
