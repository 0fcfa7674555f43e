//! Merkle tree nodes

use std::collections::BTreeMap;

/// A node of a replica Merkle tree.
///
/// Paths are full slash-separated paths from the tree root; the root itself
/// has the empty path. Directory children are keyed by their full path, so
/// iteration always yields them in path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerkleNode {
    /// A file; `hash` is the content fingerprint supplied at build time.
    File { path: String, hash: String },
    /// A directory; `hash` is derived from the children's paths and hashes.
    Dir {
        path: String,
        hash: String,
        children: BTreeMap<String, MerkleNode>,
    },
}

impl MerkleNode {
    pub fn path(&self) -> &str {
        match self {
            Self::File { path, .. } | Self::Dir { path, .. } => path,
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            Self::File { hash, .. } | Self::Dir { hash, .. } => hash,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir { .. })
    }

    /// Direct children in path order. Files have none.
    pub fn children(&self) -> impl Iterator<Item = &MerkleNode> {
        let children = match self {
            Self::Dir { children, .. } => Some(children.values()),
            Self::File { .. } => None,
        };
        children.into_iter().flatten()
    }

    /// Look up a direct child by its full path.
    pub fn child(&self, path: &str) -> Option<&MerkleNode> {
        match self {
            Self::Dir { children, .. } => children.get(path),
            Self::File { .. } => None,
        }
    }

    /// Find a node anywhere beneath (or at) this one by full path.
    pub fn find(&self, path: &str) -> Option<&MerkleNode> {
        if self.path() == path {
            return Some(self);
        }
        self.children()
            .find(|child| {
                let child_path = child.path();
                path == child_path
                    || (path.starts_with(child_path)
                        && path.as_bytes().get(child_path.len()) == Some(&b'/'))
            })
            .and_then(|child| child.find(path))
    }

    /// Every file path beneath this node, in path order.
    pub fn file_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    /// Number of files beneath this node.
    pub fn file_count(&self) -> usize {
        match self {
            Self::File { .. } => 1,
            Self::Dir { children, .. } => children.values().map(MerkleNode::file_count).sum(),
        }
    }

    pub(crate) fn collect_files(&self, out: &mut Vec<String>) {
        match self {
            Self::File { path, .. } => out.push(path.clone()),
            Self::Dir { children, .. } => {
                for child in children.values() {
                    child.collect_files(out);
                }
            }
        }
    }
}
