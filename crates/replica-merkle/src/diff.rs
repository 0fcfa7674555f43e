//! Structural comparison of two trees

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::node::MerkleNode;

/// Result of comparing a left tree with a right tree.
///
/// The three sets are disjoint. Only file paths appear in `only_left` and
/// `only_right`; `differing` may also hold a path that is a file on one side
/// and a directory on the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Differences {
    pub only_left: BTreeSet<String>,
    pub differing: BTreeSet<String>,
    pub only_right: BTreeSet<String>,
}

impl Differences {
    pub fn is_empty(&self) -> bool {
        self.only_left.is_empty() && self.differing.is_empty() && self.only_right.is_empty()
    }

    /// Total number of reported paths.
    pub fn len(&self) -> usize {
        self.only_left.len() + self.differing.len() + self.only_right.len()
    }

    /// Swap the roles of left and right.
    pub fn reversed(self) -> Self {
        Self {
            only_left: self.only_right,
            differing: self.differing,
            only_right: self.only_left,
        }
    }
}

/// Compare two trees.
///
/// Children are matched by exact path at each level. Subtrees whose hashes
/// match are skipped without descending; a renamed file therefore shows up
/// as one left-only and one right-only path.
pub fn diff(left: &MerkleNode, right: &MerkleNode) -> Differences {
    let mut out = Differences::default();
    if left.hash() != right.hash() {
        compare(left, right, &mut out);
    }
    tracing::debug!(
        only_left = out.only_left.len(),
        differing = out.differing.len(),
        only_right = out.only_right.len(),
        "Diffed merkle trees"
    );
    out
}

fn compare(left: &MerkleNode, right: &MerkleNode, out: &mut Differences) {
    match (left, right) {
        (
            MerkleNode::Dir {
                children: left_children,
                ..
            },
            MerkleNode::Dir {
                children: right_children,
                ..
            },
        ) => compare_children(left_children, right_children, out),
        _ => {
            out.differing.insert(left.path().to_string());
        }
    }
}

fn compare_children(
    left: &BTreeMap<String, MerkleNode>,
    right: &BTreeMap<String, MerkleNode>,
    out: &mut Differences,
) {
    for (path, left_child) in left {
        match right.get(path) {
            None => record_files(left_child, &mut out.only_left),
            Some(right_child) if right_child.hash() == left_child.hash() => {}
            Some(right_child) => compare(left_child, right_child, out),
        }
    }

    for (path, right_child) in right {
        if !left.contains_key(path) {
            record_files(right_child, &mut out.only_right);
        }
    }
}

/// Record every file beneath `node` as present on one side only.
fn record_files(node: &MerkleNode, set: &mut BTreeSet<String>) {
    let mut files = Vec::new();
    node.collect_files(&mut files);
    set.extend(files);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_tree;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::convert::Infallible;

    fn tree(files: &[(&str, &str)]) -> MerkleNode {
        let hashes: HashMap<&str, &str> = files.iter().copied().collect();
        build_tree(files.iter().map(|(p, _)| *p), |p: &str| {
            Ok::<_, Infallible>(hashes[p].to_string())
        })
        .unwrap()
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn identical_trees_have_no_differences() {
        let t = tree(&[("a.md", "1"), ("notes/b.md", "2")]);
        assert!(diff(&t, &t).is_empty());
    }

    #[test]
    fn classifies_left_right_and_differing() {
        let left = tree(&[("a.md", "1"), ("b.md", "2")]);
        let right = tree(&[("b.md", "changed"), ("c.md", "3")]);

        let d = diff(&left, &right);
        assert_eq!(d.only_left, set(&["a.md"]));
        assert_eq!(d.differing, set(&["b.md"]));
        assert_eq!(d.only_right, set(&["c.md"]));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn missing_directory_reports_every_leaf() {
        let left = tree(&[("notes/a.md", "1"), ("notes/deep/b.md", "2"), ("x.md", "3")]);
        let right = tree(&[("x.md", "3")]);

        let d = diff(&left, &right);
        assert_eq!(d.only_left, set(&["notes/a.md", "notes/deep/b.md"]));
        assert!(d.differing.is_empty());
        assert!(d.only_right.is_empty());
    }

    #[test]
    fn changed_leaf_is_found_inside_nested_directories() {
        let left = tree(&[("n/d/a.md", "1"), ("n/d/b.md", "2"), ("n/c.md", "3")]);
        let right = tree(&[("n/d/a.md", "1"), ("n/d/b.md", "X"), ("n/c.md", "3")]);

        let d = diff(&left, &right);
        assert_eq!(d.differing, set(&["n/d/b.md"]));
        assert!(d.only_left.is_empty() && d.only_right.is_empty());
    }

    #[test]
    fn file_replaced_by_directory_is_differing() {
        let left = tree(&[("a", "1")]);
        let right = tree(&[("a/b.md", "2")]);

        let d = diff(&left, &right);
        assert_eq!(d.differing, set(&["a"]));
        assert!(d.only_right.is_empty());
    }

    #[test]
    fn rename_is_not_detected() {
        let left = tree(&[("old.md", "same")]);
        let right = tree(&[("new.md", "same")]);

        let d = diff(&left, &right);
        assert_eq!(d.only_left, set(&["old.md"]));
        assert_eq!(d.only_right, set(&["new.md"]));
    }

    #[test]
    fn reversed_swaps_sides() {
        let d = Differences {
            only_left: set(&["a"]),
            differing: set(&["b"]),
            only_right: set(&["c"]),
        };
        let r = d.clone().reversed();
        assert_eq!(r.only_left, d.only_right);
        assert_eq!(r.only_right, d.only_left);
        assert_eq!(r.differing, d.differing);
    }
}
