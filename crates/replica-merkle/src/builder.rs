//! Tree construction
//!
//! Paths are inserted shallowest first so every directory exists before its
//! children attach. Hashes are then filled in bottom-up: a file asks the
//! caller for its fingerprint exactly once, a directory digests its sorted
//! children once they are all known.

use std::collections::BTreeMap;

use replica_fs::{digest_str, normalize_relative};

use crate::node::MerkleNode;
use crate::{Error, Result};

/// Separator between `"{path}:{hash}"` entries in a directory digest.
const ENTRY_SEPARATOR: &str = "\n";

enum Pending {
    File,
    Dir(BTreeMap<String, Pending>),
}

/// Build a tree from a list of distinct relative paths.
///
/// `hash_of` is called once per file path. The returned root is always a
/// directory with the empty path; an empty path list produces a childless
/// root whose hash is the digest of the empty string.
///
/// # Errors
///
/// Fails on invalid or duplicate paths, on a path used both as file and
/// directory, and when `hash_of` fails.
pub fn build_tree<I, S, F, E>(paths: I, mut hash_of: F) -> Result<MerkleNode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(&str) -> std::result::Result<String, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut normalized = paths
        .into_iter()
        .map(|p| normalize_relative(p.as_ref()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    normalized.sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));

    let mut root = BTreeMap::new();
    for path in &normalized {
        insert(&mut root, path)?;
    }

    let children = finalize_children(root, &mut hash_of)?;
    let hash = dir_hash(&children);
    tracing::debug!(files = normalized.len(), root = %hash, "Built merkle tree");

    Ok(MerkleNode::Dir {
        path: String::new(),
        hash,
        children,
    })
}

/// Digest of a directory's children.
///
/// SHA-256 over the `"{childPath}:{childHash}"` entries in path order,
/// joined by a newline.
pub fn dir_hash(children: &BTreeMap<String, MerkleNode>) -> String {
    let entries: Vec<String> = children
        .values()
        .map(|child| format!("{}:{}", child.path(), child.hash()))
        .collect();
    digest_str(&entries.join(ENTRY_SEPARATOR))
}

fn depth(path: &str) -> usize {
    path.matches('/').count()
}

fn insert(root: &mut BTreeMap<String, Pending>, path: &str) -> Result<()> {
    let segments: Vec<&str> = path.split('/').collect();
    let mut level = root;
    let mut prefix = String::new();

    for (i, segment) in segments.iter().enumerate() {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);

        let is_last = i + 1 == segments.len();
        if is_last {
            return match level.get(&prefix) {
                Some(Pending::File) => Err(Error::DuplicatePath { path: prefix }),
                Some(Pending::Dir(_)) => Err(Error::PathConflict { path: prefix }),
                None => {
                    level.insert(prefix, Pending::File);
                    Ok(())
                }
            };
        }

        let entry = level
            .entry(prefix.clone())
            .or_insert_with(|| Pending::Dir(BTreeMap::new()));
        level = match entry {
            Pending::Dir(children) => children,
            Pending::File => return Err(Error::PathConflict { path: prefix }),
        };
    }

    Ok(())
}

fn finalize_children<F, E>(
    pending: BTreeMap<String, Pending>,
    hash_of: &mut F,
) -> Result<BTreeMap<String, MerkleNode>>
where
    F: FnMut(&str) -> std::result::Result<String, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut children = BTreeMap::new();

    for (path, node) in pending {
        let finished = match node {
            Pending::File => {
                let hash = hash_of(&path).map_err(|e| Error::Hash {
                    path: path.clone(),
                    source: Box::new(e),
                })?;
                MerkleNode::File {
                    path: path.clone(),
                    hash,
                }
            }
            Pending::Dir(grandchildren) => {
                let grandchildren = finalize_children(grandchildren, hash_of)?;
                MerkleNode::Dir {
                    path: path.clone(),
                    hash: dir_hash(&grandchildren),
                    children: grandchildren,
                }
            }
        };
        children.insert(path, finished);
    }

    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::convert::Infallible;

    fn fixed(path: &str) -> std::result::Result<String, Infallible> {
        Ok(format!("hash-of-{path}"))
    }

    #[test]
    fn empty_tree_hashes_empty_string() {
        let root = build_tree(Vec::<String>::new(), fixed).unwrap();
        assert_eq!(root.path(), "");
        assert_eq!(root.children().count(), 0);
        assert_eq!(root.hash(), digest_str(""));
    }

    #[test]
    fn intermediate_directories_are_created() {
        let root = build_tree(["notes/daily/a.md", "b.md"], fixed).unwrap();

        let notes = root.child("notes").unwrap();
        assert!(notes.is_dir());
        let daily = notes.child("notes/daily").unwrap();
        assert_eq!(daily.child("notes/daily/a.md").unwrap().hash(), "hash-of-notes/daily/a.md");
        assert_eq!(root.file_paths(), vec!["b.md", "notes/daily/a.md"]);
    }

    #[test]
    fn directory_hash_covers_child_paths_and_hashes() {
        let root = build_tree(["d/x"], fixed).unwrap();
        let dir = root.child("d").unwrap();
        assert_eq!(dir.hash(), digest_str("d/x:hash-of-d/x"));
        assert_eq!(root.hash(), digest_str(&format!("d:{}", dir.hash())));
    }

    #[test]
    fn hash_of_is_called_once_per_file() {
        let mut calls: HashMap<String, usize> = HashMap::new();
        build_tree(["a", "b/c", "b/d"], |p: &str| {
            *calls.entry(p.to_string()).or_default() += 1;
            Ok::<_, Infallible>(p.to_string())
        })
        .unwrap();

        assert_eq!(calls.len(), 3);
        assert!(calls.values().all(|&n| n == 1));
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let err = build_tree(["a.md", "./a.md"], fixed).unwrap_err();
        assert!(matches!(err, Error::DuplicatePath { .. }));
    }

    #[test]
    fn file_directory_clash_is_rejected() {
        let err = build_tree(["a/b.md", "a"], fixed).unwrap_err();
        assert!(matches!(err, Error::PathConflict { path } if path == "a"));
    }

    #[test]
    fn hash_failures_carry_the_path() {
        let err = build_tree(["broken.md"], |_: &str| {
            Err(std::io::Error::other("unreadable"))
        })
        .unwrap_err();
        assert!(err.to_string().contains("broken.md"));
    }
}
