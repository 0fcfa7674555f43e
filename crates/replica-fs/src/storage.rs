//! Local replica storage
//!
//! The reconciliation engine only needs a handful of operations from the
//! local side: enumerate files with their modification times, read, write,
//! remove and check existence. [`LocalStorage`] captures that surface;
//! [`DirStorage`] implements it over a directory and [`MemoryStorage`]
//! keeps everything in memory.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use walkdir::{DirEntry, WalkDir};

use crate::{Error, NormalizedPath, Result, io, normalize_relative};

/// Directories that never take part in a sync.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[".git", ".replica"];

/// A file in the local replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Slash-separated path relative to the replica root
    pub path: String,
    /// Last modification time
    pub mtime: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// Storage operations consumed from the local replica.
///
/// Paths are always slash-separated and relative to the replica root.
pub trait LocalStorage: Send + Sync {
    /// List every file in the replica.
    fn list_files(&self) -> Result<Vec<FileEntry>>;

    /// Read the full contents of a file.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or replace a file, creating parent directories as needed.
    fn write_bytes(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Remove a file. Removing a missing file is not an error.
    fn remove(&self, path: &str) -> Result<()>;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &str) -> bool;
}

/// [`LocalStorage`] over a directory on disk.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: NormalizedPath,
    excluded: Vec<String>,
}

impl DirStorage {
    /// Create storage rooted at `root`, skipping [`DEFAULT_EXCLUDED_DIRS`].
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: root.into(),
            excluded: DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Skip an additional top-level directory during listing.
    pub fn with_excluded(mut self, dir: impl Into<String>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<NormalizedPath> {
        Ok(self.root.join(&normalize_relative(path)?))
    }

    /// Whether a walk entry is an excluded top-level directory.
    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() == 1
            && entry.file_type().is_dir()
            && self
                .excluded
                .iter()
                .any(|d| entry.file_name().to_str() == Some(d.as_str()))
    }

    fn walk(&self) -> Result<Vec<FileEntry>> {
        let root = self.root.to_native();
        let mut out = Vec::new();

        for entry in WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e))
        {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| root.clone(), Path::to_path_buf);
                Error::io(path, e.into())
            })?;

            let rel = relative_slash_path(&root, entry.path());
            if entry.file_type().is_dir() {
                continue;
            }
            if !entry.file_type().is_file() {
                tracing::debug!(path = %rel, "Skipping non-regular file");
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| Error::io(entry.path(), e.into()))?;
            let mtime = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .map_err(|e| Error::io(entry.path(), e))?;
            out.push(FileEntry {
                path: rel,
                mtime,
                size: metadata.len(),
            });
        }

        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    /// Remove now-empty directories between `path` and the root.
    fn prune_empty_parents(&self, path: &NormalizedPath) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_str().len() <= self.root.as_str().trim_end_matches('/').len() {
                break;
            }
            if fs::remove_dir(dir.to_native()).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

/// `path` relative to `root`, slash-separated.
fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl LocalStorage for DirStorage {
    fn list_files(&self) -> Result<Vec<FileEntry>> {
        self.walk()
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        io::read_bytes(&self.resolve(path)?)
    }

    fn write_bytes(&self, path: &str, content: &[u8]) -> Result<()> {
        io::write_atomic(&self.resolve(path)?, content)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(target.to_native()) {
            Ok(()) => {
                self.prune_empty_parents(&target);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(target.to_native(), e)),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.to_native().is_file()).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: Vec<u8>,
    mtime: DateTime<Utc>,
}

/// [`LocalStorage`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, MemoryFile>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file stamped with the current time.
    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content, Utc::now());
        self
    }

    /// Add or replace a file with an explicit modification time.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>, mtime: DateTime<Utc>) {
        self.files().insert(
            path.to_string(),
            MemoryFile {
                content: content.into(),
                mtime,
            },
        );
    }

    /// Snapshot of all files and their contents.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.files()
            .iter()
            .map(|(path, file)| (path.clone(), file.content.clone()))
            .collect()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<String, MemoryFile>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LocalStorage for MemoryStorage {
    fn list_files(&self) -> Result<Vec<FileEntry>> {
        Ok(self
            .files()
            .iter()
            .map(|(path, file)| FileEntry {
                path: path.clone(),
                mtime: file.mtime,
                size: file.content.len() as u64,
            })
            .collect())
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.files()
            .get(path)
            .map(|f| f.content.clone())
            .ok_or_else(|| Error::NotFound {
                path: path.to_string(),
            })
    }

    fn write_bytes(&self, path: &str, content: &[u8]) -> Result<()> {
        self.insert(path, content.to_vec(), Utc::now());
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.files().remove(path);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files().contains_key(path)
    }
}
