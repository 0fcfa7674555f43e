//! Normalized path handling for cross-platform compatibility

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// An absolute or root-level location with forward-slash separators.
///
/// Replica roots and the files under them are carried in this form so the
/// same string can be hashed, logged and compared on every platform; it is
/// turned back into a [`PathBuf`] only when touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: path.as_ref().to_string_lossy().replace('\\', "/"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Platform-native form for I/O.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append a slash-separated replica path.
    pub fn join(&self, rel: &str) -> Self {
        let base = self.inner.trim_end_matches('/');
        let rel = rel.replace('\\', "/");
        Self {
            inner: format!("{base}/{}", rel.trim_start_matches('/')),
        }
    }

    /// Enclosing directory, `None` once nothing is left to strip.
    pub fn parent(&self) -> Option<Self> {
        let (dir, _) = self.inner.trim_end_matches('/').rsplit_once('/')?;
        let inner = if dir.is_empty() { "/" } else { dir };
        Some(Self {
            inner: inner.to_string(),
        })
    }

    /// Last segment.
    pub fn file_name(&self) -> Option<&str> {
        let name = self.inner.trim_end_matches('/').rsplit('/').next()?;
        (!name.is_empty()).then_some(name)
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Text after the last dot of the file name; dotfiles have none.
    pub fn extension(&self) -> Option<&str> {
        match self.file_name()?.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

impl<T: AsRef<Path>> From<&T> for NormalizedPath
where
    T: ?Sized,
{
    fn from(path: &T) -> Self {
        Self::new(path)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

/// Normalize a path relative to a replica root.
///
/// The result is slash-separated with no leading slash, no empty or `.`
/// segments. Parent traversal (`..`) is rejected so a replica path can
/// never escape its root.
pub fn normalize_relative(path: &str) -> Result<String> {
    let unified = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(Error::invalid_path(path, "parent traversal is not allowed"));
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(Error::invalid_path(path, "path is empty"));
    }

    Ok(segments.join("/"))
}
