//! Ignore filtering
//!
//! Paths rejected by the filter never reach the differ or the resolver.

/// Decides which paths take part in a sync.
pub trait PathFilter: Send + Sync {
    fn accepts(&self, path: &str) -> bool;

    /// Keep only accepted paths, preserving order.
    fn filter(&self, paths: Vec<String>) -> Vec<String> {
        paths.into_iter().filter(|p| self.accepts(p)).collect()
    }
}

/// Filter that lets everything through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PathFilter for AcceptAll {
    fn accepts(&self, _path: &str) -> bool {
        true
    }
}

impl<F> PathFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accepts(&self, path: &str) -> bool {
        self(path)
    }
}
