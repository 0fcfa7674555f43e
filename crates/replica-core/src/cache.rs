//! Expiring listing caches
//!
//! Listings are the most expensive part of planning a pass. A short-lived
//! cache lets `status` followed by `sync` reuse them. Expiry is checked on
//! read; nothing runs in the background.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use replica_fs::FileEntry;

use crate::remote::RemoteEntry;

struct Slot<T> {
    key: String,
    stored_at: Instant,
    value: T,
}

/// Single-entry cache keyed by a string, expiring after a fixed window.
pub struct ListingCache<T> {
    ttl: Duration,
    slot: Mutex<Option<Slot<T>>>,
}

impl<T: Clone> ListingCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Cached value for `key`, if stored within the window.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(s) if s.key == key && s.stored_at.elapsed() < self.ttl => Some(s.value.clone()),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: impl Into<String>, value: T) {
        if self.ttl.is_zero() {
            return;
        }
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(Slot {
            key: key.into(),
            stored_at: Instant::now(),
            value,
        });
    }

    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl<T> std::fmt::Debug for ListingCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingCache").field("ttl", &self.ttl).finish()
    }
}

/// The two caches a reconciler consults.
#[derive(Debug)]
pub struct ListingCaches {
    /// Remote listings keyed by revision
    pub remote: ListingCache<Vec<RemoteEntry>>,
    /// Local listing with content hashes
    pub local: ListingCache<Vec<(FileEntry, String)>>,
}

impl ListingCaches {
    pub fn new(ttl: Duration) -> Self {
        Self {
            remote: ListingCache::new(ttl),
            local: ListingCache::new(ttl),
        }
    }

    /// Caches that never hold anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn invalidate(&self) {
        self.remote.invalidate();
        self.local.invalidate();
    }
}
