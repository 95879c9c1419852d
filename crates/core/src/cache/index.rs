//! In-memory cache index.
//!
//! Maps `(id, fingerprint)` keys to artifact locations and expiry times. The
//! index is the only place that knows which artifacts are live. Its lock is
//! held for map operations only; callers do disk I/O after it is released.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

/// Lookup key: entity id plus fingerprint of its data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub id: String,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn new(id: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self { id: id.into(), fingerprint: fingerprint.into() }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.fingerprint)
    }
}

/// Where an artifact lives and when it stops being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub location: PathBuf,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Thread-safe map from [`CacheKey`] to [`CacheEntry`].
#[derive(Debug, Default)]
pub struct CacheIndex {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves the map itself consistent, since
    // every mutation is a single insert or remove.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Find the live entry for the exact key.
    ///
    /// Expired entries are a miss even before the sweeper removes them.
    pub fn lookup(&self, id: &str, fingerprint: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let key = CacheKey::new(id, fingerprint);
        self.read().get(&key).filter(|entry| !entry.is_expired(now)).cloned()
    }

    /// Record `entry` for `(id, fingerprint)` and evict every other version
    /// of `id`.
    ///
    /// Insertion and eviction happen under one write lock, so two versions of
    /// an id are never visible together. The evicted entries are returned;
    /// the caller deletes their files.
    pub fn put(&self, id: &str, fingerprint: &str, entry: CacheEntry) -> Vec<CacheEntry> {
        let key = CacheKey::new(id, fingerprint);
        let mut entries = self.write();

        let stale: Vec<CacheKey> = entries
            .keys()
            .filter(|k| k.id == key.id && k.fingerprint != key.fingerprint)
            .cloned()
            .collect();
        let evicted = stale.iter().filter_map(|k| entries.remove(k)).collect();

        entries.insert(key, entry);
        evicted
    }

    /// Drop the entry for `(id, fingerprint)` after its file was found
    /// missing.
    ///
    /// Only removes the entry if it still equals `observed`; a concurrent
    /// `put` that rewrote the key in the meantime is left alone. Returns true
    /// if an entry was removed.
    pub fn remove_if_missing_on_disk(&self, id: &str, fingerprint: &str, observed: &CacheEntry) -> bool {
        let key = CacheKey::new(id, fingerprint);
        let mut entries = self.write();
        if entries.get(&key) == Some(observed) {
            entries.remove(&key);
            true
        } else {
            false
        }
    }

    /// Remove and return every entry that expired before `now`.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<(CacheKey, CacheEntry)> {
        let mut entries = self.write();
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|entry| (key, entry)))
            .collect()
    }

    /// Whether any entry, live or expired, exists for the exact key.
    #[cfg(test)]
    pub(crate) fn contains(&self, id: &str, fingerprint: &str) -> bool {
        self.read().contains_key(&CacheKey::new(id, fingerprint))
    }

    /// Number of tracked entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
