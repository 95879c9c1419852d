//! File-backed report cache.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::error::CacheError;
use super::index::{CacheEntry, CacheIndex};
use super::store::ArtifactStore;

/// Artifact cache combining the on-disk store with the in-memory index.
///
/// Entries live for a fixed TTL after they are set. Only one version per
/// entity id is kept: setting a new fingerprint replaces the previous one.
#[derive(Debug)]
pub struct FileCache {
    store: ArtifactStore,
    index: CacheIndex,
    ttl: Duration,
    ttl_delta: TimeDelta,
}

impl FileCache {
    /// Open a cache rooted at `base_path`, purging files from earlier runs.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidTtl` if `ttl` is too large to add to a
    /// timestamp, or `CacheError::Init` if the directory is unusable.
    pub async fn open(base_path: impl AsRef<Path>, ttl: Duration) -> Result<Self, CacheError> {
        let ttl_delta = TimeDelta::from_std(ttl).map_err(|_| CacheError::InvalidTtl(ttl))?;
        let store = ArtifactStore::initialize(base_path.as_ref()).await?;

        Ok(Self { store, index: CacheIndex::new(), ttl, ttl_delta })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn base_path(&self) -> &Path {
        self.store.base_path()
    }

    /// Number of indexed artifacts, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Fetch the cached bytes for `(id, fingerprint)`.
    ///
    /// A file that vanished from disk counts as a miss and its index entry is
    /// dropped. Read failures are logged and also reported as a miss.
    pub async fn get(&self, id: &str, fingerprint: &str) -> Option<Vec<u8>> {
        let Some(entry) = self.index.lookup(id, fingerprint, Utc::now()) else {
            tracing::debug!(student_id = id, fingerprint, "cache miss");
            return None;
        };

        match self.store.read(&entry.location).await {
            Ok(bytes) => {
                tracing::debug!(student_id = id, fingerprint, bytes = bytes.len(), "cache hit");
                Some(bytes)
            }
            Err(e) if e.is_missing() => {
                if self.index.remove_if_missing_on_disk(id, fingerprint, &entry) {
                    tracing::warn!(student_id = id, fingerprint, path = %entry.location.display(), "dropped cache entry with missing file");
                }
                None
            }
            Err(e) => {
                tracing::warn!(student_id = id, fingerprint, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Store `bytes` for `(id, fingerprint)`, replacing any other version of
    /// `id`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Write` if the file could not be written; the index
    /// is left untouched in that case.
    pub async fn set(&self, id: &str, fingerprint: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let location = self.store.write(id, fingerprint, bytes).await?;
        let entry = CacheEntry { location, expires_at: self.expiry_from(Utc::now()) };

        for stale in self.index.put(id, fingerprint, entry) {
            tracing::debug!(student_id = id, path = %stale.location.display(), "evicting previous version");
            self.store.remove(&stale.location).await;
        }

        Ok(())
    }

    /// Remove every entry expired at the current time.
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now()).await
    }

    /// Remove every entry expired at `now` and delete its file.
    ///
    /// Returns the number of index entries removed. Files that cannot be
    /// deleted are logged and skipped.
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let expired = self.index.sweep_expired(now);
        for (key, entry) in &expired {
            tracing::debug!(key = %key, path = %entry.location.display(), "expiring cache entry");
            self.store.remove(&entry.location).await;
        }
        expired.len()
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl_delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn open_cache(ttl: Duration) -> (tempfile::TempDir, FileCache) {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FileCache::open(tmp.path(), ttl).await.unwrap();
        (tmp, cache)
    }

    #[tokio::test]
    async fn test_open_purges_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        let leftover = tmp.path().join("report_1_aa.pdf");
        std::fs::write(&leftover, b"old").unwrap();

        let cache = FileCache::open(tmp.path(), HOUR).await.unwrap();

        assert!(!leftover.exists());
        assert!(cache.is_empty());
        assert_eq!(cache.ttl(), HOUR);
        assert_eq!(cache.base_path(), tmp.path());
    }

    #[tokio::test]
    async fn test_open_rejects_unrepresentable_ttl() {
        let tmp = tempfile::tempdir().unwrap();
        let result = FileCache::open(tmp.path(), Duration::MAX).await;
        assert!(matches!(result, Err(CacheError::InvalidTtl(_))));
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (_tmp, cache) = open_cache(HOUR).await;
        let pdf: [u8; 4] = [0x25, 0x50, 0x44, 0x46];

        cache.set("42", "abcd1234abcd1234", &pdf).await.unwrap();

        assert_eq!(cache.get("42", "abcd1234abcd1234").await, Some(pdf.to_vec()));
        assert_eq!(cache.get("42", "ffffffffffffffff").await, None);
        assert_eq!(cache.get("43", "abcd1234abcd1234").await, None);
    }

    #[tokio::test]
    async fn test_new_fingerprint_replaces_old_version() {
        let (tmp, cache) = open_cache(HOUR).await;

        cache.set("12345", "oldhash", b"old pdf content").await.unwrap();
        let old_file = tmp.path().join("report_12345_oldhash.pdf");
        assert!(old_file.exists());

        cache.set("12345", "newhash", b"new pdf content").await.unwrap();

        assert!(!old_file.exists());
        assert!(tmp.path().join("report_12345_newhash.pdf").exists());
        assert_eq!(cache.get("12345", "oldhash").await, None);
        assert_eq!(cache.get("12345", "newhash").await, Some(b"new pdf content".to_vec()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_same_fingerprint_rewrite_keeps_file() {
        let (tmp, cache) = open_cache(HOUR).await;

        cache.set("1", "aa", b"first").await.unwrap();
        cache.set("1", "aa", b"second").await.unwrap();

        assert!(tmp.path().join("report_1_aa.pdf").exists());
        assert_eq!(cache.get("1", "aa").await, Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_multiple_students() {
        let (_tmp, cache) = open_cache(HOUR).await;
        let cases = [("111", "hash111", b"student 111 pdf"), ("222", "hash222", b"student 222 pdf")];

        for (id, fp, data) in cases {
            cache.set(id, fp, data).await.unwrap();
        }
        for (id, fp, data) in cases {
            assert_eq!(cache.get(id, fp).await.as_deref(), Some(&data[..]));
        }
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_before_sweep() {
        let (tmp, cache) = open_cache(Duration::from_millis(50)).await;
        cache.set("12345", "abcd1234", b"test pdf content").await.unwrap();
        assert!(cache.get("12345", "abcd1234").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.get("12345", "abcd1234").await, None);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.sweep_expired().await, 1);
        assert!(cache.is_empty());
        assert!(!tmp.path().join("report_12345_abcd1234.pdf").exists());
    }

    #[tokio::test]
    async fn test_sweep_at_removes_files() {
        let (tmp, cache) = open_cache(HOUR).await;
        cache.set("student1", "hash1", b"data1").await.unwrap();
        cache.set("student2", "hash2", b"data2").await.unwrap();

        assert_eq!(cache.sweep_expired_at(Utc::now()).await, 0);
        assert_eq!(cache.sweep_expired_at(Utc::now() + TimeDelta::hours(2)).await, 2);

        assert!(cache.is_empty());
        assert!(!tmp.path().join("report_student1_hash1.pdf").exists());
        assert!(!tmp.path().join("report_student2_hash2.pdf").exists());
    }

    #[tokio::test]
    async fn test_eviction_tolerates_missing_old_file() {
        let (tmp, cache) = open_cache(HOUR).await;
        cache.set("1", "aa", b"old").await.unwrap();
        std::fs::remove_file(tmp.path().join("report_1_aa.pdf")).unwrap();

        cache.set("1", "bb", b"new").await.unwrap();

        assert_eq!(cache.get("1", "bb").await, Some(b"new".to_vec()));
        assert_eq!(cache.get("1", "aa").await, None);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_continues_past_missing_file() {
        let (tmp, cache) = open_cache(HOUR).await;
        for i in 0..5 {
            cache.set(&i.to_string(), "aa", b"pdf").await.unwrap();
        }
        std::fs::remove_file(tmp.path().join("report_2_aa.pdf")).unwrap();

        assert_eq!(cache.sweep_expired_at(Utc::now() + TimeDelta::hours(2)).await, 5);

        assert!(cache.is_empty());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_long_id_is_cached() {
        let (_tmp, cache) = open_cache(HOUR).await;
        let id = ":".repeat(100);

        cache.set(&id, "abcd1234abcd1234", b"pdf").await.unwrap();
        assert_eq!(cache.get(&id, "abcd1234abcd1234").await, Some(b"pdf".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_file_heals_index() {
        let (tmp, cache) = open_cache(HOUR).await;
        cache.set("12345", "abcd1234", b"test pdf content").await.unwrap();

        std::fs::remove_file(tmp.path().join("report_12345_abcd1234.pdf")).unwrap();

        assert_eq!(cache.get("12345", "abcd1234").await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_leaves_index_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("cache");
        let cache = FileCache::open(&base, HOUR).await.unwrap();
        cache.set("1", "aa", b"kept").await.unwrap();

        std::fs::remove_dir_all(&base).unwrap();
        std::fs::write(&base, b"now a file").unwrap();

        let err = cache.set("1", "bb", b"lost").await.unwrap_err();
        assert!(matches!(err, CacheError::Write { .. }));
        assert_eq!(cache.len(), 1);
        assert!(cache.index.contains("1", "aa"));
        assert!(!cache.index.contains("1", "bb"));
    }

    #[tokio::test]
    async fn test_large_artifact() {
        let (_tmp, cache) = open_cache(HOUR).await;
        let data: Vec<u8> = (0..5 * 1024 * 1024).map(|i| (i % 256) as u8).collect();

        cache.set("12345", "largehash", &data).await.unwrap();

        assert_eq!(cache.get("12345", "largehash").await, Some(data));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        let (_tmp, cache) = open_cache(HOUR).await;
        let cache = Arc::new(cache);
        let n = 32;

        let writers: Vec<_> = (0..n)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    let id = i.to_string();
                    cache.set(&id, &format!("hash{i}"), format!("data{i}").as_bytes()).await
                })
            })
            .collect();
        for w in writers {
            w.await.unwrap().unwrap();
        }

        let readers: Vec<_> = (0..n)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { (i, cache.get(&i.to_string(), &format!("hash{i}")).await) })
            })
            .collect();
        for r in readers {
            let (i, data) = r.await.unwrap();
            assert_eq!(data, Some(format!("data{i}").into_bytes()));
        }

        assert_eq!(cache.len(), n);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_versions_leave_one_survivor() {
        let (tmp, cache) = open_cache(HOUR).await;
        let cache = Arc::new(cache);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.set("7", &format!("fp{i}"), b"pdf").await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        assert_eq!(cache.len(), 1);
        let hits = {
            let mut hits = 0;
            for i in 0..8 {
                if cache.get("7", &format!("fp{i}")).await.is_some() {
                    hits += 1;
                }
            }
            hits
        };
        assert_eq!(hits, 1);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
