//! Content-addressed report cache.
//!
//! Rendered reports are cached on disk, keyed by entity id and a fingerprint
//! of the entity's render-relevant fields. It supports:
//!
//! - One live version per entity id (a new fingerprint evicts the old file)
//! - TTL expiry, checked lazily on lookup and by a background [`Sweeper`]
//! - Self-healing when a file disappears from under the index
//! - Running with no cache at all via [`DisabledCache`]

pub mod error;
pub mod file_cache;
pub mod fingerprint;
pub mod index;
pub mod store;
pub mod sweeper;

use async_trait::async_trait;

pub use error::CacheError;
pub use file_cache::FileCache;
pub use fingerprint::{FINGERPRINT_LEN, fingerprint};
pub use index::{CacheEntry, CacheIndex, CacheKey};
pub use store::ArtifactStore;
pub use sweeper::{SweepStats, Sweeper};

/// Cache contract used by the report service.
#[async_trait]
pub trait ReportCache: Send + Sync {
    /// Cached bytes for `(id, fingerprint)`, or `None` on a miss.
    async fn get(&self, id: &str, fingerprint: &str) -> Option<Vec<u8>>;

    /// Cache `bytes` for `(id, fingerprint)`.
    async fn set(&self, id: &str, fingerprint: &str, bytes: &[u8]) -> Result<(), CacheError>;

    /// Whether this cache can ever produce a hit.
    fn is_enabled(&self) -> bool {
        true
    }
}

#[async_trait]
impl ReportCache for FileCache {
    async fn get(&self, id: &str, fingerprint: &str) -> Option<Vec<u8>> {
        FileCache::get(self, id, fingerprint).await
    }

    async fn set(&self, id: &str, fingerprint: &str, bytes: &[u8]) -> Result<(), CacheError> {
        FileCache::set(self, id, fingerprint, bytes).await
    }
}

/// Stand-in used when caching is turned off or failed to initialize.
///
/// Every lookup misses and every store is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

#[async_trait]
impl ReportCache for DisabledCache {
    async fn get(&self, _id: &str, _fingerprint: &str) -> Option<Vec<u8>> {
        None
    }

    async fn set(&self, _id: &str, _fingerprint: &str, _bytes: &[u8]) -> Result<(), CacheError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
