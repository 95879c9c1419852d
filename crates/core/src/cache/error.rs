//! Artifact cache error types.

use std::io;
use std::path::PathBuf;

/// Errors raised by the artifact cache.
///
/// None of these are fatal to the process: callers degrade to regenerating
/// the artifact.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache directory could not be created or listed.
    #[error("failed to initialize cache directory {}: {source}", path.display())]
    Init { path: PathBuf, source: io::Error },

    /// The artifact could not be written.
    #[error("failed to write cache file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The artifact exists but could not be read.
    #[error("failed to read cache file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The index points at a file that is no longer on disk.
    #[error("cache file missing: {}", path.display())]
    MissingBlob { path: PathBuf },

    /// The configured TTL cannot be represented as a wall-clock offset.
    #[error("invalid cache TTL: {0:?}")]
    InvalidTtl(std::time::Duration),
}

impl CacheError {
    /// True for [`CacheError::MissingBlob`].
    pub fn is_missing(&self) -> bool {
        matches!(self, CacheError::MissingBlob { .. })
    }
}
