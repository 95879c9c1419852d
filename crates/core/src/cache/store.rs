//! On-disk artifact storage.
//!
//! One regular file per artifact, named from the entity id and fingerprint:
//! `<base>/report_<id>_<fingerprint>.pdf`. The store knows nothing about
//! expiry; that belongs to the index.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

use super::error::CacheError;

/// Filename prefix for stored artifacts.
const ARTIFACT_PREFIX: &str = "report";

/// Filename extension for stored artifacts.
const ARTIFACT_EXT: &str = "pdf";

/// Escaped components longer than this are replaced by a digest, keeping the
/// artifact name and its temporary sibling under the 255-byte name limit.
const MAX_COMPONENT_LEN: usize = 96;

/// Sequence for temporary file names within this process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Durable byte storage rooted at a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_path: PathBuf,
}

impl ArtifactStore {
    /// Open the store at `base_path`, creating the directory if needed and
    /// deleting every file left over from a previous run.
    ///
    /// Subdirectories are left alone. Files that cannot be deleted are skipped.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Init` if the directory cannot be created or listed.
    pub async fn initialize(base_path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let base_path = base_path.into();
        tokio::fs::create_dir_all(&base_path)
            .await
            .map_err(|source| CacheError::Init { path: base_path.clone(), source })?;

        let store = Self { base_path };
        let removed = store.purge().await?;
        if removed > 0 {
            tracing::info!(path = %store.base_path.display(), removed, "purged stale cache files");
        }

        Ok(store)
    }

    async fn purge(&self) -> Result<usize, CacheError> {
        let mut entries = tokio::fs::read_dir(&self.base_path)
            .await
            .map_err(|source| CacheError::Init { path: self.base_path.clone(), source })?;

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(path = %self.base_path.display(), error = %e, "stopped listing cache directory");
                    break;
                }
            };

            if matches!(entry.file_type().await, Ok(t) if t.is_dir()) {
                continue;
            }

            if remove_stale(&entry.path()).await {
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Directory holding the artifacts.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Location of the artifact for `(id, fingerprint)`.
    pub fn artifact_path(&self, id: &str, fingerprint: &str) -> PathBuf {
        self.base_path.join(artifact_file_name(id, fingerprint))
    }

    /// Write `bytes` for `(id, fingerprint)` and return its location.
    ///
    /// The bytes land in a temporary file first and are renamed into place,
    /// so readers never observe a partial artifact.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Write` if the filesystem rejects the write.
    pub async fn write(&self, id: &str, fingerprint: &str, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let file_name = artifact_file_name(id, fingerprint);
        let path = self.base_path.join(&file_name);
        let tmp = self.base_path.join(format!(
            ".{file_name}.{}.{}.tmp",
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(source) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::Write { path, source });
        }

        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::Write { path, source });
        }

        Ok(path)
    }

    /// Read the artifact at `location`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::MissingBlob` if the file is gone and
    /// `CacheError::Read` for any other I/O failure.
    pub async fn read(&self, location: &Path) -> Result<Vec<u8>, CacheError> {
        tokio::fs::read(location).await.map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CacheError::MissingBlob { path: location.to_path_buf() },
            _ => CacheError::Read { path: location.to_path_buf(), source },
        })
    }

    /// Delete the artifact at `location`, ignoring failures.
    ///
    /// Returns true if a file was removed.
    pub async fn remove(&self, location: &Path) -> bool {
        match tokio::fs::remove_file(location).await {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(path = %location.display(), error = %e, "failed to delete cache file");
                false
            }
        }
    }
}

async fn remove_stale(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping stale cache file");
            false
        }
    }
}

fn artifact_file_name(id: &str, fingerprint: &str) -> String {
    format!(
        "{ARTIFACT_PREFIX}_{}_{}.{ARTIFACT_EXT}",
        escape_component(id),
        escape_component(fingerprint)
    )
}

/// Escape a filename component.
///
/// ASCII alphanumerics and `-` pass through; every other byte becomes `%XX`.
/// The mapping is injective and never yields `_`, `/` or `.`, so components
/// stay separable and confined to the base directory.
///
/// Results longer than [`MAX_COMPONENT_LEN`] become `~` plus the hex SHA-256
/// of the raw value. `~` is always escaped, so digest names cannot collide
/// with escaped ones.
fn escape_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }

    if out.len() > MAX_COMPONENT_LEN {
        return format!("~{}", hex::encode(Sha256::digest(value.as_bytes())));
    }
    out
}
