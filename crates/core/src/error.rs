//! Unified error types for the report service.
//!
//! Every variant renders with a stable upper-case code prefix so logs and
//! API responses can be matched on the kind without parsing prose.

use crate::cache::CacheError;
use crate::config::ConfigError;

/// Unified error type shared by the client and server crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a non-numeric student id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The requested entity does not exist upstream.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// The backend could not be reached or answered with an error.
    #[error("UPSTREAM_ERROR: {0}")]
    Upstream(String),

    /// Report rendering failed.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// Artifact cache failure.
    #[error("CACHE_ERROR: {0}")]
    Cache(#[from] CacheError),

    /// Configuration could not be loaded or is invalid.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Stable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Upstream(_) => "UPSTREAM_ERROR",
            Error::RenderFailed(_) => "RENDER_FAILED",
            Error::Cache(_) => "CACHE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }
}
