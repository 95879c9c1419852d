//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STREP_*)
//! 2. TOML config file (if STREP_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STREP_*)
/// 2. TOML config file (if STREP_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// TCP port the HTTP server binds to.
    ///
    /// Set via STREP_PORT environment variable.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment; `production` switches logs to JSON.
    ///
    /// Set via STREP_ENVIRONMENT environment variable.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Default log filter when RUST_LOG is unset.
    ///
    /// Set via STREP_LOG_LEVEL environment variable.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base URL of the student backend.
    ///
    /// Set via STREP_BACKEND_URL environment variable.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Internal API key sent to the backend as `X-API-Key`.
    ///
    /// Set via STREP_API_KEY environment variable. Required at startup.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Attempts per backend fetch, including the first.
    ///
    /// Set via STREP_RETRY_ATTEMPTS environment variable.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Backend request timeout in milliseconds.
    ///
    /// Set via STREP_REQUEST_TIMEOUT_MS environment variable.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Whether per-client rate limiting is applied.
    ///
    /// Set via STREP_ENABLE_RATE_LIMIT environment variable.
    #[serde(default = "default_true")]
    pub enable_rate_limit: bool,

    /// Requests allowed per client per minute.
    ///
    /// Set via STREP_RATE_LIMIT_PER_MINUTE environment variable.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    ///
    /// Set via STREP_TRUST_PROXY_HEADERS environment variable.
    #[serde(default = "default_true")]
    pub trust_proxy_headers: bool,

    /// Whether rendered reports are cached on disk.
    ///
    /// Set via STREP_ENABLE_CACHE environment variable.
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Directory holding cached reports. Purged at startup.
    ///
    /// Set via STREP_CACHE_PATH environment variable.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Seconds a cached report stays valid.
    ///
    /// Set via STREP_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Seconds between expiry sweeps.
    ///
    /// Set via STREP_CACHE_SWEEP_INTERVAL_SECS environment variable.
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "development".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_backend_url() -> String {
    "http://localhost:5007".into()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./cache/pdf-reports")
}

fn default_cache_ttl_secs() -> u64 {
    3600 // 1h
}

fn default_cache_sweep_interval_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            backend_url: default_backend_url(),
            api_key: None,
            retry_attempts: default_retry_attempts(),
            request_timeout_ms: default_request_timeout_ms(),
            enable_rate_limit: true,
            rate_limit_per_minute: default_rate_limit_per_minute(),
            trust_proxy_headers: true,
            enable_cache: true,
            cache_path: default_cache_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_sweep_interval_secs: default_cache_sweep_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Backend request timeout as Duration for use with reqwest.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Sweep interval as Duration.
    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STREP_`
    /// 2. TOML file from `STREP_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STREP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STREP_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the backend API key is available (deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the API key is not set or empty.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "api_key".into(),
                hint: "Set STREP_API_KEY environment variable".into(),
            })
    }
}
