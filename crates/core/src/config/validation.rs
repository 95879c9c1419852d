//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `port` is 0
    /// - `log_level` is empty
    /// - `backend_url` is not an http(s) URL
    /// - `retry_attempts` is outside 1..=10
    /// - `request_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `rate_limit_per_minute` is 0 while rate limiting is enabled
    /// - `cache_path` is empty while caching is enabled
    /// - `cache_ttl_secs` or `cache_sweep_interval_secs` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(invalid("port", "must be greater than 0"));
        }

        if self.log_level.trim().is_empty() {
            return Err(invalid("log_level", "must not be empty"));
        }

        match url::Url::parse(&self.backend_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("backend_url", "scheme must be http or https")),
            Err(e) => return Err(invalid("backend_url", &e.to_string())),
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(invalid("retry_attempts", "must be between 1 and 10"));
        }

        if self.request_timeout_ms < 100 {
            return Err(invalid("request_timeout_ms", "must be at least 100ms"));
        }
        if self.request_timeout_ms > 300_000 {
            return Err(invalid("request_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.enable_rate_limit && self.rate_limit_per_minute == 0 {
            return Err(invalid("rate_limit_per_minute", "must be greater than 0 when rate limiting is enabled"));
        }

        if self.enable_cache && self.cache_path.as_os_str().is_empty() {
            return Err(invalid("cache_path", "must not be empty when caching is enabled"));
        }

        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }

        if self.cache_sweep_interval_secs == 0 {
            return Err(invalid("cache_sweep_interval_secs", "must be greater than 0"));
        }

        Ok(())
    }

    /// Settings that are valid but probably unintended.
    ///
    /// Loading happens before logging is set up, so callers log these once
    /// the subscriber is installed.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.enable_cache && self.cache_sweep_interval_secs > self.cache_ttl_secs {
            warnings.push(format!(
                "cache sweep interval ({}s) exceeds TTL ({}s); expired files may linger on disk until the next sweep",
                self.cache_sweep_interval_secs, self.cache_ttl_secs
            ));
        }

        warnings
    }
}
