//! Student backend client.
//!
//! Fetches student snapshots from the internal backend API.
//!
//! ### Protocol
//!
//! - **Endpoint**: `GET {base}/api/v1/students/{id}`
//! - **Authentication**: `X-API-Key` header with the internal service key.
//! - **Health**: `GET {base}/health`, 200 means reachable.
//! - **Retries**: transient failures (timeouts, network errors, 429, 5xx)
//!   are retried with exponential back-off (1s, 2s, 4s, ...). A 404 is
//!   final and never retried.

pub mod error;

pub use error::BackendError;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::{StatusCode, header};
use strep_core::config::{AppConfig, ConfigError};
use strep_core::domain::Student;
use url::Url;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for health probes.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before the first retry; doubles on each further attempt.
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for a single back-off.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = concat!("student-report/", env!("CARGO_PKG_VERSION"));

/// Source of student snapshots.
#[async_trait]
pub trait StudentSource: Send + Sync {
    /// Fetch the current snapshot for `id`.
    async fn fetch_student(&self, id: &str) -> Result<Student, BackendError>;

    /// Whether the source is reachable.
    async fn check_health(&self) -> bool;
}

/// Backend client configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL (default: http://localhost:5007).
    pub base_url: String,
    /// Internal API key.
    pub api_key: String,
    /// Request timeout (default: 30s).
    pub timeout: Duration,
    /// Attempts per fetch including the first (default: 3).
    pub retry_attempts: u32,
    /// Delay before the first retry (default: 1s).
    pub retry_base_delay: Duration,
    /// User-agent string.
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5007".to_string(),
            api_key: String::new(),
            timeout: DEFAULT_TIMEOUT,
            retry_attempts: 3,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl BackendConfig {
    /// Build the client configuration from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no API key is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: config.backend_url.clone(),
            api_key: config.require_api_key()?.to_string(),
            timeout: config.request_timeout(),
            retry_attempts: config.retry_attempts,
            ..Default::default()
        })
    }

    /// Deterministic doubling back-off starting at `retry_base_delay`.
    ///
    /// Bounded by `retry_attempts` rather than elapsed time.
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_base_delay)
            .with_randomization_factor(0.0)
            .with_multiplier(2.0)
            .with_max_interval(MAX_RETRY_DELAY)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// HTTP client for the student backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    config: BackendConfig,
}

impl BackendClient {
    /// Create a new backend client with the given configuration.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| BackendError::InvalidRequest(format!("base URL: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(BackendError::from)?;

        Ok(Self { http, base_url, config })
    }

    /// URL for a student resource; the id is percent-encoded as one segment.
    fn student_url(&self, id: &str) -> Result<Url, BackendError> {
        self.endpoint(&["api", "v1", "students", id])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidRequest("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Perform a single fetch without retries.
    async fn fetch_once(&self, id: &str) -> Result<Student, BackendError> {
        let url = self.student_url(id)?;

        let response = self
            .http
            .get(url)
            .header("X-API-Key", &self.config.api_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => return Err(BackendError::NotFound(id.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(BackendError::Unauthorized),
            s if !s.is_success() => return Err(BackendError::HttpError { status: s.as_u16() }),
            _ => {}
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// Fetch a student, retrying transient failures.
    pub async fn fetch_student(&self, id: &str) -> Result<Student, BackendError> {
        let attempts = self.config.retry_attempts.max(1);
        let mut backoff = self.config.backoff();
        let start = Instant::now();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(id).await {
                Ok(student) => {
                    tracing::info!(student_id = id, attempt, elapsed_ms = start.elapsed().as_millis() as u64, "fetched student");
                    return Ok(student);
                }
                Err(e) if !e.is_retryable() => {
                    tracing::warn!(student_id = id, attempt, error = %e, "backend request failed, not retrying");
                    return Err(e);
                }
                Err(e) if attempt >= attempts => {
                    tracing::error!(student_id = id, attempts, error = %e, "backend request failed after all retries");
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff.next_backoff().unwrap_or(MAX_RETRY_DELAY);
                    tracing::warn!(
                        student_id = id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "backend request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Probe the backend health endpoint.
    pub async fn check_health(&self) -> bool {
        let Ok(url) = self.endpoint(&["health"]) else {
            return false;
        };

        match self.http.get(url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %e, "backend health probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl StudentSource for BackendClient {
    async fn fetch_student(&self, id: &str) -> Result<Student, BackendError> {
        BackendClient::fetch_student(self, id).await
    }

    async fn check_health(&self) -> bool {
        BackendClient::check_health(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> BackendConfig {
        BackendConfig {
            base_url: base_url.to_string(),
            api_key: "secret".to_string(),
            timeout: Duration::from_secs(2),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn student_json() -> serde_json::Value {
        serde_json::json!({
            "id": 42,
            "name": "John Doe",
            "class": "10",
            "section": "A",
            "lastUpdated": "2024-01-01T10:00:00Z",
            "admissionDate": "2015-06-01T00:00:00Z"
        })
    }

    #[test]
    fn test_config_default() {
        let config = BackendConfig::default();
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("student-report/"));
    }

    #[test]
    fn test_config_from_app_config_requires_key() {
        let app = AppConfig::default();
        assert!(matches!(BackendConfig::from_app_config(&app), Err(ConfigError::Missing { .. })));

        let app = AppConfig { api_key: Some("k".into()), retry_attempts: 5, ..Default::default() };
        let config = BackendConfig::from_app_config(&app).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.retry_attempts, 5);
    }

    #[test]
    fn test_retry_delay_doubles() {
        let mut backoff = BackendConfig::default().backoff();
        let delays: Vec<u128> = (0..3).filter_map(|_| backoff.next_backoff()).map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000]);
    }

    #[test]
    fn test_student_url_encodes_id() {
        let client = BackendClient::new(test_config("http://backend.local:5007/")).unwrap();
        assert_eq!(client.student_url("42").unwrap().as_str(), "http://backend.local:5007/api/v1/students/42");
        assert_eq!(
            client.student_url("../admin").unwrap().as_str(),
            "http://backend.local:5007/api/v1/students/..%2Fadmin"
        );
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let result = BackendClient::new(test_config("not a url"));
        assert!(matches!(result, Err(BackendError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_fetch_student_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/students/42"))
            .and(header_eq("X-API-Key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(student_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(test_config(&server.uri())).unwrap();
        let student = client.fetch_student("42").await.unwrap();

        assert_eq!(student.id, 42);
        assert_eq!(student.name, "John Doe");
        assert_eq!(student.last_updated, "2024-01-01T10:00:00Z");
    }

    #[tokio::test]
    async fn test_fetch_student_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/students/404"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(test_config(&server.uri())).unwrap();
        let result = client.fetch_student("404").await;

        assert!(matches!(result, Err(BackendError::NotFound(id)) if id == "404"));
    }

    #[tokio::test]
    async fn test_fetch_student_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/students/7"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = BackendClient::new(test_config(&server.uri())).unwrap();
        let result = client.fetch_student("7").await;

        assert!(matches!(result, Err(BackendError::HttpError { status: 503 })));
    }

    #[tokio::test]
    async fn test_fetch_student_recovers_after_transient_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/students/42"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/students/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(student_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(test_config(&server.uri())).unwrap();
        let student = client.fetch_student("42").await.unwrap();
        assert_eq!(student.name, "John Doe");
    }

    #[tokio::test]
    async fn test_fetch_student_bad_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/students/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(test_config(&server.uri())).unwrap();
        assert!(matches!(client.fetch_student("1").await, Err(BackendError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_student_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(test_config(&server.uri())).unwrap();
        assert!(matches!(client.fetch_student("1").await, Err(BackendError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_check_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = BackendClient::new(test_config(&server.uri())).unwrap();
        assert!(client.check_health().await);
    }

    #[tokio::test]
    async fn test_check_health_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = BackendClient::new(test_config(&server.uri())).unwrap();
        assert!(!client.check_health().await);
    }
}
