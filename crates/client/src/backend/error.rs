//! Backend client error types.

use std::sync::Arc;

use strep_core::Error;

/// Errors from the student backend client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The backend has no student with this id.
    #[error("student not found: {0}")]
    NotFound(String),

    /// The backend rejected the internal API key.
    #[error("authentication failed: backend rejected the API key")]
    Unauthorized,

    /// The request could not be built (bad base URL or id).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Whether another attempt could succeed.
    ///
    /// Timeouts, network failures, 429 and 5xx responses are transient;
    /// everything else is returned immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Timeout | BackendError::Network(_) => true,
            BackendError::HttpError { status } => *status == 429 || *status >= 500,
            BackendError::NotFound(_)
            | BackendError::Unauthorized
            | BackendError::InvalidRequest(_)
            | BackendError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { BackendError::Timeout } else { BackendError::Network(Arc::new(err)) }
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(id) => Error::NotFound(format!("student {id}")),
            other => Error::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::NotFound("42".to_string());
        assert!(err.to_string().contains("not found"));

        let err = BackendError::HttpError { status: 502 };
        assert_eq!(err.to_string(), "HTTP error: 502");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(BackendError::Timeout.is_retryable());
        assert!(BackendError::HttpError { status: 503 }.is_retryable());
        assert!(BackendError::HttpError { status: 429 }.is_retryable());
        assert!(!BackendError::HttpError { status: 400 }.is_retryable());
        assert!(!BackendError::NotFound("1".into()).is_retryable());
        assert!(!BackendError::Unauthorized.is_retryable());
        assert!(!BackendError::Parse("bad json".into()).is_retryable());
    }

    #[test]
    fn test_into_core_error() {
        let err: Error = BackendError::NotFound("42".into()).into();
        assert!(matches!(err, Error::NotFound(_)));

        let err: Error = BackendError::Timeout.into();
        assert!(matches!(err, Error::Upstream(_)));
    }
}
