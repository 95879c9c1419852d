//! HTTP error responses.
//!
//! Core errors are mapped onto status codes here. Response bodies carry a
//! short public message and the request id; internal detail only goes to the
//! log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use strep_core::Error;

/// Error returned by HTTP handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    request_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), request_id: None }
    }

    pub fn too_many_requests(limit: u32) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            format!("Rate limit exceeded. Maximum {limit} requests per minute allowed."),
        )
    }

    /// Attach the id of the request that failed.
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, message) = match &err {
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "Student not found".to_string()),
            Error::Upstream(_) => (StatusCode::SERVICE_UNAVAILABLE, "Backend service unavailable".to_string()),
            Error::RenderFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate PDF".to_string()),
            Error::Cache(_) | Error::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "request failed");
        } else {
            tracing::debug!(code = err.code(), error = %err, "request rejected");
        }

        Self::new(status, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: &self.message, request_id: self.request_id.as_deref() };
        (self.status, Json(body)).into_response()
    }
}
