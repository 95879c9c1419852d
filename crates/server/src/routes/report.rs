use axum::Extension;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;
use crate::validation::validate_student_id;

pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

/// `GET /api/v1/students/:id/report`
pub async fn student_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request_id: Option<Extension<RequestId>>,
) -> Result<Response, ApiError> {
    let request_id = request_id.map(|Extension(RequestId(id))| id);

    validate_student_id(&id).map_err(|e| ApiError::from(e).with_request_id(request_id.clone()))?;

    tracing::info!(student_id = %id, "report requested");

    let report = state.reports.generate(&id).await.map_err(|e| ApiError::from(e).with_request_id(request_id))?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", report.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let cache_status = HeaderValue::from_static(if report.from_cache { "HIT" } else { "MISS" });

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (CACHE_STATUS_HEADER, cache_status),
        ],
        report.bytes,
    )
        .into_response())
}
