//! Report generation with caching.

use std::sync::Arc;

use strep_client::{ReportRenderer, StudentSource};
use strep_core::{Error, ReportCache};

/// A generated (or cached) report ready to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub from_cache: bool,
}

/// Fetches the student, then serves the cached report for the current
/// snapshot or renders and caches a new one.
pub struct ReportService {
    source: Arc<dyn StudentSource>,
    renderer: Arc<dyn ReportRenderer>,
    cache: Arc<dyn ReportCache>,
}

impl ReportService {
    pub fn new(source: Arc<dyn StudentSource>, renderer: Arc<dyn ReportRenderer>, cache: Arc<dyn ReportCache>) -> Self {
        Self { source, renderer, cache }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Produce the report for `id`.
    ///
    /// # Errors
    ///
    /// Backend failures map to `Error::NotFound` or `Error::Upstream`;
    /// rendering failures to `Error::RenderFailed`. Failing to cache a
    /// rendered report is logged and does not fail the request.
    pub async fn generate(&self, id: &str) -> Result<Report, Error> {
        let student = self.source.fetch_student(id).await?;
        let fingerprint = student.fingerprint();
        let file_name = format!("student_{id}_report.pdf");

        if let Some(bytes) = self.cache.get(id, &fingerprint).await {
            tracing::info!(student_id = id, %fingerprint, size = bytes.len(), "serving cached report");
            return Ok(Report { bytes, file_name, from_cache: true });
        }

        let renderer = Arc::clone(&self.renderer);
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&student))
            .await
            .map_err(|e| Error::RenderFailed(format!("render task failed: {e}")))??;

        if let Err(e) = self.cache.set(id, &fingerprint, &bytes).await {
            tracing::warn!(student_id = id, %fingerprint, error = %e, "failed to cache report");
        }

        tracing::info!(student_id = id, %fingerprint, size = bytes.len(), "generated report");
        Ok(Report { bytes, file_name, from_cache: false })
    }
}
