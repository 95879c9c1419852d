use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub const SERVICE_NAME: &str = "student-report-service";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendHealth {
    pub reachable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub backend: BackendHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Always 200; an unreachable backend only degrades the status.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = state.source.check_health().await;
    if !reachable {
        tracing::warn!("backend health probe failed");
    }

    Json(HealthResponse {
        status: if reachable { HealthStatus::Healthy } else { HealthStatus::Degraded },
        service: SERVICE_NAME.to_string(),
        backend: BackendHealth { reachable },
        message: (!reachable).then(|| "Backend service is not reachable".to_string()),
    })
}
