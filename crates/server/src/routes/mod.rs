//! HTTP routes.
//!
//! - `GET /health`: service and backend reachability
//! - `GET /api/v1/students/:id/report`: PDF report for one student

mod health;
mod report;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;

use crate::middleware::rate_limit::{RateLimitState, rate_limit};
use crate::middleware::{TrustProxyHeaders, log_requests, request_id, security_headers};
use crate::state::AppState;

/// Build the application router with its middleware stack.
pub fn router(state: AppState) -> Router {
    let trust = TrustProxyHeaders(state.config.trust_proxy_headers);
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/students/:id/report", get(report::student_report));

    if state.config.enable_rate_limit {
        tracing::info!(requests_per_minute = state.config.rate_limit_per_minute, "rate limiting enabled");
        router = router.layer(from_fn_with_state(RateLimitState::new(state.config.rate_limit_per_minute, trust), rate_limit));
    }

    router
        .layer(from_fn(security_headers))
        .layer(from_fn_with_state(trust, log_requests))
        .layer(from_fn(request_id))
        .with_state(state)
}
