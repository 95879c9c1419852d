//! Per-client rate limiting.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use super::{RequestId, TrustProxyHeaders, client_ip};
use crate::error::ApiError;

/// Tracked clients above which idle limiter state is pruned.
const PRUNE_THRESHOLD: usize = 10_000;

/// Request budget per client IP.
#[derive(Clone)]
pub struct RateLimitState {
    per_minute: u32,
    trust: TrustProxyHeaders,
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl RateLimitState {
    pub fn new(per_minute: u32, trust: TrustProxyHeaders) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Self { per_minute, trust, limiter: Arc::new(RateLimiter::keyed(quota)) }
    }

    /// Seconds until `client` may retry, or `None` if the request is allowed.
    fn check(&self, client: IpAddr) -> Option<u64> {
        if self.limiter.len() > PRUNE_THRESHOLD {
            self.limiter.retain_recent();
        }

        match self.limiter.check_key(&client) {
            Ok(()) => None,
            Err(not_until) => Some(not_until.wait_time_from(DefaultClock::default().now()).as_secs().max(1)),
        }
    }
}

pub async fn rate_limit(State(state): State<RateLimitState>, request: Request, next: Next) -> Response {
    let client = client_ip(&request, state.trust);

    let Some(retry_after) = state.check(client) else {
        let mut response = next.run(request).await;
        response.headers_mut().insert(
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from(state.per_minute),
        );
        return response;
    };

    tracing::warn!(%client, retry_after, "rate limit exceeded");

    let request_id = request.extensions().get::<RequestId>().map(|id| id.0.clone());
    let mut response = ApiError::too_many_requests(state.per_minute).with_request_id(request_id).into_response();
    response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use tower::ServiceExt;

    fn app_with(per_minute: u32, trust: bool) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimitState::new(per_minute, TrustProxyHeaders(trust)),
                rate_limit,
            ))
    }

    fn app(per_minute: u32) -> Router {
        app_with(per_minute, true)
    }

    fn from(ip: &str) -> axum::http::Request<Body> {
        axum::http::Request::get("/").header("x-forwarded-for", ip).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_allows_requests_within_budget() {
        let app = app(3);
        for _ in 0..3 {
            let response = app.clone().oneshot(from("203.0.113.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "3");
        }
    }

    #[tokio::test]
    async fn test_rejects_over_budget() {
        let app = app(2);
        app.clone().oneshot(from("203.0.113.1")).await.unwrap();
        app.clone().oneshot(from("203.0.113.1")).await.unwrap();

        let response = app.clone().oneshot(from("203.0.113.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers().get(header::RETRY_AFTER).unwrap().to_str().unwrap().parse().unwrap();
        assert!(retry_after >= 1);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Rate limit exceeded. Maximum 2 requests per minute allowed.");
    }

    #[tokio::test]
    async fn test_clients_are_limited_independently() {
        let app = app(1);
        assert_eq!(app.clone().oneshot(from("203.0.113.1")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.clone().oneshot(from("203.0.113.1")).await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(app.clone().oneshot(from("203.0.113.2")).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rotating_forwarded_header_does_not_bypass_untrusted_limit() {
        let app = app_with(1, false);
        let peer = std::net::SocketAddr::from(([192, 0, 2, 7], 5000));

        let mut statuses = Vec::new();
        for i in 1..=5 {
            let mut request = from(&format!("203.0.113.{i}"));
            request.extensions_mut().insert(axum::extract::ConnectInfo(peer));
            statuses.push(app.clone().oneshot(request).await.unwrap().status());
        }

        assert_eq!(statuses[0], StatusCode::OK);
        assert!(statuses[1..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
    }
}
