//! Request middleware.
//!
//! Layers applied to every route, outermost first:
//!
//! 1. [`request_id`]: assigns or propagates `X-Request-Id`
//! 2. [`log_requests`]: logs one line per completed request
//! 3. [`security_headers`]: hardening headers on every response
//! 4. [`rate_limit::rate_limit`]: per-client request budget (when enabled)

pub mod rate_limit;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied request id that is propagated as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Whether `X-Forwarded-For` and `X-Real-IP` identify the client.
///
/// Only enable behind a proxy that overwrites these headers; otherwise any
/// caller can pick the address it is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustProxyHeaders(pub bool);

/// Id of the current request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

fn is_acceptable_request_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Reuse the caller's `X-Request-Id` when it looks sane, otherwise mint one.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| is_acceptable_request_id(v))
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// `nosniff` and `DENY` everywhere; `private, no-store` on everything but
/// the health probe.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let cacheable = request.uri().path() == "/health";

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    if !cacheable {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, no-store"));
    }
    response
}

pub async fn log_requests(State(trust): State<TrustProxyHeaders>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_ip(&request, trust);
    let request_id = request.extensions().get::<RequestId>().map(|id| id.0.clone()).unwrap_or_default();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        %client,
        request_id,
        "request completed"
    );
    response
}

/// Client address: first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// peer address. The headers are skipped unless trusted. Unspecified when
/// none is known.
pub fn client_ip(request: &Request, TrustProxyHeaders(trusted): TrustProxyHeaders) -> IpAddr {
    if trusted && let Some(ip) = forwarded_ip(request) {
        return ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_ip(request: &Request) -> Option<IpAddr> {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded.or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()).and_then(|ip| ip.trim().parse().ok()))
}
