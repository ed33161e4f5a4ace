//! Rate limiting middleware.
//!
//! Fixed-window counters in Redis, keyed by request path and client IP.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::warn;

use common::{AppError, RateLimitConfig};

use crate::state::AppState;

const HEADER_LIMIT: &str = "X-RateLimit-Limit";
const HEADER_REMAINING: &str = "X-RateLimit-Remaining";

/// Rate limit middleware for general endpoints.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let limit = state.config.rate_limit;
    rate_limit_internal(state, connect_info, request, next, limit).await
}

/// Rate limit middleware for auth endpoints (stricter).
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let limit = state.config.rate_limit_auth;
    rate_limit_internal(state, connect_info, request, next, limit).await
}

/// Rate limit middleware for the public tracking lookup.
pub async fn rate_limit_track_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let limit = state.config.rate_limit_track;
    rate_limit_internal(state, connect_info, request, next, limit).await
}

async fn rate_limit_internal(
    state: AppState,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
    limit: RateLimitConfig,
) -> Response {
    let ip = client_ip(request.headers(), connect_info);
    let identifier = format!("{}:{}", request.uri().path(), ip);

    let hit = match state
        .cache
        .check_rate_limit(&identifier, limit.max_requests, limit.window_seconds)
        .await
    {
        Ok(hit) => hit,
        Err(e) => {
            // Fail closed
            warn!("Rate limit check failed for {}: {}", identifier, e);
            return rate_limit_exceeded_response(limit, limit.window_seconds);
        }
    };

    if !hit.allowed {
        let retry_after = state
            .cache
            .get_rate_limit_ttl(&identifier)
            .await
            .ok()
            .flatten()
            .unwrap_or(limit.window_seconds);
        return rate_limit_exceeded_response(limit, retry_after);
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, HeaderValue::from(limit.max_requests));
    headers.insert(
        HEADER_REMAINING,
        HeaderValue::from(limit.max_requests.saturating_sub(hit.count)),
    );

    response
}

fn client_ip(headers: &HeaderMap, connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("X-Real-IP")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(|| connect_info.map(|ci| ci.0.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn rate_limit_exceeded_response(limit: RateLimitConfig, retry_after: u64) -> Response {
    let mut response = AppError::TooManyRequests.into_response();

    let headers = response.headers_mut();
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
    headers.insert(HEADER_REMAINING, HeaderValue::from_static("0"));
    headers.insert(HEADER_LIMIT, HeaderValue::from(limit.max_requests));

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn forwarded_for_wins() {
        let headers = headers(&[
            ("X-Forwarded-For", "203.0.113.7, 10.0.0.1"),
            ("X-Real-IP", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&headers, None), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_real_ip_then_socket() {
        let real = headers(&[("X-Real-IP", "198.51.100.2")]);
        assert_eq!(client_ip(&real, None), "198.51.100.2");

        let addr: SocketAddr = "192.0.2.10:4000".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(ConnectInfo(addr))), "192.0.2.10");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn exceeded_response_carries_retry_after() {
        let limit = RateLimitConfig {
            max_requests: 10,
            window_seconds: 60,
        };
        let response = rate_limit_exceeded_response(limit, 42);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
        assert_eq!(response.headers()[HEADER_LIMIT], "10");
        assert_eq!(response.headers()[HEADER_REMAINING], "0");
    }
}
