//! HTTP middleware: request logging, CORS, and rate limiting.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use shopforge_core::config::RateLimitConfig;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::error::HttpError;
use crate::state::AppState;

/// Request logging middleware
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with error"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

/// CORS middleware configuration
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// One client's counter inside the current fixed window
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    window_start: Instant,
    count: u32,
}

/// Fixed-window in-memory rate limiter keyed by client IP.
///
/// Failed requests are not counted: callers check before the handler runs
/// and record only after a non-error response.
pub struct RateLimiter {
    config: RateLimitConfig,
    general: DashMap<String, WindowCounter>,
    creates: DashMap<String, WindowCounter>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            general: DashMap::new(),
            creates: DashMap::new(),
        }
    }

    pub fn check_general(&self, client: &str) -> bool {
        Self::check(&self.general, client, self.config.max_requests, self.config.window())
    }

    pub fn record_general(&self, client: &str) {
        Self::record(&self.general, client, self.config.window());
    }

    pub fn check_create(&self, client: &str) -> bool {
        Self::check(&self.creates, client, self.config.max_creates, self.config.window())
    }

    pub fn record_create(&self, client: &str) {
        Self::record(&self.creates, client, self.config.window());
    }

    /// Requests remaining for a client in the general window
    pub fn remaining_general(&self, client: &str) -> u32 {
        let used = self
            .general
            .get(client)
            .filter(|c| c.window_start.elapsed() < self.config.window())
            .map(|c| c.count)
            .unwrap_or(0);
        self.config.max_requests.saturating_sub(used)
    }

    pub fn max_requests(&self) -> u32 {
        self.config.max_requests
    }

    fn check(
        map: &DashMap<String, WindowCounter>,
        client: &str,
        limit: u32,
        window: Duration,
    ) -> bool {
        match map.get(client) {
            Some(counter) if counter.window_start.elapsed() < window => counter.count < limit,
            _ => limit > 0,
        }
    }

    fn record(map: &DashMap<String, WindowCounter>, client: &str, window: Duration) {
        let mut entry = map.entry(client.to_string()).or_insert(WindowCounter {
            window_start: Instant::now(),
            count: 0,
        });
        if entry.window_start.elapsed() >= window {
            entry.window_start = Instant::now();
            entry.count = 0;
        }
        entry.count += 1;
    }
}

/// Client identifier for rate limiting: first x-forwarded-for hop, or
/// "unknown" when the request carries none
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// General API rate limit: checked before the handler, recorded only for
/// non-error responses (skip-failed)
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_ip(request.headers());
    let limiter = &state.rate_limiter;

    if !limiter.check_general(&client) {
        return HttpError::rate_limited().into_response();
    }

    let mut response = next.run(request).await;

    if !response.status().is_client_error() && !response.status().is_server_error() {
        limiter.record_general(&client);
    }

    let headers = response.headers_mut();
    if let Ok(limit) = limiter.max_requests().to_string().parse() {
        headers.insert("x-ratelimit-limit", limit);
    }
    if let Ok(remaining) = limiter.remaining_general(&client).to_string().parse() {
        headers.insert("x-ratelimit-remaining", remaining);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, max_creates: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_ms: 60_000,
            max_requests,
            max_creates,
        })
    }

    #[test]
    fn test_general_limit_blocks_at_threshold() {
        let limiter = limiter(2, 5);

        assert!(limiter.check_general("1.2.3.4"));
        limiter.record_general("1.2.3.4");
        assert!(limiter.check_general("1.2.3.4"));
        limiter.record_general("1.2.3.4");
        assert!(!limiter.check_general("1.2.3.4"));

        // Separate window per client
        assert!(limiter.check_general("5.6.7.8"));
    }

    #[test]
    fn test_unrecorded_requests_do_not_count() {
        let limiter = limiter(1, 5);

        // Checked but never recorded (e.g. the request failed)
        assert!(limiter.check_general("1.2.3.4"));
        assert!(limiter.check_general("1.2.3.4"));
        limiter.record_general("1.2.3.4");
        assert!(!limiter.check_general("1.2.3.4"));
    }

    #[test]
    fn test_create_limit_is_independent() {
        let limiter = limiter(10, 1);

        limiter.record_create("1.2.3.4");
        assert!(!limiter.check_create("1.2.3.4"));
        assert!(limiter.check_general("1.2.3.4"));
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = limiter(3, 5);
        assert_eq!(limiter.remaining_general("1.2.3.4"), 3);
        limiter.record_general("1.2.3.4");
        assert_eq!(limiter.remaining_general("1.2.3.4"), 2);
    }
}
