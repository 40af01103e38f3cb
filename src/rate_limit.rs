//! Fixed-window request rate limiting, keyed by client address.
//!
//! Excess requests are rejected with 429, never queued. Counters live in an
//! in-process map; this is a single-server deployment.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use tokio::sync::RwLock;

use crate::config::RateLimitSettings;

/// Per-address fixed-window counter.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    message: String,
    windows: RwLock<HashMap<String, WindowState>>,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Denied { retry_after_secs: u64 },
}

impl FixedWindowLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window: settings.window,
            message: settings.message.clone(),
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Count one request against `key`, resetting the window if it expired.
    pub async fn check(&self, key: &str) -> Decision {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        let state = windows.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(state.window_start) >= self.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count >= self.max_requests {
            let elapsed = now.duration_since(state.window_start);
            let retry_after = self.window.saturating_sub(elapsed).as_secs().max(1);
            return Decision::Denied {
                retry_after_secs: retry_after,
            };
        }

        state.count += 1;
        Decision::Allowed {
            remaining: self.max_requests - state.count,
        }
    }
}

/// Reject requests beyond the per-address limit before they reach a handler.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let key = extract_client_ip(&request, connect_info.as_ref())
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&key).await {
        Decision::Allowed { .. } => next.run(request).await,
        Decision::Denied { retry_after_secs } => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": limiter.message.clone() })),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
    }
}

/// Client address for rate-limit keying: forwarded headers first, so the
/// limiter keys on the real client behind a reverse proxy, then the peer
/// address.
fn extract_client_ip<B>(
    request: &axum::http::Request<B>,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    if let Some(forwarded) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded.split(',').next() {
            return Some(first_ip.trim().to_string());
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
    {
        return Some(real_ip.to_string());
    }

    connect_info.map(|ci| ci.0.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_requests: u32, window: Duration) -> RateLimitSettings {
        RateLimitSettings {
            max_requests,
            window,
            message: "Too many requests. Try again in 15 minutes.".to_string(),
        }
    }

    #[tokio::test]
    async fn allows_requests_within_limit() {
        let limiter = FixedWindowLimiter::new(&settings(5, Duration::from_secs(60)));
        for _ in 0..5 {
            assert!(matches!(
                limiter.check("1.2.3.4").await,
                Decision::Allowed { .. }
            ));
        }
    }

    #[tokio::test]
    async fn denies_request_over_limit() {
        let limiter = FixedWindowLimiter::new(&settings(3, Duration::from_secs(60)));
        for _ in 0..3 {
            limiter.check("1.2.3.4").await;
        }
        let decision = limiter.check("1.2.3.4").await;
        assert!(matches!(decision, Decision::Denied { retry_after_secs } if retry_after_secs >= 1));
    }

    #[tokio::test]
    async fn different_addresses_have_independent_windows() {
        let limiter = FixedWindowLimiter::new(&settings(2, Duration::from_secs(60)));
        limiter.check("1.1.1.1").await;
        limiter.check("1.1.1.1").await;
        assert!(matches!(
            limiter.check("1.1.1.1").await,
            Decision::Denied { .. }
        ));
        assert!(matches!(
            limiter.check("2.2.2.2").await,
            Decision::Allowed { .. }
        ));
    }

    #[tokio::test]
    async fn window_expiry_resets_the_counter() {
        let limiter = FixedWindowLimiter::new(&settings(1, Duration::from_millis(20)));
        assert!(matches!(
            limiter.check("1.2.3.4").await,
            Decision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check("1.2.3.4").await,
            Decision::Denied { .. }
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(
            limiter.check("1.2.3.4").await,
            Decision::Allowed { .. }
        ));
    }

    #[tokio::test]
    async fn remaining_counts_down() {
        let limiter = FixedWindowLimiter::new(&settings(3, Duration::from_secs(60)));
        assert_eq!(limiter.check("k").await, Decision::Allowed { remaining: 2 });
        assert_eq!(limiter.check("k").await, Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.check("k").await, Decision::Allowed { remaining: 0 });
    }

    #[test]
    fn extract_ip_prefers_x_forwarded_for() {
        let request = axum::http::Request::builder()
            .uri("/test")
            .header("X-Forwarded-For", "1.2.3.4, 5.6.7.8")
            .header("X-Real-IP", "9.9.9.9")
            .body(())
            .unwrap();
        assert_eq!(extract_client_ip(&request, None), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_ip_falls_back_to_x_real_ip() {
        let request = axum::http::Request::builder()
            .uri("/test")
            .header("X-Real-IP", "9.8.7.6")
            .body(())
            .unwrap();
        assert_eq!(extract_client_ip(&request, None), Some("9.8.7.6".to_string()));
    }

    #[test]
    fn extract_ip_none_without_headers_or_peer() {
        let request = axum::http::Request::builder().uri("/test").body(()).unwrap();
        assert_eq!(extract_client_ip(&request, None), None);
    }
}
