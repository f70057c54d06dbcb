//! Fixed-window rate limiting middleware

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// Request counter for one client within the current window
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Per-client fixed-window limiter (N requests per window)
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
    max_requests: u32,
    window: Duration,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
            trust_proxy_headers: false,
        }
    }

    /// Key clients by `X-Forwarded-For`/`X-Real-IP`; only safe behind a proxy that sets them
    pub fn with_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Identify the caller: proxy headers when trusted, otherwise the peer address
    pub fn client_key<B>(&self, request: &Request<B>) -> String {
        let forwarded = if self.trust_proxy_headers {
            client_ip(request)
        } else {
            None
        };

        forwarded
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Count a request for `key` and decide whether it may proceed
    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut windows = self.windows.lock().await;

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let retry_after = self.window.saturating_sub(now.duration_since(entry.started));
            return Decision::Limited { retry_after };
        }

        entry.count += 1;
        Decision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    /// Drop windows that have fully elapsed
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let window = self.window;
        self.windows
            .lock()
            .await
            .retain(|_, w| now.duration_since(w.started) < window);
    }
}

/// Paths that are never limited; provider webhook retries share a handful of addresses
const EXEMPT_PATHS: &[&str] = &["/api/payments/webhook"];

/// Rate limiting middleware; pair with `axum::middleware::from_fn_with_state`
pub async fn rate_limit(
    axum::extract::State(limiter): axum::extract::State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let client_key = limiter.client_key(&request);

    match limiter.check(&client_key).await {
        Decision::Allowed { .. } => next.run(request).await,
        Decision::Limited { retry_after } => {
            tracing::warn!(client = %client_key, "Rate limit exceeded");
            let retry_after = retry_after.as_secs().max(1).to_string();
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after)],
                axum::Json(serde_json::json!({
                    "error": {
                        "code": "TOO_MANY_REQUESTS",
                        "message": "Too many requests. Please try again later."
                    }
                })),
            )
                .into_response()
        }
    }
}

/// Extract client IP from proxy headers
pub fn client_ip<B>(request: &Request<B>) -> Option<String> {
    let headers = request.headers();

    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|ip| ip.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limits_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for expected in [2, 1, 0] {
            assert_eq!(
                limiter.check_at("client", now).await,
                Decision::Allowed {
                    remaining: expected
                }
            );
        }

        assert!(matches!(
            limiter.check_at("client", now).await,
            Decision::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(matches!(
            limiter.check_at("client", now).await,
            Decision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("client", now + Duration::from_secs(30)).await,
            Decision::Limited { .. }
        ));
        assert!(matches!(
            limiter.check_at("client", now + Duration::from_secs(61)).await,
            Decision::Allowed { .. }
        ));
    }

    fn request_from(peer: &str, forwarded_for: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/api/books");
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded_for);
        }
        let mut request = builder.body(()).unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[test]
    fn test_client_key_uses_peer_address() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let request = request_from("10.0.0.7:51000", Some("203.0.113.9"));

        assert_eq!(limiter.client_key(&request), "10.0.0.7");
    }

    #[test]
    fn test_client_key_trusts_proxy_when_configured() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60)).with_proxy_headers(true);

        let request = request_from("10.0.0.7:51000", Some("203.0.113.9, 10.0.0.1"));
        assert_eq!(limiter.client_key(&request), "203.0.113.9");

        let request = request_from("10.0.0.7:51000", None);
        assert_eq!(limiter.client_key(&request), "10.0.0.7");
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(matches!(limiter.check("a").await, Decision::Allowed { .. }));
        assert!(matches!(limiter.check("b").await, Decision::Allowed { .. }));
        assert!(matches!(limiter.check("a").await, Decision::Limited { .. }));
    }
}
