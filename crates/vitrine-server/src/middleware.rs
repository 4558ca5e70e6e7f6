use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;
use vitrine_core::RateLimitSettings;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
/// Expired windows are swept once this many clients are tracked.
const PRUNE_THRESHOLD: usize = 1024;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter with one window per client. The catalog is public,
/// so this is the only protection in front of the feed refresh path.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.max_requests,
            Duration::from_secs(settings.window_secs),
        )
    }

    /// Counts one request for `client`; false once its window is spent.
    async fn admit(&self, client: String) -> bool {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();

        if clients.len() >= PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started_at) < window);
        }

        let entry = clients.entry(client).or_insert(RateLimitWindow {
            started_at: now,
            count: 0,
        });
        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// First `x-forwarded-for` hop when a proxy sets one, else the peer address.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    res
}

/// Middleware enforcing the per-client request-per-window limit.
///
/// A limit of zero requests disables the check.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if rate_limit.max_requests == 0 {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer);

    if !rate_limit.admit(client.clone()).await {
        tracing::debug!(
            client = %client,
            max_requests = rate_limit.max_requests,
            "rate limit exceeded"
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "rate limit exceeded",
                },
            }),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    fn limited_app(max_requests: usize) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimitState::new(max_requests, Duration::from_secs(60)),
                enforce_rate_limit,
            ))
            .layer(axum::middleware::from_fn(request_id))
    }

    fn get_root() -> Request {
        axum::http::Request::builder()
            .uri("/")
            .body(Body::empty())
            .expect("request")
    }

    fn get_root_from(client: &str) -> Request {
        axum::http::Request::builder()
            .uri("/")
            .header(FORWARDED_FOR_HEADER, client)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn rate_limit_rejects_requests_over_the_window() {
        let app = limited_app(2);
        for _ in 0..2 {
            let response = app.clone().oneshot(get_root()).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app.oneshot(get_root()).await.expect("response");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn rate_limit_windows_are_per_client() {
        let app = limited_app(1);
        let first = app
            .clone()
            .oneshot(get_root_from("203.0.113.7"))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let repeat = app
            .clone()
            .oneshot(get_root_from("203.0.113.7, 10.0.0.1"))
            .await
            .expect("response");
        assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app
            .oneshot(get_root_from("198.51.100.2"))
            .await
            .expect("response");
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn zero_limit_lets_everything_through() {
        let app = limited_app(0);
        for _ in 0..5 {
            let response = app.clone().oneshot(get_root()).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[test]
    fn client_key_prefers_forwarded_hop_over_peer() {
        let peer: SocketAddr = "192.0.2.1:5000".parse().expect("addr");
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, Some(peer)), "192.0.2.1");
        assert_eq!(client_key(&headers, None), "unknown");

        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.9");
    }

    #[tokio::test]
    async fn expired_windows_are_pruned() {
        let limiter = RateLimitState::new(1, Duration::from_millis(1));
        for i in 0..PRUNE_THRESHOLD {
            assert!(limiter.admit(format!("client-{i}")).await);
        }
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.admit("late".to_string()).await);
        assert_eq!(limiter.clients.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn request_id_is_generated_when_absent() {
        let response = limited_app(10).oneshot(get_root()).await.expect("response");
        let id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .expect("request id header");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn request_id_is_echoed_when_present() {
        let request = axum::http::Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .expect("request");
        let response = limited_app(10).oneshot(request).await.expect("response");
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).map(HeaderValue::as_bytes),
            Some(&b"req-42"[..])
        );
    }
}
