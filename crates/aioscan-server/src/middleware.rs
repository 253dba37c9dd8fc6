use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use aioscan_scanner::ClientIdentity;
use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Sweep expired burst windows once the map grows past this many clients.
const BURST_SWEEP_THRESHOLD: usize = 10_000;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Resolve the scan-quota identity of a request: the first `X-Forwarded-For`
/// entry, then `X-Real-IP`, otherwise the shared anonymous bucket.
pub fn client_identity(headers: &HeaderMap) -> ClientIdentity {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let forwarded = header_value("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    ClientIdentity::from_address(forwarded.or_else(|| header_value("x-real-ip")))
}

#[derive(Debug, Clone)]
struct BurstWindow {
    started_at: Instant,
    count: usize,
}

/// Per-client fixed-window limiter guarding the scan route against bursts.
#[derive(Debug, Clone)]
pub struct BurstLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<ClientIdentity, BurstWindow>>>,
}

impl BurstLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }
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
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing a per-client request-per-window limit.
pub async fn enforce_burst_limit(
    State(burst): State<BurstLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let identity = client_identity(req.headers());
    let now = Instant::now();

    let mut windows = burst.windows.lock().await;
    if windows.len() > BURST_SWEEP_THRESHOLD {
        windows.retain(|_, w| now.duration_since(w.started_at) < burst.window);
    }

    let window = windows.entry(identity).or_insert(BurstWindow {
        started_at: now,
        count: 0,
    });
    let elapsed = now.duration_since(window.started_at);
    if elapsed >= burst.window {
        window.started_at = now;
        window.count = 0;
    }

    if window.count >= burst.max_requests {
        let retry_after = burst.window.saturating_sub(elapsed).as_secs().max(1);
        drop(windows);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "too many requests",
                },
            }),
        )
            .into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        return response;
    }

    window.count += 1;
    drop(windows);

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn identity_prefers_first_forwarded_entry() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
            ("x-real-ip", "198.51.100.1"),
        ]);
        assert_eq!(
            client_identity(&map),
            ClientIdentity::Address("203.0.113.9".to_string())
        );
    }

    #[test]
    fn identity_falls_back_to_real_ip() {
        let map = headers(&[("x-forwarded-for", " "), ("x-real-ip", "198.51.100.1")]);
        assert_eq!(
            client_identity(&map),
            ClientIdentity::Address("198.51.100.1".to_string())
        );
    }

    #[test]
    fn identity_without_headers_is_anonymous() {
        assert_eq!(client_identity(&HeaderMap::new()), ClientIdentity::Anonymous);
    }
}
