mod check;
mod domains;
mod stats;

use std::sync::Arc;

use aioscan_scanner::{RateLimiter, ScanCoordinator, ScanError};
use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{enforce_burst_limit, request_id, BurstLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub coordinator: ScanCoordinator,
    pub limiter: Arc<RateLimiter>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
    #[serde(skip)]
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
            retry_after_secs: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "invalid_format" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let retry_after = self
            .retry_after_secs
            .and_then(|secs| HeaderValue::from_str(&secs.to_string()).ok());

        let mut response = (status, Json(self)).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

pub(super) fn map_scan_error(request_id: String, error: &ScanError) -> ApiError {
    match error {
        ScanError::RateLimited {
            retry_after_secs, ..
        } => ApiError::new(request_id, error.code(), error.to_string())
            .with_retry_after(*retry_after_secs),
        ScanError::PersistenceFailure(detail) => {
            tracing::error!(error = %detail, "scan persistence failed");
            ApiError::new(request_id, error.code(), "failed to store scan results")
        }
        ScanError::InvalidFormat(_) | ScanError::UpstreamUnavailable(_) => {
            ApiError::new(request_id, error.code(), error.to_string())
        }
    }
}

pub(super) fn map_db_error(request_id: String, error: &aioscan_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([header::RETRY_AFTER])
}

fn scan_router(burst: BurstLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/check", post(check::check_domain))
        .layer(axum::middleware::from_fn_with_state(
            burst,
            enforce_burst_limit,
        ))
}

pub fn build_app(state: AppState, burst: BurstLimitState) -> Router {
    let read_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/stats", get(stats::get_stats))
        .route("/api/v1/domains/{domain}", get(domains::get_domain));

    Router::new()
        .merge(read_routes)
        .merge(scan_router(burst))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match aioscan_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}
