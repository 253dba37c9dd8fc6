use aioscan_scanner::{Admission, ScanError, ScanResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Deserialize;

use super::{map_scan_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::{client_identity, RequestId};

#[derive(Debug, Deserialize)]
pub(super) struct CheckRequest {
    domain: String,
}

/// `POST /api/v1/check`: admit the caller against its scan quota, then scan
/// the requested domain (served from cache when fresh).
pub(super) async fn check_domain(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ScanResult>>, ApiError> {
    let identity = client_identity(&headers);

    if let Admission::Limited { retry_after_secs } = state.limiter.admit(&identity).await {
        tracing::info!(client = %identity, retry_after_secs, "scan quota exhausted");
        return Err(map_scan_error(
            req_id.0,
            &ScanError::rate_limited(retry_after_secs),
        ));
    }

    let Json(request) = body.map_err(|rejection| {
        ApiError::new(
            req_id.0.clone(),
            "bad_request",
            format!("request body must be JSON with a \"domain\" field: {}", rejection.body_text()),
        )
    })?;

    let result = state
        .coordinator
        .scan(&request.domain, identity.persistable())
        .await
        .map_err(|e| map_scan_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: result,
        meta: ResponseMeta::new(req_id.0),
    }))
}
