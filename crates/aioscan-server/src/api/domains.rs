use aioscan_scanner::DomainReport;
use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{map_scan_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

/// `GET /api/v1/domains/{domain}`: the persisted record of a domain of any
/// age. Never triggers a provider fetch.
pub(super) async fn get_domain(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(domain): Path<String>,
) -> Result<Json<ApiResponse<DomainReport>>, ApiError> {
    let report = state
        .coordinator
        .lookup(&domain)
        .await
        .map_err(|e| map_scan_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("domain {domain} has not been scanned"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
