use aioscan_core::{GlobalStats, StatsView};
use axum::{extract::State, Extension, Json};
use serde::Serialize;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct StatsResponse {
    stats: GlobalStats,
    view: StatsView,
}

pub(super) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatsResponse>>, ApiError> {
    let stats = state
        .coordinator
        .aggregator()
        .snapshot()
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let view = stats.view();

    Ok(Json(ApiResponse {
        data: StatsResponse { stats, view },
        meta: ResponseMeta::new(req_id.0),
    }))
}
