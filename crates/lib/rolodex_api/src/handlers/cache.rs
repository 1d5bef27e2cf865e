//! Cache administration handlers.

use axum::Json;
use axum::extract::State;

use rolodex_core::cache::CacheStats;

use crate::AppState;
use crate::error::AppResult;
use crate::models::SuccessResponse;

/// `GET /api/admin/cache`: entry count, hit/miss counters and current TTL.
pub async fn cache_stats_handler(State(state): State<AppState>) -> AppResult<Json<CacheStats>> {
    Ok(Json(state.cache.stats()))
}

/// `DELETE /api/admin/cache`: drop every cached directory response.
pub async fn clear_cache_handler(
    State(state): State<AppState>,
) -> AppResult<Json<SuccessResponse>> {
    state.cache.clear();
    Ok(Json(SuccessResponse::ok()))
}
