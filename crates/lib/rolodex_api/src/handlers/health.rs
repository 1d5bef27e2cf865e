//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::models::HealthResponse;

/// `GET /api/health`: database ping and build version. Always 200; load
/// balancer probes read the body.
pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let db_connected = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();
    Ok(Json(HealthResponse {
        status: "ok".into(),
        version: rolodex_core::version().to_string(),
        db_connected,
    }))
}
