//! Audit trail handlers.

use axum::Json;
use axum::extract::{Query, State};

use rolodex_core::audit;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{AuditLogInfo, AuditLogQuery};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// `GET /api/admin/audit-logs`: newest-first audit rows with paging and an
/// optional action filter.
pub async fn list_audit_logs_handler(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<Vec<AuditLogInfo>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    let rows = audit::list_audit_logs(&state.pool, query.action.as_deref(), limit, offset)
        .await
        .map_err(AppError::from)?;
    Ok(Json(rows.into_iter().map(AuditLogInfo::from).collect()))
}
