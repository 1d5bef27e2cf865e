//! Admin allowlist management handlers.

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use serde_json::json;
use uuid::Uuid;

use rolodex_core::audit::AuditAction;
use rolodex_core::auth::queries;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentPrincipal;
use crate::models::{AdminInfo, CreateAdminRequest, SuccessResponse};

/// `GET /api/admin/users`: list the admin allowlist.
pub async fn list_admins_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AdminInfo>>> {
    let admins = queries::list_admins(&state.pool)
        .await
        .map_err(AppError::from)?;
    Ok(Json(admins.into_iter().map(AdminInfo::from).collect()))
}

/// `POST /api/admin/users`: add an admin.
pub async fn create_admin_handler(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Json(body): Json<CreateAdminRequest>,
) -> AppResult<Json<AdminInfo>> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    if queries::find_admin_by_email(&state.pool, &email)
        .await
        .map_err(AppError::from)?
        .is_some()
    {
        return Err(AppError::Validation(format!("{email} is already an admin")));
    }
    let admin = queries::create_admin(
        &state.pool,
        &email,
        body.username.as_deref(),
        &principal.email,
    )
    .await
    .map_err(AppError::from)?;
    state
        .audit
        .record(AuditAction::CreateAdmin, &principal.email, Some(&email), None);
    Ok(Json(admin.into()))
}

/// `DELETE /api/admin/users/{id}`: remove an admin. Self-deletion is
/// rejected so the allowlist cannot lose its last usable entry by accident.
pub async fn delete_admin_handler(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SuccessResponse>> {
    let target = queries::find_admin_by_id(&state.pool, id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("Admin not found".into()))?;
    if target.email.eq_ignore_ascii_case(&principal.email) {
        return Err(AppError::Validation(
            "You cannot remove your own admin access".into(),
        ));
    }
    queries::delete_admin(&state.pool, id)
        .await
        .map_err(AppError::from)?;
    state.audit.record(
        AuditAction::DeleteAdmin,
        &principal.email,
        Some(&target.email),
        Some(json!({ "id": id })),
    );
    Ok(Json(SuccessResponse::ok()))
}
