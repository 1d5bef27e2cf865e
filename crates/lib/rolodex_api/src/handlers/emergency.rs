//! Break-glass login handlers.
//!
//! Two gates in order: the URL token, then the configured credentials.
//! Every attempt lands in the audit trail, successful or not.

use axum::Json;
use axum::extract::{Query, State};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::warn;

use rolodex_core::audit::AuditAction;
use rolodex_core::auth::breakglass;
use rolodex_core::auth::jwt::{self, EMERGENCY_SESSION_TTL_SECS};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    EmergencyLoginRequest, EmergencyTokenQuery, SessionResponse, VerifyTokenResponse,
};
use crate::services::cookies;

/// `POST /api/admin/emergency/verify-token`: pre-check the URL token before
/// the credential form is shown.
pub async fn verify_token_handler(
    State(state): State<AppState>,
    Query(query): Query<EmergencyTokenQuery>,
) -> AppResult<Json<VerifyTokenResponse>> {
    let valid = breakglass::verify_emergency_token(
        query.token.as_deref().unwrap_or(""),
        &state.config.emergency_access_token,
    );
    Ok(Json(VerifyTokenResponse { valid }))
}

/// `POST /api/admin/emergency/login`: establish a one-hour emergency session.
pub async fn login_handler(
    State(state): State<AppState>,
    Query(query): Query<EmergencyTokenQuery>,
    jar: CookieJar,
    Json(body): Json<EmergencyLoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    if !breakglass::verify_emergency_token(
        query.token.as_deref().unwrap_or(""),
        &state.config.emergency_access_token,
    ) {
        warn!(email = %body.email, "emergency login with a bad URL token");
        state.audit.record(
            AuditAction::BreakGlassLogin,
            &body.email,
            None,
            Some(json!({ "success": false, "reason": "Invalid URL token" })),
        );
        return Err(AppError::Unauthorized(
            "Invalid emergency access token".into(),
        ));
    }

    if !breakglass::verify_credentials(
        &body.email,
        &body.password,
        &state.config.break_glass_email,
        &state.config.break_glass_password,
    ) {
        state.audit.record(
            AuditAction::FailedLogin,
            &body.email,
            None,
            Some(json!({ "reason": "Invalid break-glass credentials" })),
        );
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = jwt::issue_with_lifetime(
        &body.email,
        false,
        true,
        EMERGENCY_SESSION_TTL_SECS,
        state.config.jwt_secret.as_bytes(),
    )
    .map_err(AppError::from)?;
    state.audit.record(
        AuditAction::BreakGlassLogin,
        &body.email,
        None,
        Some(json!({ "success": true })),
    );
    let jar = jar.add(cookies::session_cookie(
        &token,
        EMERGENCY_SESSION_TTL_SECS,
        state.config.secure_cookies,
    ));
    Ok((
        jar,
        Json(SessionResponse {
            success: true,
            token,
            expires_in: EMERGENCY_SESSION_TTL_SECS,
        }),
    ))
}
