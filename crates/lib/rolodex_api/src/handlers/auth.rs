//! Session request handlers.

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;

use rolodex_core::audit::AuditAction;
use rolodex_core::auth::{easyauth, jwt, queries};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentPrincipal;
use crate::models::{AdminCheckResponse, MeResponse, RefreshResponse, SuccessResponse};
use crate::services::cookies;

/// `GET /api/auth/me`: the current principal.
pub async fn me_handler(
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
) -> AppResult<Json<MeResponse>> {
    Ok(Json(principal.into()))
}

/// `POST /api/auth/refresh`: rotate a still-valid session token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<(CookieJar, Json<RefreshResponse>)> {
    let token = cookies::extract_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
    let secret = state.config.jwt_secret.as_bytes();
    let refreshed = jwt::refresh(&token, secret).map_err(AppError::from)?;
    let claims = jwt::verify(&refreshed, secret).map_err(AppError::from)?;
    let expires_in = claims.exp - claims.iat;
    state
        .audit
        .record(AuditAction::TokenRefresh, &claims.sub, None, None);
    let jar = jar.add(cookies::session_cookie(
        &refreshed,
        expires_in,
        state.config.secure_cookies,
    ));
    Ok((
        jar,
        Json(RefreshResponse {
            success: true,
            expires_in,
        }),
    ))
}

/// `POST /api/auth/logout`: clear the session cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<(CookieJar, Json<SuccessResponse>)> {
    // Attribution is best-effort; the cookie is cleared either way.
    if let Some(token) = cookies::extract_token(&headers)
        && let Ok(claims) = jwt::verify(&token, state.config.jwt_secret.as_bytes())
    {
        state
            .audit
            .record(AuditAction::AuthLogout, &claims.sub, None, None);
    }
    let jar = jar.add(cookies::clear_session_cookie(state.config.secure_cookies));
    Ok((jar, Json(SuccessResponse::ok())))
}

/// `GET /api/admin/check`: admin status for UI gating. Fails soft, an
/// unidentified caller is simply not an admin.
pub async fn admin_check_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<AdminCheckResponse>> {
    // A verified session token answers directly.
    if let Some(token) = cookies::extract_token(&headers)
        && let Ok(claims) = jwt::verify(&token, state.config.jwt_secret.as_bytes())
    {
        return Ok(Json(AdminCheckResponse {
            is_admin: claims.admin || claims.emergency,
        }));
    }
    // Otherwise the platform header names the identity to look up.
    let is_admin = match headers
        .get(easyauth::PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(easyauth::principal_email)
    {
        Some(email) => queries::is_admin_email(&state.pool, &email)
            .await
            .map_err(AppError::from)?,
        None => false,
    };
    Ok(Json(AdminCheckResponse { is_admin }))
}
