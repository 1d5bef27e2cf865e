//! Authentication middleware: session verification and route guards.

use axum::http::HeaderMap;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use rolodex_core::auth::{AuthError, easyauth, jwt};
use rolodex_core::models::auth::Principal;

use crate::AppState;
use crate::error::AppError;
use crate::services;
use crate::services::cookies;

/// Key used to store the verified `Principal` in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

/// Axum middleware: resolves the request identity and injects
/// `CurrentPrincipal` into request extensions.
///
/// A session token (bearer or cookie) wins. Without a usable token, an Easy
/// Auth platform header is accepted if the named email passes the directory
/// gate; header principals never carry privileges.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(CurrentPrincipal(principal));
    Ok(next.run(request).await)
}

/// Axum middleware: like `require_auth`, but demands admin or emergency
/// privilege on a verified session token.
///
/// Easy Auth headers are ignored here, privileges only ever come from a
/// token this service signed. No token is a 401; a verified token without
/// privilege is a 403.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookies::extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
    let claims = jwt::verify(&token, state.config.jwt_secret.as_bytes()).map_err(AppError::from)?;
    if !(claims.admin || claims.emergency) {
        return Err(AppError::Forbidden("Admin access required".into()));
    }
    request
        .extensions_mut()
        .insert(CurrentPrincipal(Principal::from_claims(&claims)));
    Ok(next.run(request).await)
}

/// Resolve a request to a principal: session token first, Easy Auth header
/// as the fallback. A token failure is only reported if no fallback
/// identity exists.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, AppError> {
    let mut token_failure = None;
    if let Some(token) = cookies::extract_token(headers) {
        match jwt::verify(&token, state.config.jwt_secret.as_bytes()) {
            Ok(claims) => return Ok(Principal::from_claims(&claims)),
            Err(AuthError::TokenExpired) => {
                token_failure = Some(AppError::Unauthorized("Token expired".into()));
            }
            Err(_) => token_failure = Some(AppError::Unauthorized("Invalid token".into())),
        }
    }

    if let Some(email) = headers
        .get(easyauth::PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(easyauth::principal_email)
    {
        if services::auth::directory_member(state, &email).await? {
            return Ok(Principal::from_header_email(&email));
        }
        return Err(AppError::Forbidden("Not a member of the directory".into()));
    }

    Err(token_failure.unwrap_or_else(|| AppError::Unauthorized("Authentication required".into())))
}
