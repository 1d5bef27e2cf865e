//! Microsoft sign-in handlers: OAuth code flow and Office SSO exchange.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use rolodex_core::auth::jwt::SESSION_TTL_SECS;
use rolodex_core::auth::oauth;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{OAuthCallbackQuery, OAuthStartQuery, OfficeExchangeRequest, SessionResponse};
use crate::services::{auth, cookies};

/// `GET /api/auth/oauth`: redirect to the Microsoft login page.
pub async fn oauth_start_handler(
    State(state): State<AppState>,
    Query(query): Query<OAuthStartQuery>,
) -> AppResult<Redirect> {
    let settings = state.settings.read().await;
    if settings.graph_tenant_id.is_empty() || settings.graph_client_id.is_empty() {
        return Err(AppError::Internal(
            "Microsoft sign-in is not configured".into(),
        ));
    }
    let url = oauth::authorize_url(
        &settings.graph_tenant_id,
        &settings.graph_client_id,
        &state.config.oauth_redirect_uri,
        query.return_to.as_deref(),
    )
    .map_err(AppError::from)?;
    Ok(Redirect::temporary(url.as_str()))
}

/// `GET /api/auth/oauth/callback`: finish the code flow and set the session
/// cookie.
///
/// A provider-reported error (user cancelled, consent denied) redirects back
/// to the app with the error code; no token exchange is attempted.
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> AppResult<(CookieJar, Redirect)> {
    if let Some(error) = query.error.as_deref() {
        warn!(
            error,
            description = query.error_description.as_deref().unwrap_or(""),
            "OAuth callback reported an error"
        );
        let code: String = url::form_urlencoded::byte_serialize(error.as_bytes()).collect();
        return Ok((jar, Redirect::temporary(&format!("/?error={code}"))));
    }

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AppError::Validation("Missing authorization code".into()))?;
    let return_to = oauth::decode_state(query.state.as_deref().unwrap_or(""));

    let (tenant_id, client_id, client_secret) = {
        let settings = state.settings.read().await;
        if settings.graph_tenant_id.is_empty()
            || settings.graph_client_id.is_empty()
            || settings.graph_client_secret.is_empty()
        {
            return Err(AppError::Internal(
                "Microsoft sign-in is not configured".into(),
            ));
        }
        (
            settings.graph_tenant_id.clone(),
            settings.graph_client_id.clone(),
            settings.graph_client_secret.clone(),
        )
    };

    let login = oauth::exchange_code(
        &state.http,
        &tenant_id,
        &client_id,
        &client_secret,
        code,
        &state.config.oauth_redirect_uri,
    )
    .await
    .map_err(AppError::from)?;

    let token = auth::establish_session(&state, &login.email, "oauth").await?;
    let jar = jar.add(cookies::session_cookie(
        &token,
        SESSION_TTL_SECS,
        state.config.secure_cookies,
    ));
    Ok((jar, Redirect::temporary(&return_to)))
}

/// `POST /api/auth/exchange-office-token`: validate an Office identity token
/// and start a session.
pub async fn exchange_office_token_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<OfficeExchangeRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let email = state
        .office
        .validate(&body.token)
        .await
        .map_err(AppError::from)?;
    let token = auth::establish_session(&state, &email, "office").await?;
    let jar = jar.add(cookies::session_cookie(
        &token,
        SESSION_TTL_SECS,
        state.config.secure_cookies,
    ));
    Ok((
        jar,
        Json(SessionResponse {
            success: true,
            token,
            expires_in: SESSION_TTL_SECS,
        }),
    ))
}
