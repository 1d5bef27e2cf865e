//! Tenant settings handlers.

use std::time::Duration;

use axum::Extension;
use axum::Json;
use axum::extract::State;
use serde_json::json;

use rolodex_core::audit::AuditAction;
use rolodex_core::settings::{self, TenantSettingsUpdate};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentPrincipal;
use crate::models::{ConnectivityTestResponse, SettingsResponse, UpdateSettingsRequest};

/// `GET /api/admin/settings`: effective settings with secrets redacted to
/// set/unset flags.
pub async fn get_settings_handler(
    State(state): State<AppState>,
) -> AppResult<Json<SettingsResponse>> {
    Ok(Json(settings_response(&state).await?))
}

/// `PUT /api/admin/settings`: update the stored settings row.
///
/// The audit entry names the fields that changed; secret values never reach
/// the trail.
pub async fn update_settings_handler(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Json(body): Json<UpdateSettingsRequest>,
) -> AppResult<Json<SettingsResponse>> {
    if let Some(ttl) = body.cache_ttl_secs
        && ttl < 0
    {
        return Err(AppError::Validation(
            "cacheTtlSecs must be zero or positive".into(),
        ));
    }

    let mut fields: Vec<&str> = Vec::new();
    if body.graph_tenant_id.is_some() {
        fields.push("graphTenantId");
    }
    if body.graph_client_id.is_some() {
        fields.push("graphClientId");
    }
    if body.graph_client_secret.is_some() {
        fields.push("graphClientSecret");
    }
    if body.okta_org_url.is_some() {
        fields.push("oktaOrgUrl");
    }
    if body.okta_api_token.is_some() {
        fields.push("oktaApiToken");
    }
    if body.cache_ttl_secs.is_some() {
        fields.push("cacheTtlSecs");
    }

    let update = TenantSettingsUpdate {
        graph_tenant_id: body.graph_tenant_id,
        graph_client_id: body.graph_client_id,
        graph_client_secret: body.graph_client_secret,
        okta_org_url: body.okta_org_url,
        okta_api_token: body.okta_api_token,
        cache_ttl_secs: body.cache_ttl_secs,
    };
    settings::upsert(
        &state.pool,
        &update,
        &state.config.settings_encryption_key,
        &principal.email,
    )
    .await
    .map_err(AppError::from)?;
    state.reload_settings().await?;
    state.audit.record(
        AuditAction::UpdateSettings,
        &principal.email,
        None,
        Some(json!({ "fields": fields })),
    );
    Ok(Json(settings_response(&state).await?))
}

/// `POST /api/admin/settings/test`: Microsoft Graph connectivity probe with
/// a short timeout. Always 200; the body reports the outcome.
pub async fn test_settings_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ConnectivityTestResponse>> {
    let resp = match state.graph.connectivity_test(Duration::from_secs(5)).await {
        Ok(()) => ConnectivityTestResponse {
            success: true,
            message: "Microsoft Graph connection OK".into(),
        },
        Err(e) => ConnectivityTestResponse {
            success: false,
            message: e.to_string(),
        },
    };
    Ok(Json(resp))
}

async fn settings_response(state: &AppState) -> AppResult<SettingsResponse> {
    let stored = settings::load(&state.pool, &state.config.settings_encryption_key)
        .await
        .map_err(AppError::from)?;
    let effective = state.settings.read().await.clone();
    let (updated_at, updated_by) = stored
        .map(|s| (s.updated_at, s.updated_by))
        .unwrap_or((None, None));
    Ok(SettingsResponse {
        graph_tenant_id: effective.graph_tenant_id,
        graph_client_id: effective.graph_client_id,
        graph_client_secret_set: !effective.graph_client_secret.is_empty(),
        okta_org_url: effective.okta_org_url,
        okta_api_token_set: !effective.okta_api_token.is_empty(),
        cache_ttl_secs: effective.cache_ttl_secs,
        updated_at,
        updated_by,
    })
}
