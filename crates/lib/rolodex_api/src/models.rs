//! API request and response models.
//!
//! Wire shapes are camelCase; internal models live in `rolodex_core` and are
//! converted at the handler boundary.

use chrono::{DateTime, Utc};
use rolodex_core::audit::AuditLogEntry;
use rolodex_core::models::auth::{Admin, Principal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Body for endpoints that only report success.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `GET /api/auth/me` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub email: String,
    pub admin: bool,
    pub emergency: bool,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
}

impl From<Principal> for MeResponse {
    fn from(p: Principal) -> Self {
        Self {
            email: p.email,
            admin: p.admin,
            emergency: p.emergency,
            issued_at: p.issued_at,
            expires_at: p.expires_at,
        }
    }
}

/// `POST /api/auth/exchange-office-token` request.
#[derive(Debug, Deserialize)]
pub struct OfficeExchangeRequest {
    pub token: String,
}

/// Response for endpoints that establish a session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub expires_in: i64,
}

/// `POST /api/auth/refresh` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub expires_in: i64,
}

/// `GET /api/admin/check` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCheckResponse {
    pub is_admin: bool,
}

/// URL token carried by the emergency login endpoints.
#[derive(Debug, Deserialize)]
pub struct EmergencyTokenQuery {
    pub token: Option<String>,
}

/// `POST /api/admin/emergency/login` request.
#[derive(Debug, Deserialize)]
pub struct EmergencyLoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/admin/emergency/verify-token` response.
#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
}

/// `POST /api/admin/users` request.
#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub username: Option<String>,
}

/// One admin allowlist row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminInfo {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl From<Admin> for AdminInfo {
    fn from(a: Admin) -> Self {
        Self {
            id: a.id,
            email: a.email,
            username: a.username,
            created_at: a.created_at,
            created_by: a.created_by,
        }
    }
}

/// Query parameters for `GET /api/admin/audit-logs`.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One audit row as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogInfo {
    pub id: Uuid,
    pub action: String,
    pub admin_email: String,
    pub target_email: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogEntry> for AuditLogInfo {
    fn from(e: AuditLogEntry) -> Self {
        Self {
            id: e.id,
            action: e.action,
            admin_email: e.admin_email,
            target_email: e.target_email,
            metadata: e.metadata,
            created_at: e.created_at,
        }
    }
}

/// `GET /api/admin/settings` response. Secrets are reported as set/unset,
/// never echoed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub graph_tenant_id: String,
    pub graph_client_id: String,
    pub graph_client_secret_set: bool,
    pub okta_org_url: String,
    pub okta_api_token_set: bool,
    pub cache_ttl_secs: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

/// `PUT /api/admin/settings` request. Absent fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub graph_tenant_id: Option<String>,
    pub graph_client_id: Option<String>,
    pub graph_client_secret: Option<String>,
    pub okta_org_url: Option<String>,
    pub okta_api_token: Option<String>,
    pub cache_ttl_secs: Option<i64>,
}

/// `POST /api/admin/settings/test` response.
#[derive(Debug, Serialize)]
pub struct ConnectivityTestResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/health` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub db_connected: bool,
}

/// Query parameters for `GET /api/directory/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<u32>,
}

/// Query parameters for `GET /api/auth/oauth`.
#[derive(Debug, Default, Deserialize)]
pub struct OAuthStartQuery {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

/// Query parameters Microsoft sends to the OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_response_serializes_camel_case() {
        let me = MeResponse {
            email: "jo@example.com".into(),
            admin: true,
            emergency: false,
            issued_at: Some(100),
            expires_at: Some(200),
        };
        let json = serde_json::to_string(&me).unwrap();
        assert!(json.contains("\"issuedAt\":100"));
        assert!(json.contains("\"expiresAt\":200"));
    }

    #[test]
    fn admin_check_uses_is_admin_key() {
        let json = serde_json::to_string(&AdminCheckResponse { is_admin: true }).unwrap();
        assert_eq!(json, "{\"isAdmin\":true}");
    }

    #[test]
    fn update_settings_accepts_partial_body() {
        let req: UpdateSettingsRequest =
            serde_json::from_str("{\"graphTenantId\":\"t1\"}").unwrap();
        assert_eq!(req.graph_tenant_id.as_deref(), Some("t1"));
        assert!(req.okta_api_token.is_none());
    }
}
