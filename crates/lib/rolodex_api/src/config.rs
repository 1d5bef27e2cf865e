//! API server configuration.

use rolodex_core::auth::jwt::resolve_jwt_secret;
use rolodex_core::settings::TenantSettings;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3200").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Microsoft Entra tenant ID for OAuth and Graph calls.
    pub graph_tenant_id: String,
    /// Microsoft Entra application (client) ID.
    pub graph_client_id: String,
    /// Microsoft Entra client secret.
    pub graph_client_secret: String,
    /// Redirect URI registered for the OAuth code flow.
    pub oauth_redirect_uri: String,
    /// Okta org base URL (e.g. "https://acme.okta.com").
    pub okta_org_url: String,
    /// Okta API token for directory lookups.
    pub okta_api_token: String,
    /// URL token gating the emergency login page.
    pub emergency_access_token: String,
    /// Break-glass login email.
    pub break_glass_email: String,
    /// Break-glass login password (plain or bcrypt hash).
    pub break_glass_password: String,
    /// Admin seeded on first startup, if set.
    pub initial_admin_email: Option<String>,
    /// CORS allowlist; empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Directory response cache TTL in seconds.
    pub cache_ttl_secs: u64,
    /// Encryption key for tenant secrets stored in the database.
    pub settings_encryption_key: String,
    /// Whether session cookies are marked `Secure`.
    pub secure_cookies: bool,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable           | Default                                     |
    /// |--------------------|---------------------------------------------|
    /// | `BIND_ADDR`        | `127.0.0.1:3200`                            |
    /// | `DATABASE_URL`     | `postgres://localhost:5432/rolodex`          |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file        |
    /// | `GRAPH_TENANT_ID`  | empty (Microsoft sign-in disabled)          |
    /// | `GRAPH_CLIENT_ID`  | empty                                       |
    /// | `GRAPH_CLIENT_SECRET` | empty                                    |
    /// | `OAUTH_REDIRECT_URI` | `http://localhost:3200/api/auth/oauth/callback` |
    /// | `OKTA_ORG_URL`     | empty (directory gate fails closed)         |
    /// | `OKTA_API_TOKEN`   | empty                                       |
    /// | `EMERGENCY_ACCESS_TOKEN` | empty (emergency login disabled)      |
    /// | `BREAK_GLASS_EMAIL` | empty                                      |
    /// | `BREAK_GLASS_PASSWORD` | empty                                   |
    /// | `INITIAL_ADMIN_EMAIL` | unset (no admin seeded)                  |
    /// | `ALLOWED_ORIGINS`  | empty (any origin)                          |
    /// | `CACHE_TTL_SECS`   | `300`                                       |
    /// | `SETTINGS_ENCRYPTION_KEY` | dev default, change in production     |
    /// | `APP_ENV`          | `development` (`production` enables Secure cookies) |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3200".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/rolodex".into()),
            jwt_secret: resolve_jwt_secret(),
            graph_tenant_id: std::env::var("GRAPH_TENANT_ID").unwrap_or_default(),
            graph_client_id: std::env::var("GRAPH_CLIENT_ID").unwrap_or_default(),
            graph_client_secret: std::env::var("GRAPH_CLIENT_SECRET").unwrap_or_default(),
            oauth_redirect_uri: std::env::var("OAUTH_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:3200/api/auth/oauth/callback".into()),
            okta_org_url: std::env::var("OKTA_ORG_URL").unwrap_or_default(),
            okta_api_token: std::env::var("OKTA_API_TOKEN").unwrap_or_default(),
            emergency_access_token: std::env::var("EMERGENCY_ACCESS_TOKEN").unwrap_or_default(),
            break_glass_email: std::env::var("BREAK_GLASS_EMAIL").unwrap_or_default(),
            break_glass_password: std::env::var("BREAK_GLASS_PASSWORD").unwrap_or_default(),
            initial_admin_email: std::env::var("INITIAL_ADMIN_EMAIL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            settings_encryption_key: std::env::var("SETTINGS_ENCRYPTION_KEY").unwrap_or_else(
                |_| "rolodex-settings-default-dev-key-change-in-production".into(),
            ),
            secure_cookies: std::env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        }
    }

    /// Tenant settings as configured by the environment alone, before any
    /// stored overrides are applied.
    pub fn initial_settings(&self) -> TenantSettings {
        TenantSettings {
            graph_tenant_id: self.graph_tenant_id.clone(),
            graph_client_id: self.graph_client_id.clone(),
            graph_client_secret: self.graph_client_secret.clone(),
            okta_org_url: self.okta_org_url.clone(),
            okta_api_token: self.okta_api_token.clone(),
            cache_ttl_secs: self.cache_ttl_secs,
        }
    }
}
