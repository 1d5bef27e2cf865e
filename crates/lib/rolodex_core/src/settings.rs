//! Tenant integration settings.
//!
//! One admin-managed row holds the Okta and Microsoft Graph configuration,
//! overriding environment defaults. Secret columns are stored encrypted
//! (see [`crate::secrets`]); the decrypted, effective settings live behind
//! an `RwLock` on the API state and are swapped on update.

use sqlx::PgPool;
use thiserror::Error;
use tracing::warn;

use crate::secrets;

/// Settings errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Effective integration settings: environment defaults overlaid by the
/// stored row. Secrets are plaintext here, in memory only.
#[derive(Debug, Clone, Default)]
pub struct TenantSettings {
    pub graph_tenant_id: String,
    pub graph_client_id: String,
    pub graph_client_secret: String,
    pub okta_org_url: String,
    pub okta_api_token: String,
    pub cache_ttl_secs: u64,
}

impl TenantSettings {
    /// Overlay a stored row over these defaults. Empty stored values are
    /// treated as unset so a blank admin form cannot wipe env config.
    pub fn overlaid(mut self, stored: &StoredSettings) -> Self {
        if let Some(v) = &stored.graph_tenant_id
            && !v.is_empty()
        {
            self.graph_tenant_id = v.clone();
        }
        if let Some(v) = &stored.graph_client_id
            && !v.is_empty()
        {
            self.graph_client_id = v.clone();
        }
        if let Some(v) = &stored.graph_client_secret
            && !v.is_empty()
        {
            self.graph_client_secret = v.clone();
        }
        if let Some(v) = &stored.okta_org_url
            && !v.is_empty()
        {
            self.okta_org_url = v.clone();
        }
        if let Some(v) = &stored.okta_api_token
            && !v.is_empty()
        {
            self.okta_api_token = v.clone();
        }
        if let Some(v) = stored.cache_ttl_secs
            && v >= 0
        {
            self.cache_ttl_secs = v as u64;
        }
        self
    }
}

/// The stored settings row, secrets already decrypted.
#[derive(Debug, Clone, Default)]
pub struct StoredSettings {
    pub graph_tenant_id: Option<String>,
    pub graph_client_id: Option<String>,
    pub graph_client_secret: Option<String>,
    pub okta_org_url: Option<String>,
    pub okta_api_token: Option<String>,
    pub cache_ttl_secs: Option<i64>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_by: Option<String>,
}

/// Fields accepted by an update. `None` preserves the stored value.
#[derive(Debug, Clone, Default)]
pub struct TenantSettingsUpdate {
    pub graph_tenant_id: Option<String>,
    pub graph_client_id: Option<String>,
    pub graph_client_secret: Option<String>,
    pub okta_org_url: Option<String>,
    pub okta_api_token: Option<String>,
    pub cache_ttl_secs: Option<i64>,
}

/// Load the settings row, decrypting secrets.
///
/// A secret that no longer decrypts (rotated encryption key) is warn-logged
/// and surfaced as unset rather than failing the whole load; the admin can
/// re-enter it.
pub async fn load(
    pool: &PgPool,
    encryption_key: &str,
) -> Result<Option<StoredSettings>, SettingsError> {
    type Row = (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<i64>,
        chrono::DateTime<chrono::Utc>,
        Option<String>,
    );
    let row = sqlx::query_as::<_, Row>(
        "SELECT graph_tenant_id, graph_client_id, graph_client_secret_enc, \
                okta_org_url, okta_api_token_enc, cache_ttl_secs, updated_at, updated_by \
         FROM tenant_settings WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(tenant, client, secret_enc, org_url, token_enc, ttl, updated_at, updated_by)| {
            StoredSettings {
                graph_tenant_id: tenant,
                graph_client_id: client,
                graph_client_secret: decrypt_or_unset(secret_enc, encryption_key, "graph secret"),
                okta_org_url: org_url,
                okta_api_token: decrypt_or_unset(token_enc, encryption_key, "okta token"),
                cache_ttl_secs: ttl,
                updated_at: Some(updated_at),
                updated_by,
            }
        },
    ))
}

fn decrypt_or_unset(
    ciphertext: Option<String>,
    encryption_key: &str,
    label: &'static str,
) -> Option<String> {
    let ciphertext = ciphertext?;
    match secrets::decrypt(&ciphertext, encryption_key) {
        Ok(plain) => Some(plain),
        Err(e) => {
            warn!(field = label, error = %e, "stored secret no longer decrypts");
            None
        }
    }
}

/// Upsert the settings row. Absent fields keep their stored values; secrets
/// are encrypted before they touch the database.
pub async fn upsert(
    pool: &PgPool,
    update: &TenantSettingsUpdate,
    encryption_key: &str,
    updated_by: &str,
) -> Result<(), SettingsError> {
    let secret_enc = update
        .graph_client_secret
        .as_deref()
        .map(|s| secrets::encrypt(s, encryption_key))
        .transpose()?;
    let token_enc = update
        .okta_api_token
        .as_deref()
        .map(|s| secrets::encrypt(s, encryption_key))
        .transpose()?;

    sqlx::query(
        "INSERT INTO tenant_settings \
             (id, graph_tenant_id, graph_client_id, graph_client_secret_enc, \
              okta_org_url, okta_api_token_enc, cache_ttl_secs, updated_at, updated_by) \
         VALUES (1, $1, $2, $3, $4, $5, $6, now(), $7) \
         ON CONFLICT (id) DO UPDATE SET \
             graph_tenant_id = COALESCE(EXCLUDED.graph_tenant_id, tenant_settings.graph_tenant_id), \
             graph_client_id = COALESCE(EXCLUDED.graph_client_id, tenant_settings.graph_client_id), \
             graph_client_secret_enc = COALESCE(EXCLUDED.graph_client_secret_enc, tenant_settings.graph_client_secret_enc), \
             okta_org_url = COALESCE(EXCLUDED.okta_org_url, tenant_settings.okta_org_url), \
             okta_api_token_enc = COALESCE(EXCLUDED.okta_api_token_enc, tenant_settings.okta_api_token_enc), \
             cache_ttl_secs = COALESCE(EXCLUDED.cache_ttl_secs, tenant_settings.cache_ttl_secs), \
             updated_at = now(), \
             updated_by = EXCLUDED.updated_by",
    )
    .bind(&update.graph_tenant_id)
    .bind(&update.graph_client_id)
    .bind(secret_enc)
    .bind(&update.okta_org_url)
    .bind(token_enc)
    .bind(update.cache_ttl_secs)
    .bind(updated_by)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_defaults() -> TenantSettings {
        TenantSettings {
            graph_tenant_id: "env-tenant".into(),
            graph_client_id: "env-client".into(),
            graph_client_secret: "env-secret".into(),
            okta_org_url: "https://env.okta.com".into(),
            okta_api_token: "env-token".into(),
            cache_ttl_secs: 300,
        }
    }

    #[test]
    fn stored_values_override_env_defaults() {
        let stored = StoredSettings {
            graph_tenant_id: Some("db-tenant".into()),
            okta_api_token: Some("db-token".into()),
            cache_ttl_secs: Some(600),
            ..Default::default()
        };
        let effective = env_defaults().overlaid(&stored);
        assert_eq!(effective.graph_tenant_id, "db-tenant");
        assert_eq!(effective.okta_api_token, "db-token");
        assert_eq!(effective.cache_ttl_secs, 600);
        // Untouched fields keep the env values
        assert_eq!(effective.graph_client_id, "env-client");
        assert_eq!(effective.okta_org_url, "https://env.okta.com");
    }

    #[test]
    fn empty_stored_values_do_not_override() {
        let stored = StoredSettings {
            graph_tenant_id: Some(String::new()),
            okta_org_url: Some(String::new()),
            ..Default::default()
        };
        let effective = env_defaults().overlaid(&stored);
        assert_eq!(effective.graph_tenant_id, "env-tenant");
        assert_eq!(effective.okta_org_url, "https://env.okta.com");
    }

    #[test]
    fn negative_ttl_is_ignored() {
        let stored = StoredSettings {
            cache_ttl_secs: Some(-1),
            ..Default::default()
        };
        let effective = env_defaults().overlaid(&stored);
        assert_eq!(effective.cache_ttl_secs, 300);
    }
}
