//! Office add-in SSO token validation.
//!
//! Unlike the server-to-server ID token in [`super::oauth`], the add-in
//! hands us a token it obtained client-side, so the full check applies:
//! RS256 signature against the tenant JWKS plus an audience match for the
//! app registration. Signing keys are fetched once and cached; an unknown
//! `kid` forces a refetch to ride out key rotation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::AuthError;
use crate::settings::TenantSettings;

/// How long fetched signing keys stay fresh.
const JWKS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One signing key from the tenant JWKS document.
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

struct CachedJwks {
    keys: Vec<Jwk>,
    fetched_at: Instant,
}

/// Claims we read from a validated Office SSO token.
#[derive(Debug, Deserialize)]
struct OfficeClaims {
    email: Option<String>,
    preferred_username: Option<String>,
    upn: Option<String>,
}

/// Validates Office add-in SSO tokens against the tenant's signing keys.
pub struct OfficeTokenValidator {
    http: reqwest::Client,
    settings: Arc<RwLock<TenantSettings>>,
    jwks: RwLock<Option<CachedJwks>>,
}

impl OfficeTokenValidator {
    pub fn new(http: reqwest::Client, settings: Arc<RwLock<TenantSettings>>) -> Self {
        Self {
            http,
            settings,
            jwks: RwLock::new(None),
        }
    }

    /// Validate a token from the add-in, returning the signed-in email.
    pub async fn validate(&self, token: &str) -> Result<String, AuthError> {
        let (tenant_id, client_id) = {
            let settings = self.settings.read().await;
            if settings.graph_tenant_id.is_empty() || settings.graph_client_id.is_empty() {
                return Err(AuthError::NotConfigured("Microsoft tenant"));
            }
            (
                settings.graph_tenant_id.clone(),
                settings.graph_client_id.clone(),
            )
        };

        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;

        let jwk = match self.cached_key(&kid).await {
            Some(jwk) => jwk,
            None => {
                // Unknown kid: the tenant may have rotated keys
                self.refresh_jwks(&tenant_id).await?;
                self.cached_key(&kid).await.ok_or(AuthError::InvalidToken)?
            }
        };

        let (n, e) = match (&jwk.n, &jwk.e) {
            (Some(n), Some(e)) => (n.as_str(), e.as_str()),
            _ => return Err(AuthError::InvalidToken),
        };
        let key = DecodingKey::from_rsa_components(n, e).map_err(|_| AuthError::InvalidToken)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_audience(&expected_audiences(&client_id));

        let data = match decode::<OfficeClaims>(token, &key, &validation) {
            Ok(data) => data,
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                return Err(AuthError::TokenExpired);
            }
            Err(_) => return Err(AuthError::InvalidToken),
        };

        extract_email(&data.claims).ok_or(AuthError::InvalidToken)
    }

    /// Look up a fresh cached key by kid.
    async fn cached_key(&self, kid: &str) -> Option<Jwk> {
        let cache = self.jwks.read().await;
        let cached = cache.as_ref()?;
        if cached.fetched_at.elapsed() > JWKS_TTL {
            return None;
        }
        find_key(&cached.keys, kid).cloned()
    }

    /// Fetch the tenant JWKS document and replace the cache.
    async fn refresh_jwks(&self, tenant_id: &str) -> Result<(), AuthError> {
        let url = format!("https://login.microsoftonline.com/{tenant_id}/discovery/v2.0/keys");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("JWKS fetch failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AuthError::TokenExchange(format!("JWKS fetch HTTP {status}")));
        }

        let doc = resp
            .json::<JwksDocument>()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("JWKS parse error: {e}")))?;

        debug!(keys = doc.keys.len(), "refreshed tenant JWKS");
        let mut cache = self.jwks.write().await;
        *cache = Some(CachedJwks {
            keys: doc.keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

/// Audiences the app registration accepts on add-in tokens.
fn expected_audiences(client_id: &str) -> [String; 2] {
    [client_id.to_string(), format!("api://{client_id}")]
}

fn find_key<'a>(keys: &'a [Jwk], kid: &str) -> Option<&'a Jwk> {
    keys.iter()
        .filter(|k| k.kty == "RSA")
        .find(|k| k.kid.as_deref() == Some(kid))
}

fn extract_email(claims: &OfficeClaims) -> Option<String> {
    [
        claims.email.as_deref(),
        claims.preferred_username.as_deref(),
        claims.upn.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|e| !e.is_empty())
    .map(str::to_string)
}
