//! Session JWT generation, verification and refresh.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;

use super::AuthError;
use crate::models::auth::SessionClaims;

/// Session lifetime: 4 hours.
pub const SESSION_TTL_SECS: i64 = 4 * 60 * 60;

/// Break-glass session lifetime: 1 hour.
pub const EMERGENCY_SESSION_TTL_SECS: i64 = 60 * 60;

/// Issue a signed session JWT (HS256, 4 hour expiry).
pub fn issue(email: &str, admin: bool, secret: &[u8]) -> Result<String, AuthError> {
    issue_with_lifetime(email, admin, false, SESSION_TTL_SECS, secret)
}

/// Issue a signed session JWT with a caller-chosen lifetime.
///
/// Break-glass sessions pass `emergency = true` and the 1 hour lifetime.
pub fn issue_with_lifetime(
    email: &str,
    admin: bool,
    emergency: bool,
    lifetime_secs: i64,
    secret: &[u8],
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: email.to_lowercase(),
        admin,
        emergency,
        iat: now.timestamp(),
        exp: (now + Duration::seconds(lifetime_secs)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenEncoding(format!("jwt encode: {e}")))
}

/// Verify a session JWT, returning the claims on success.
///
/// Distinguishes `TokenExpired` from every other failure so callers can
/// report "session expired" separately from "bad token". Expiry is checked
/// with zero leeway.
pub fn verify(token: &str, secret: &[u8]) -> Result<SessionClaims, AuthError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;
    match decode::<SessionClaims>(token, &key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(AuthError::TokenExpired),
        Err(_) => Err(AuthError::InvalidToken),
    }
}

/// Exchange a currently-valid token for a fresh one with the same identity.
///
/// Expired or tampered input fails; a refresh never resurrects a dead
/// session. Emergency sessions keep the short 1 hour window.
pub fn refresh(token: &str, secret: &[u8]) -> Result<String, AuthError> {
    let claims = verify(token, secret)?;
    let lifetime = if claims.emergency {
        EMERGENCY_SESSION_TTL_SECS
    } else {
        SESSION_TTL_SECS
    };
    issue_with_lifetime(&claims.sub, claims.admin, claims.emergency, lifetime, secret)
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    // Generate and persist
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rolodex")
        .join("jwt-secret")
}
