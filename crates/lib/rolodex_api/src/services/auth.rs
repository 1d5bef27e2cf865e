//! Session service: directory gate, admin lookup and session establishment.

use serde_json::json;
use tracing::info;

use rolodex_core::audit::AuditAction;
use rolodex_core::auth::{jwt, queries};
use rolodex_core::directory::DirectoryError;

use crate::AppState;
use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Directory membership gate
// ---------------------------------------------------------------------------

/// Check whether an email belongs to the Okta directory.
///
/// Verdicts are cached under the shared response cache so repeated Easy Auth
/// requests do not turn into one Okta call each. Lookup failures propagate
/// instead of being cached.
pub async fn directory_member(state: &AppState, email: &str) -> AppResult<bool> {
    let key = format!("member:{}", email.to_lowercase());
    if let Some(value) = state.cache.get(&key) {
        return Ok(value.as_bool().unwrap_or(false));
    }
    let member = match state.okta.find_user_by_email(email).await {
        Ok(user) => user.is_some(),
        // The gate fails closed while Okta is unconfigured. Nothing is
        // cached, so configuring it takes effect immediately.
        Err(DirectoryError::NotConfigured(_)) => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    state.cache.put(key, serde_json::Value::Bool(member));
    Ok(member)
}

// ---------------------------------------------------------------------------
// Session establishment
// ---------------------------------------------------------------------------

/// Establish a session for an identity the IdP has just verified.
///
/// Gates on directory membership, resolves admin status from the allowlist
/// and issues the session JWT. Both outcomes are audited.
pub async fn establish_session(state: &AppState, email: &str, via: &str) -> AppResult<String> {
    super::bootstrap::ensure_seed_admin(state).await?;

    if !directory_member(state, email).await? {
        state.audit.record(
            AuditAction::AuthFailed,
            email,
            None,
            Some(json!({ "via": via, "reason": "not in directory" })),
        );
        return Err(AppError::Forbidden("Not a member of the directory".into()));
    }

    let admin = queries::is_admin_email(&state.pool, email)
        .await
        .map_err(AppError::from)?;
    let token =
        jwt::issue(email, admin, state.config.jwt_secret.as_bytes()).map_err(AppError::from)?;
    info!(email = %email.to_lowercase(), admin, via, "session established");
    state.audit.record(
        AuditAction::AuthLogin,
        email,
        None,
        Some(json!({ "via": via, "admin": admin })),
    );
    Ok(token)
}
