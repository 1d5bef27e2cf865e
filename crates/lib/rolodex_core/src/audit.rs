//! Append-only audit trail.
//!
//! Every authentication attempt and admin mutation lands here. Writes are
//! fire-and-forget: the insert runs on a spawned task and a failure is
//! warn-logged, so audit persistence can never block or fail the request
//! that triggered it.

use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::uuid::uuidv7;

/// Known audit actions. Stored as text; unrecognized stored values parse
/// back as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditAction {
    AuthLogin,
    AuthFailed,
    FailedLogin,
    BreakGlassLogin,
    AuthLogout,
    TokenRefresh,
    CreateAdmin,
    DeleteAdmin,
    UpdateSettings,
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthLogin => "AUTH_LOGIN",
            Self::AuthFailed => "AUTH_FAILED",
            Self::FailedLogin => "FAILED_LOGIN",
            Self::BreakGlassLogin => "BREAK_GLASS_LOGIN",
            Self::AuthLogout => "AUTH_LOGOUT",
            Self::TokenRefresh => "TOKEN_REFRESH",
            Self::CreateAdmin => "CREATE_ADMIN",
            Self::DeleteAdmin => "DELETE_ADMIN",
            Self::UpdateSettings => "UPDATE_SETTINGS",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "AUTH_LOGIN" => Self::AuthLogin,
            "AUTH_FAILED" => Self::AuthFailed,
            "FAILED_LOGIN" => Self::FailedLogin,
            "BREAK_GLASS_LOGIN" => Self::BreakGlassLogin,
            "AUTH_LOGOUT" => Self::AuthLogout,
            "TOKEN_REFRESH" => Self::TokenRefresh,
            "CREATE_ADMIN" => Self::CreateAdmin,
            "DELETE_ADMIN" => Self::DeleteAdmin,
            "UPDATE_SETTINGS" => Self::UpdateSettings,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored audit row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action: String,
    pub admin_email: String,
    pub target_email: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Fire-and-forget audit writer over the shared pool.
#[derive(Clone)]
pub struct AuditLogger {
    pool: PgPool,
}

impl AuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an audit event without blocking the caller.
    ///
    /// The insert runs on a spawned task; failures are warn-logged and
    /// dropped.
    pub fn record(
        &self,
        action: AuditAction,
        actor_email: &str,
        target_email: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) {
        let pool = self.pool.clone();
        let actor = actor_email.to_lowercase();
        let target = target_email.map(str::to_lowercase);
        tokio::spawn(async move {
            if let Err(e) =
                insert_audit_log(&pool, &action, &actor, target.as_deref(), metadata).await
            {
                warn!(action = %action, error = %e, "audit write failed");
            }
        });
    }
}

/// Insert one audit row. Exposed for callers that need to await the write.
pub async fn insert_audit_log(
    pool: &PgPool,
    action: &AuditAction,
    admin_email: &str,
    target_email: Option<&str>,
    metadata: Option<serde_json::Value>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs (id, action, admin_email, target_email, metadata) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(uuidv7())
    .bind(action.as_str())
    .bind(admin_email)
    .bind(target_email)
    .bind(metadata)
    .execute(pool)
    .await?;
    Ok(())
}

/// List audit rows, newest first, optionally filtered by action.
pub async fn list_audit_logs(
    pool: &PgPool,
    action: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
    let rows = match action {
        Some(action) => {
            sqlx::query_as::<_, AuditLogEntry>(
                "SELECT id, action, admin_email, target_email, metadata, created_at \
                 FROM audit_logs WHERE action = $1 \
                 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            )
            .bind(action)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, AuditLogEntry>(
                "SELECT id, action, admin_email, target_email, metadata, created_at \
                 FROM audit_logs ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_actions_round_trip() {
        let actions = [
            AuditAction::AuthLogin,
            AuditAction::AuthFailed,
            AuditAction::FailedLogin,
            AuditAction::BreakGlassLogin,
            AuditAction::AuthLogout,
            AuditAction::TokenRefresh,
            AuditAction::CreateAdmin,
            AuditAction::DeleteAdmin,
            AuditAction::UpdateSettings,
        ];
        for action in actions {
            assert_eq!(AuditAction::parse(action.as_str()), action);
        }
    }

    #[test]
    fn unknown_action_parses_as_other() {
        let action = AuditAction::parse("SOMETHING_NEW");
        assert_eq!(action, AuditAction::Other("SOMETHING_NEW".to_string()));
        assert_eq!(action.as_str(), "SOMETHING_NEW");
    }

    #[test]
    fn display_matches_stored_form() {
        assert_eq!(AuditAction::BreakGlassLogin.to_string(), "BREAK_GLASS_LOGIN");
    }
}
