//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API response shapes
//! in `rolodex_api` (which carry `#[serde(rename)]` for camelCase etc.).

use serde::{Deserialize, Serialize};

fn is_false(v: &bool) -> bool {
    !*v
}

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the authenticated email (standard JWT `sub` claim).
    pub sub: String,
    /// Whether the subject is an admin.
    pub admin: bool,
    /// Set only on break-glass sessions; omitted from normal tokens.
    #[serde(default, skip_serializing_if = "is_false")]
    pub emergency: bool,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// The authenticated identity attached to a request.
///
/// Reconstructed per request from a verified token or the Easy Auth
/// fallback; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub email: String,
    pub admin: bool,
    pub emergency: bool,
    /// Unix timestamps of the backing token, absent for header-derived
    /// principals.
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
}

impl Principal {
    /// Build a principal from verified token claims.
    pub fn from_claims(claims: &SessionClaims) -> Self {
        Self {
            email: claims.sub.to_lowercase(),
            admin: claims.admin,
            emergency: claims.emergency,
            issued_at: Some(claims.iat),
            expires_at: Some(claims.exp),
        }
    }

    /// Build a principal for an Easy Auth header identity.
    ///
    /// Header-derived principals never carry privileges; the admin
    /// surface requires a verified token.
    pub fn from_header_email(email: &str) -> Self {
        Self {
            email: email.to_lowercase(),
            admin: false,
            emergency: false,
            issued_at: None,
            expires_at: None,
        }
    }
}

/// Admin allowlist row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Admin {
    pub id: uuid::Uuid,
    pub email: String,
    pub username: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub created_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_claim_omitted_when_false() {
        let claims = SessionClaims {
            sub: "user@example.com".into(),
            admin: false,
            emergency: false,
            iat: 0,
            exp: 0,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("emergency"));
    }

    #[test]
    fn emergency_claim_present_when_true() {
        let claims = SessionClaims {
            sub: "user@example.com".into(),
            admin: true,
            emergency: true,
            iat: 0,
            exp: 0,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("\"emergency\":true"));
    }

    #[test]
    fn missing_emergency_claim_defaults_false() {
        let json = r#"{"sub":"user@example.com","admin":false,"iat":1,"exp":2}"#;
        let claims: SessionClaims = serde_json::from_str(json).unwrap();
        assert!(!claims.emergency);
    }

    #[test]
    fn principal_lowercases_email() {
        let p = Principal::from_header_email("User@Example.COM");
        assert_eq!(p.email, "user@example.com");
        assert!(!p.admin);
        assert!(p.issued_at.is_none());
    }
}
