//! Break-glass emergency credential checks.
//!
//! The emergency path must keep working while Okta, Graph and the IdP are
//! all down, so everything here is local: a URL token gate and a configured
//! credential pair. Comparisons go through SHA-256 digests so timing never
//! relates to how much of a secret prefix matched.

use sha2::{Digest, Sha256};

/// Compare two strings in constant time via their SHA-256 digests.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    Sha256::digest(a.as_bytes()) == Sha256::digest(b.as_bytes())
}

/// Gate 1: does the presented URL token match the configured emergency
/// access token? An unset configuration fails closed.
pub fn verify_emergency_token(presented: &str, configured: &str) -> bool {
    !configured.is_empty() && constant_time_eq(presented, configured)
}

/// Gate 2: do the presented credentials match the configured break-glass
/// pair? The configured password may be a bcrypt hash (`$2…`) or a raw
/// value. Unset configuration fails closed.
pub fn verify_credentials(
    email: &str,
    password: &str,
    configured_email: &str,
    configured_password: &str,
) -> bool {
    if configured_email.is_empty() || configured_password.is_empty() {
        return false;
    }
    if !email.trim().eq_ignore_ascii_case(configured_email.trim()) {
        return false;
    }
    if configured_password.starts_with("$2") {
        bcrypt::verify(password, configured_password).unwrap_or(false)
    } else {
        constant_time_eq(password, configured_password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_strings() {
        assert!(constant_time_eq("secret-token", "secret-token"));
        assert!(!constant_time_eq("secret-token", "secret-tokex"));
        assert!(!constant_time_eq("short", "longer-value"));
    }

    #[test]
    fn emergency_token_gate() {
        assert!(verify_emergency_token("tok-123", "tok-123"));
        assert!(!verify_emergency_token("tok-123", "tok-456"));
    }

    #[test]
    fn unset_emergency_token_fails_closed() {
        assert!(!verify_emergency_token("", ""));
        assert!(!verify_emergency_token("anything", ""));
    }

    #[test]
    fn credentials_match_plain_password() {
        assert!(verify_credentials(
            "ops@example.com",
            "hunter2",
            "ops@example.com",
            "hunter2"
        ));
        assert!(!verify_credentials(
            "ops@example.com",
            "wrong",
            "ops@example.com",
            "hunter2"
        ));
    }

    #[test]
    fn credentials_email_is_case_insensitive() {
        assert!(verify_credentials(
            "OPS@Example.COM",
            "hunter2",
            "ops@example.com",
            "hunter2"
        ));
        assert!(!verify_credentials(
            "other@example.com",
            "hunter2",
            "ops@example.com",
            "hunter2"
        ));
    }

    #[test]
    fn credentials_match_bcrypt_hash() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        assert!(verify_credentials(
            "ops@example.com",
            "hunter2",
            "ops@example.com",
            &hash
        ));
        assert!(!verify_credentials(
            "ops@example.com",
            "wrong",
            "ops@example.com",
            &hash
        ));
    }

    #[test]
    fn unset_credentials_fail_closed() {
        assert!(!verify_credentials("a@b.com", "pw", "", ""));
        assert!(!verify_credentials("", "", "", ""));
    }
}
