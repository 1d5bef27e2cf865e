//! App Service Easy Auth principal parsing.
//!
//! The hosting platform authenticates the user and injects a base64
//! `x-ms-client-principal` header describing the identity. We only read an
//! email out of it; the platform already verified the identity, so there is
//! nothing cryptographic to check here. Anything malformed yields `None`,
//! never an error.

use base64::Engine;
use serde::Deserialize;

/// Header injected by the platform in front of the app.
pub const PRINCIPAL_HEADER: &str = "x-ms-client-principal";

#[derive(Debug, Deserialize)]
struct ClientPrincipal {
    #[serde(default)]
    claims: Vec<PrincipalClaim>,
}

#[derive(Debug, Deserialize)]
struct PrincipalClaim {
    #[serde(default)]
    typ: String,
    #[serde(default)]
    val: String,
}

/// Claim types we recognize, in lookup priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimKind {
    EmailAddress,
    Upn,
    Name,
    Other,
}

impl ClaimKind {
    /// Classify a claim type by its last path segment, so both the full
    /// schema URI and the bare shorthand match. Segment equality keeps
    /// `surname` from matching `name`.
    fn of(typ: &str) -> Self {
        let last = typ.rsplit('/').next().unwrap_or(typ);
        match last.to_ascii_lowercase().as_str() {
            "emailaddress" => Self::EmailAddress,
            "upn" => Self::Upn,
            "name" => Self::Name,
            _ => Self::Other,
        }
    }
}

/// Extract the principal's email from a raw `x-ms-client-principal` value.
///
/// Tries the email-address claim, then UPN, then name, returning the first
/// non-empty trimmed value.
pub fn principal_email(encoded: &str) -> Option<String> {
    let bytes = decode_base64(encoded.trim())?;
    let principal: ClientPrincipal = serde_json::from_slice(&bytes).ok()?;

    for kind in [ClaimKind::EmailAddress, ClaimKind::Upn, ClaimKind::Name] {
        let found = principal
            .claims
            .iter()
            .filter(|c| ClaimKind::of(&c.typ) == kind)
            .map(|c| c.val.trim())
            .find(|v| !v.is_empty());
        if let Some(val) = found {
            return Some(val.to_string());
        }
    }
    None
}

fn decode_base64(encoded: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
    STANDARD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .ok()
}
