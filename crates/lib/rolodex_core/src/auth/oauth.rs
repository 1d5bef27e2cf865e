//! Microsoft identity platform authorization-code flow.
//!
//! Builds the authorize redirect, exchanges callback codes for tokens, and
//! pulls the signed-in email out of the returned ID token. The `state`
//! parameter round-trips the post-login destination.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use url::Url;

use super::AuthError;

/// Scopes requested for the web sign-in flow.
const SIGN_IN_SCOPE: &str = "openid profile email";

/// An identity proven by a completed code exchange.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatePayload {
    #[serde(rename = "returnTo")]
    return_to: Option<String>,
}

/// Response from the Microsoft token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[allow(dead_code)]
    access_token: Option<String>,
    id_token: Option<String>,
}

/// Build the Microsoft authorize URL, with `state` carrying the post-login
/// destination.
pub fn authorize_url(
    tenant_id: &str,
    client_id: &str,
    redirect_uri: &str,
    return_to: Option<&str>,
) -> Result<Url, AuthError> {
    let base = format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/authorize");
    let mut url = Url::parse(&base)
        .map_err(|e| AuthError::TokenExchange(format!("authorize URL parse: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("response_mode", "query")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", SIGN_IN_SCOPE)
        .append_pair("state", &encode_state(return_to));
    Ok(url)
}

/// Encode the post-login destination into an OAuth `state` value.
pub fn encode_state(return_to: Option<&str>) -> String {
    let payload = StatePayload {
        return_to: return_to.map(str::to_string),
    };
    let json = serde_json::to_vec(&payload).unwrap_or_else(|_| b"{}".to_vec());
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode the post-login destination from an OAuth `state` value.
///
/// Only same-origin relative paths are honored; anything else, including a
/// malformed or missing state, falls back to `/`. Login must still complete
/// when the state comes back mangled.
pub fn decode_state(state: &str) -> String {
    try_decode_state(state).unwrap_or_else(|| "/".to_string())
}

fn try_decode_state(state: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let payload: StatePayload = serde_json::from_slice(&bytes).ok()?;
    let return_to = payload.return_to?;
    // Relative paths only; "//host" would be protocol-relative
    (return_to.starts_with('/') && !return_to.starts_with("//")).then_some(return_to)
}

/// Exchange an authorization code for tokens and extract the signed-in email.
pub async fn exchange_code(
    http: &reqwest::Client,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<VerifiedLogin, AuthError> {
    let token_url = format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token");

    let params = [
        ("grant_type", "authorization_code"),
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("scope", SIGN_IN_SCOPE),
    ];

    let resp = http
        .post(&token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| AuthError::TokenExchange(format!("Token exchange failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::TokenExchange(format!(
            "Token exchange HTTP {status}: {body}"
        )));
    }

    let tokens = resp
        .json::<TokenResponse>()
        .await
        .map_err(|e| AuthError::TokenExchange(format!("Token response parse error: {e}")))?;

    let id_token = tokens
        .id_token
        .ok_or_else(|| AuthError::TokenExchange("Token response missing id_token".into()))?;

    let email = decode_id_token_email(&id_token)
        .ok_or_else(|| AuthError::TokenExchange("ID token carries no email claim".into()))?;

    Ok(VerifiedLogin { email })
}

/// Pull the email out of an ID token payload without signature verification.
///
/// The token was handed to us directly by the token endpoint over TLS, so
/// the transport already authenticates it. Tokens arriving from a client
/// go through [`super::office`] instead.
pub fn decode_id_token_email(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
    claims
        .email
        .or(claims.preferred_username)
        .or(claims.upn)
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    email: Option<String>,
    preferred_username: Option<String>,
    upn: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_and_state() {
        let url = authorize_url("tid", "cid", "https://app.example.com/cb", Some("/people/1"))
            .unwrap();
        assert!(url.as_str().starts_with(
            "https://login.microsoftonline.com/tid/oauth2/v2.0/authorize?"
        ));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".into(), "cid".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        let state = pairs
            .iter()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert_eq!(decode_state(&state), "/people/1");
    }

    #[test]
    fn state_round_trip() {
        let state = encode_state(Some("/admin?tab=users"));
        assert_eq!(decode_state(&state), "/admin?tab=users");
    }

    #[test]
    fn state_without_return_to_falls_back_to_root() {
        let state = encode_state(None);
        assert_eq!(decode_state(&state), "/");
    }

    #[test]
    fn malformed_state_falls_back_to_root() {
        assert_eq!(decode_state("%%%not-base64%%%"), "/");
        assert_eq!(decode_state(&URL_SAFE_NO_PAD.encode(b"{broken")), "/");
        assert_eq!(decode_state(""), "/");
    }

    #[test]
    fn absolute_url_state_rejected() {
        let state = encode_state(Some("https://evil.example.com/phish"));
        assert_eq!(decode_state(&state), "/");
    }

    #[test]
    fn protocol_relative_state_rejected() {
        let state = encode_state(Some("//evil.example.com"));
        assert_eq!(decode_state(&state), "/");
    }

    fn fake_id_token(payload_json: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload_json.as_bytes());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn id_token_email_claim_extracted() {
        let token = fake_id_token(r#"{"email":"jo@example.com","aud":"cid"}"#);
        assert_eq!(
            decode_id_token_email(&token).as_deref(),
            Some("jo@example.com")
        );
    }

    #[test]
    fn id_token_falls_back_to_preferred_username() {
        let token = fake_id_token(r#"{"preferred_username":"jo@example.com"}"#);
        assert_eq!(
            decode_id_token_email(&token).as_deref(),
            Some("jo@example.com")
        );
    }

    #[test]
    fn id_token_without_email_claims_yields_none() {
        let token = fake_id_token(r#"{"aud":"cid","name":"Jo"}"#);
        assert_eq!(decode_id_token_email(&token), None);
    }

    #[test]
    fn garbage_id_token_yields_none() {
        assert_eq!(decode_id_token_email("nonsense"), None);
        assert_eq!(decode_id_token_email("a.b.c"), None);
    }
}
