//! Integration tests: build the router and drive it with `oneshot` requests.
//!
//! The pool is lazy and points at a closed port, so these cover the paths
//! that must hold up without a database: token verification, the guards,
//! the emergency login flow and the fire-and-forget audit property.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use rolodex_api::{AppState, config::ApiConfig};
use rolodex_core::auth::jwt;

const JWT_SECRET: &str = "test-secret";
const EMERGENCY_TOKEN: &str = "urltok123";

fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        pg_connection_url: "postgres://127.0.0.1:9/rolodex".into(),
        jwt_secret: JWT_SECRET.into(),
        graph_tenant_id: "tenant-1".into(),
        graph_client_id: "client-1".into(),
        graph_client_secret: "graph-secret".into(),
        oauth_redirect_uri: "http://localhost:3200/api/auth/oauth/callback".into(),
        okta_org_url: String::new(),
        okta_api_token: String::new(),
        emergency_access_token: EMERGENCY_TOKEN.into(),
        break_glass_email: "ops@example.com".into(),
        break_glass_password: "glass-pass".into(),
        initial_admin_email: None,
        allowed_origins: Vec::new(),
        cache_ttl_secs: 300,
        settings_encryption_key: "test-encryption-key".into(),
        secure_cookies: false,
    }
}

fn app_with(config: ApiConfig) -> Router {
    // Port 9 (discard) never listens; any pool use fails fast.
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(&config.pg_connection_url)
        .expect("lazy pool");
    rolodex_api::router(AppState::new(pool, config))
}

fn app() -> Router {
    app_with(test_config())
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("parse JSON")
}

fn easyauth_header(email: &str) -> String {
    let principal = serde_json::json!({
        "claims": [
            {
                "typ": "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
                "val": email
            }
        ]
    });
    STANDARD.encode(principal.to_string())
}

#[tokio::test]
async fn health_reports_db_down_without_failing() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["dbConnected"], false);
    assert!(json["version"].as_str().is_some_and(|v| !v.is_empty()));
}

#[tokio::test]
async fn oauth_start_redirects_to_microsoft() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/oauth?returnTo=%2Fpeople")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = resp.headers()[LOCATION].to_str().expect("location");
    assert!(location.starts_with(
        "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/authorize"
    ));
    assert!(location.contains("client_id=client-1"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn oauth_start_without_tenant_is_an_internal_error() {
    let mut config = test_config();
    config.graph_tenant_id = String::new();
    let resp = app_with(config)
        .oneshot(
            Request::builder()
                .uri("/api/auth/oauth")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "internal_error");
}

#[tokio::test]
async fn oauth_callback_provider_error_redirects_without_exchange() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/oauth/callback?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        resp.headers()[LOCATION].to_str().unwrap(),
        "/?error=access_denied"
    );
    assert!(resp.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn me_returns_principal_for_bearer_token() {
    let token = jwt::issue("Jo@Example.com", true, JWT_SECRET.as_bytes()).expect("issue");
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["email"], "jo@example.com");
    assert_eq!(json["admin"], true);
    assert_eq!(json["emergency"], false);
    assert!(json["expiresAt"].as_i64().is_some());
}

#[tokio::test]
async fn me_rejects_expired_token() {
    let token =
        jwt::issue_with_lifetime("jo@example.com", false, false, -10, JWT_SECRET.as_bytes())
            .expect("issue");
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "unauthorized");
    assert_eq!(json["message"], "Token expired");
}

#[tokio::test]
async fn me_without_credentials_is_unauthorized() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn easyauth_header_is_forbidden_while_directory_is_unconfigured() {
    // The directory gate fails closed: a platform identity alone is not
    // enough when Okta cannot confirm membership.
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("x-ms-client-principal", easyauth_header("jo@example.com"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "forbidden");
}

#[tokio::test]
async fn admin_guard_distinguishes_missing_from_unprivileged() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let token = jwt::issue("user@example.com", false, JWT_SECRET.as_bytes()).expect("issue");
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/cache")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // An expired token never reaches the handler, admin or not.
    let expired =
        jwt::issue_with_lifetime("admin@example.com", true, false, -10, JWT_SECRET.as_bytes())
            .expect("issue");
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/cache")
                .header(AUTHORIZATION, format!("Bearer {expired}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["message"], "Token expired");
}

#[tokio::test]
async fn admin_token_reads_and_clears_the_cache() {
    let app = app();
    let token = jwt::issue("admin@example.com", true, JWT_SECRET.as_bytes()).expect("issue");

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/cache")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["entries"], 0);
    assert_eq!(json["ttlSecs"], 300);

    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/cache")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], true);
}

#[tokio::test]
async fn emergency_verify_token_checks_the_configured_value() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/admin/emergency/verify-token?token={EMERGENCY_TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["valid"], true);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/emergency/verify-token?token=wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(body_json(resp).await["valid"], false);
}

#[tokio::test]
async fn emergency_login_establishes_a_privileged_session() {
    let app = app();
    let body = serde_json::json!({
        "email": "ops@example.com",
        "password": "glass-pass"
    });

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/admin/emergency/login?token={EMERGENCY_TOKEN}"))
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers()[SET_COOKIE].to_str().expect("cookie").to_string();
    assert!(cookie.starts_with("jwt="));
    assert!(cookie.contains("HttpOnly"));
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["expiresIn"], 3600);
    let token = json["token"].as_str().expect("token").to_string();

    // The cookie-carried session identifies as emergency, not admin.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(COOKIE, format!("jwt={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["email"], "ops@example.com");
    assert_eq!(json["admin"], false);
    assert_eq!(json["emergency"], true);

    // Emergency privilege passes the admin guard.
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/cache")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn emergency_login_rejects_a_bad_url_token() {
    let body = serde_json::json!({
        "email": "ops@example.com",
        "password": "glass-pass"
    });
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/emergency/login?token=wrong")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn emergency_login_rejects_bad_credentials() {
    let body = serde_json::json!({
        "email": "ops@example.com",
        "password": "not-the-password"
    });
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/admin/emergency/login?token={EMERGENCY_TOKEN}"))
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_a_valid_token_even_when_the_audit_store_is_down() {
    // The pool points nowhere, so the spawned audit insert fails; the
    // request must succeed anyway.
    let token = jwt::issue("jo@example.com", false, JWT_SECRET.as_bytes()).expect("issue");
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers()[SET_COOKIE].to_str().expect("cookie").to_string();
    assert!(cookie.starts_with("jwt="));
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["expiresIn"], 4 * 60 * 60);
}

#[tokio::test]
async fn refresh_rejects_an_expired_token() {
    let token =
        jwt::issue_with_lifetime("jo@example.com", false, false, -10, JWT_SECRET.as_bytes())
            .expect("issue");
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Token expired");
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers()[SET_COOKIE].to_str().expect("cookie");
    assert!(cookie.starts_with("jwt="));
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(body_json(resp).await["success"], true);
}

#[tokio::test]
async fn admin_check_fails_soft() {
    let app = app();

    // No identity at all: not an admin, not an error.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/check")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["isAdmin"], false);

    // A verified admin token answers without touching the database.
    let token = jwt::issue("admin@example.com", true, JWT_SECRET.as_bytes()).expect("issue");
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/check")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["isAdmin"], true);
}
