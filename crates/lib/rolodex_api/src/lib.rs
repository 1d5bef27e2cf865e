//! # rolodex_api
//!
//! HTTP API library for Rolodex.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use sqlx::PgPool;
use tokio::sync::{OnceCell, RwLock};
use tower_http::cors::{Any, CorsLayer};

use rolodex_core::audit::AuditLogger;
use rolodex_core::auth::office::OfficeTokenValidator;
use rolodex_core::cache::ResponseCache;
use rolodex_core::directory::graph::GraphClient;
use rolodex_core::directory::okta::OktaClient;
use rolodex_core::settings::TenantSettings;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{
    admin_users, audit_logs, auth, cache, directory, emergency, health, oauth, settings,
};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Effective tenant settings (environment overlaid with the stored row).
    pub settings: Arc<RwLock<TenantSettings>>,
    /// Directory response cache.
    pub cache: Arc<ResponseCache>,
    /// Okta directory client.
    pub okta: Arc<OktaClient>,
    /// Microsoft Graph client.
    pub graph: Arc<GraphClient>,
    /// Office SSO token validator.
    pub office: Arc<OfficeTokenValidator>,
    /// Fire-and-forget audit logger.
    pub audit: AuditLogger,
    /// Tracks whether the initial admin seed has run.
    pub bootstrap: Arc<OnceCell<()>>,
    /// Shared HTTP client for outbound calls.
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state from a pool and configuration. No I/O happens here; the
    /// stored settings row is overlaid later via [`AppState::reload_settings`].
    pub fn new(pool: PgPool, config: ApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        let settings = Arc::new(RwLock::new(config.initial_settings()));
        let cache = Arc::new(ResponseCache::new(config.cache_ttl_secs));
        let okta = Arc::new(OktaClient::new(http.clone(), Arc::clone(&settings)));
        let graph = Arc::new(GraphClient::new(http.clone(), Arc::clone(&settings)));
        let office = Arc::new(OfficeTokenValidator::new(http.clone(), Arc::clone(&settings)));
        let audit = AuditLogger::new(pool.clone());
        Self {
            pool,
            config,
            settings,
            cache,
            okta,
            graph,
            office,
            audit,
            bootstrap: Arc::new(OnceCell::new()),
            http,
        }
    }

    /// Overlay the stored settings row onto the environment configuration
    /// and refresh everything derived from it.
    pub async fn reload_settings(&self) -> Result<(), AppError> {
        let stored =
            rolodex_core::settings::load(&self.pool, &self.config.settings_encryption_key).await?;
        let mut effective = self.config.initial_settings();
        if let Some(row) = &stored {
            effective = effective.overlaid(row);
        }
        self.cache.set_ttl(effective.cache_ttl_secs);
        *self.settings.write().await = effective;
        // Tenant credentials may have changed; cached responses and the
        // Graph app token are stale until re-fetched.
        self.cache.clear();
        self.graph.invalidate_token().await;
        Ok(())
    }
}

/// Run embedded database migrations.
///
/// Delegates to `rolodex_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    rolodex_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/health", get(health::health_handler))
        .route("/api/auth/oauth", get(oauth::oauth_start_handler))
        .route(
            "/api/auth/oauth/callback",
            get(oauth::oauth_callback_handler),
        )
        .route(
            "/api/auth/exchange-office-token",
            post(oauth::exchange_office_token_handler),
        )
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/admin/check", get(auth::admin_check_handler))
        .route(
            "/api/admin/emergency/login",
            post(emergency::login_handler),
        )
        .route(
            "/api/admin/emergency/verify-token",
            post(emergency::verify_token_handler),
        );

    // Session routes (any authenticated principal)
    let session = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/directory/search", get(directory::search_handler))
        .route("/api/directory/users/{id}", get(directory::get_user_handler))
        .route(
            "/api/directory/users/{id}/org-chart",
            get(directory::org_chart_handler),
        )
        .route(
            "/api/directory/users/{id}/groups",
            get(directory::groups_handler),
        )
        .route(
            "/api/directory/users/{id}/presence",
            get(directory::presence_handler),
        )
        .route(
            "/api/directory/users/{id}/out-of-office",
            get(directory::out_of_office_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Admin routes (verified admin or emergency session)
    let admin = Router::new()
        .route(
            "/api/admin/users",
            get(admin_users::list_admins_handler).post(admin_users::create_admin_handler),
        )
        .route(
            "/api/admin/users/{id}",
            delete(admin_users::delete_admin_handler),
        )
        .route(
            "/api/admin/audit-logs",
            get(audit_logs::list_audit_logs_handler),
        )
        .route(
            "/api/admin/settings",
            get(settings::get_settings_handler).put(settings::update_settings_handler),
        )
        .route(
            "/api/admin/settings/test",
            post(settings::test_settings_handler),
        )
        .route(
            "/api/admin/cache",
            get(cache::cache_stats_handler).delete(cache::clear_cache_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(session)
        .merge(admin)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
