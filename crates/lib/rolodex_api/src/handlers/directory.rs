//! Directory lookup handlers: Okta people data enriched with Microsoft Graph.
//!
//! Responses are cached as JSON values under typed keys, so a cache hit
//! skips both serialization and the upstream call.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Serialize;

use rolodex_core::models::directory::Presence;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::SearchQuery;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 50;

/// `GET /api/directory/search`: people search against Okta.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::Validation("Query parameter q is required".into()));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let key = format!("search:{limit}:{}", q.to_lowercase());
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let users = state
        .okta
        .search_users(q, limit)
        .await
        .map_err(AppError::from)?;
    cache_and_return(&state, key, &users)
}

/// `GET /api/directory/users/{id}`: one person's profile.
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let key = format!("user:{id}");
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let user = state.okta.get_user(&id).await.map_err(AppError::from)?;
    cache_and_return(&state, key, &user)
}

/// `GET /api/directory/users/{id}/org-chart`: manager, peers and direct
/// reports.
pub async fn org_chart_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let key = format!("org:{id}");
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let email = resolve_email(&state, &id).await?;
    let chart = state.graph.org_chart(&email).await.map_err(AppError::from)?;
    cache_and_return(&state, key, &chart)
}

/// `GET /api/directory/users/{id}/groups`: Microsoft 365 group membership.
pub async fn groups_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let key = format!("groups:{id}");
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let email = resolve_email(&state, &id).await?;
    let groups = state
        .graph
        .member_groups(&email)
        .await
        .map_err(AppError::from)?;
    cache_and_return(&state, key, &groups)
}

/// `GET /api/directory/users/{id}/presence`: Teams presence. Never cached,
/// presence changes faster than any sensible TTL.
pub async fn presence_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Presence>> {
    let email = resolve_email(&state, &id).await?;
    let presence = state.graph.presence(&email).await.map_err(AppError::from)?;
    Ok(Json(presence))
}

/// `GET /api/directory/users/{id}/out-of-office`: automatic-replies status.
pub async fn out_of_office_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let key = format!("oof:{id}");
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }
    let email = resolve_email(&state, &id).await?;
    let oof = state
        .graph
        .out_of_office(&email)
        .await
        .map_err(AppError::from)?;
    cache_and_return(&state, key, &oof)
}

/// Serialize a fresh result into the cache and hand it back as JSON.
fn cache_and_return<T: Serialize>(
    state: &AppState,
    key: String,
    value: &T,
) -> AppResult<Json<serde_json::Value>> {
    let json = serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))?;
    state.cache.put(key, json.clone());
    Ok(Json(json))
}

/// Resolve the Okta profile email for Graph lookups, through the same
/// per-user cache the profile endpoint fills.
async fn resolve_email(state: &AppState, id: &str) -> AppResult<String> {
    let key = format!("user:{id}");
    if let Some(hit) = state.cache.get(&key)
        && let Some(email) = hit.get("email").and_then(|v| v.as_str())
        && !email.is_empty()
    {
        return Ok(email.to_string());
    }
    let user = state.okta.get_user(id).await.map_err(AppError::from)?;
    if user.email.is_empty() {
        return Err(AppError::NotFound("User has no email address".into()));
    }
    let email = user.email.clone();
    let json = serde_json::to_value(&user).map_err(|e| AppError::Internal(e.to_string()))?;
    state.cache.put(key, json);
    Ok(email)
}
