//! Okta directory client.
//!
//! Thin REST client over the Okta Users API, authenticated with an SSWS
//! API token. Lookup-by-email doubles as the directory membership gate:
//! an email Okta does not know is not one of our people.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;

use super::DirectoryError;
use crate::models::directory::DirectoryUser;
use crate::settings::TenantSettings;

/// Raw Okta user record, flattened into [`DirectoryUser`].
#[derive(Debug, Deserialize)]
struct OktaUser {
    id: String,
    profile: OktaProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OktaProfile {
    email: Option<String>,
    login: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    title: Option<String>,
    department: Option<String>,
    manager: Option<String>,
}

impl From<OktaUser> for DirectoryUser {
    fn from(user: OktaUser) -> Self {
        let profile = user.profile;
        DirectoryUser {
            id: user.id,
            email: profile.email.or(profile.login).unwrap_or_default(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            title: profile.title,
            department: profile.department,
            manager: profile.manager,
        }
    }
}

pub struct OktaClient {
    http: reqwest::Client,
    settings: Arc<RwLock<TenantSettings>>,
}

impl OktaClient {
    pub fn new(http: reqwest::Client, settings: Arc<RwLock<TenantSettings>>) -> Self {
        Self { http, settings }
    }

    /// Snapshot the current org URL and API token.
    async fn credentials(&self) -> Result<(String, String), DirectoryError> {
        let settings = self.settings.read().await;
        if settings.okta_org_url.is_empty() || settings.okta_api_token.is_empty() {
            return Err(DirectoryError::NotConfigured("Okta"));
        }
        Ok((
            settings.okta_org_url.trim_end_matches('/').to_string(),
            settings.okta_api_token.clone(),
        ))
    }

    /// Look up a user by email or login. `Ok(None)` means the directory
    /// does not know this person.
    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        let (org, token) = self.credentials().await?;
        let resp = self
            .http
            .get(format!("{org}/api/v1/users/{email}"))
            .header("Authorization", format!("SSWS {token}"))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(upstream_error(resp).await);
        }
        let user = resp.json::<OktaUser>().await?;
        Ok(Some(user.into()))
    }

    /// Fetch a user by Okta ID.
    pub async fn get_user(&self, id: &str) -> Result<DirectoryUser, DirectoryError> {
        let (org, token) = self.credentials().await?;
        let resp = self
            .http
            .get(format!("{org}/api/v1/users/{id}"))
            .header("Authorization", format!("SSWS {token}"))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(upstream_error(resp).await);
        }
        let user = resp.json::<OktaUser>().await?;
        Ok(user.into())
    }

    /// Free-text people search.
    pub async fn search_users(
        &self,
        q: &str,
        limit: u32,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let (org, token) = self.credentials().await?;
        let resp = self
            .http
            .get(format!("{org}/api/v1/users"))
            .header("Authorization", format!("SSWS {token}"))
            .query(&[("q", q), ("limit", &limit.to_string())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(upstream_error(resp).await);
        }
        let users = resp.json::<Vec<OktaUser>>().await?;
        Ok(users.into_iter().map(Into::into).collect())
    }
}

async fn upstream_error(resp: reqwest::Response) -> DirectoryError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    DirectoryError::Upstream { status, body }
}
