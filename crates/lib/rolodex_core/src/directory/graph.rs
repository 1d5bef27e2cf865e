//! Microsoft Graph client.
//!
//! Application-permission client: a client-credentials token is fetched
//! once and cached, renewed when it is within a minute of expiry. All
//! people lookups address users by email (UPN), except presence, which
//! Graph only serves by object id.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

use super::DirectoryError;
use crate::models::directory::{GraphUser, GroupMembership, OrgChart, OutOfOffice, Presence};
use crate::settings::TenantSettings;

const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Renew the app token when less than this remains of its lifetime.
const TOKEN_RENEWAL_MARGIN: Duration = Duration::from_secs(60);

/// Field selection applied to user-shaped responses.
const USER_SELECT: &str = "$select=id,displayName,mail,userPrincipalName,jobTitle,department";

#[derive(Debug, Deserialize)]
struct AppTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedAppToken {
    token: String,
    expires_at: Instant,
}

impl CachedAppToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_RENEWAL_MARGIN < self.expires_at
    }
}

/// Graph collection envelope.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// `memberOf` returns heterogeneous directory objects; groups are picked
/// out by their OData type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDirectoryObject {
    #[serde(rename = "@odata.type")]
    odata_type: Option<String>,
    id: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    mail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

pub struct GraphClient {
    http: reqwest::Client,
    settings: Arc<RwLock<TenantSettings>>,
    token: RwLock<Option<CachedAppToken>>,
}

impl GraphClient {
    pub fn new(http: reqwest::Client, settings: Arc<RwLock<TenantSettings>>) -> Self {
        Self {
            http,
            settings,
            token: RwLock::new(None),
        }
    }

    /// Drop the cached app token, forcing a refetch on the next call.
    /// Called after the tenant credentials change.
    pub async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    /// Snapshot the current tenant credentials.
    async fn credentials(&self) -> Result<(String, String, String), DirectoryError> {
        let settings = self.settings.read().await;
        if settings.graph_tenant_id.is_empty()
            || settings.graph_client_id.is_empty()
            || settings.graph_client_secret.is_empty()
        {
            return Err(DirectoryError::NotConfigured("Microsoft Graph"));
        }
        Ok((
            settings.graph_tenant_id.clone(),
            settings.graph_client_id.clone(),
            settings.graph_client_secret.clone(),
        ))
    }

    /// Get a valid app token, renewing near expiry. Renewal single-flights
    /// behind the write lock.
    async fn app_token(&self) -> Result<String, DirectoryError> {
        {
            let cached = self.token.read().await;
            if let Some(t) = cached.as_ref()
                && t.is_fresh()
            {
                return Ok(t.token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another task may have renewed while we waited for the lock
        if let Some(t) = slot.as_ref()
            && t.is_fresh()
        {
            return Ok(t.token.clone());
        }

        let (tenant_id, client_id, client_secret) = self.credentials().await?;
        let resp =
            request_app_token(&self.http, &tenant_id, &client_id, &client_secret, None).await?;
        debug!(expires_in = resp.expires_in, "renewed Graph app token");

        let token = resp.access_token.clone();
        *slot = Some(CachedAppToken {
            token: resp.access_token,
            expires_at: Instant::now() + Duration::from_secs(resp.expires_in),
        });
        Ok(token)
    }

    /// Prove the stored credentials can mint a token, within `timeout`.
    /// Bypasses the cache so a test always exercises the round trip.
    pub async fn connectivity_test(&self, timeout: Duration) -> Result<(), DirectoryError> {
        let (tenant_id, client_id, client_secret) = self.credentials().await?;
        request_app_token(
            &self.http,
            &tenant_id,
            &client_id,
            &client_secret,
            Some(timeout),
        )
        .await
        .map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DirectoryError> {
        let token = self.app_token().await?;
        let resp = self
            .http
            .get(format!("{GRAPH_BASE}{path}"))
            .bearer_auth(token)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DirectoryError::Upstream { status, body });
        }
        Ok(resp.json::<T>().await?)
    }

    /// Microsoft 365 groups the user belongs to.
    pub async fn member_groups(&self, email: &str) -> Result<Vec<GroupMembership>, DirectoryError> {
        let raw = self
            .get_json::<ListResponse<RawDirectoryObject>>(&format!("/users/{email}/memberOf"))
            .await?;
        Ok(groups_from(raw.value))
    }

    /// Teams presence. Graph serves presence by object id only, so the
    /// email is resolved first.
    pub async fn presence(&self, email: &str) -> Result<Presence, DirectoryError> {
        let user = self
            .get_json::<IdOnly>(&format!("/users/{email}?$select=id"))
            .await?;
        self.get_json::<Presence>(&format!("/users/{}/presence", user.id))
            .await
    }

    /// Automatic-replies (out-of-office) mailbox settings.
    pub async fn out_of_office(&self, email: &str) -> Result<OutOfOffice, DirectoryError> {
        self.get_json::<OutOfOffice>(&format!(
            "/users/{email}/mailboxSettings/automaticRepliesSetting"
        ))
        .await
    }

    /// The user's manager, `None` when the reporting line stops here.
    pub async fn manager(&self, email: &str) -> Result<Option<GraphUser>, DirectoryError> {
        match self
            .get_json::<GraphUser>(&format!("/users/{email}/manager?{USER_SELECT}"))
            .await
        {
            Ok(user) => Ok(Some(user)),
            Err(DirectoryError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// People reporting directly to the user.
    pub async fn direct_reports(&self, email: &str) -> Result<Vec<GraphUser>, DirectoryError> {
        let raw = self
            .get_json::<ListResponse<GraphUser>>(&format!(
                "/users/{email}/directReports?{USER_SELECT}"
            ))
            .await?;
        Ok(raw.value)
    }

    /// Manager, peers and direct reports in one shot.
    ///
    /// Manager and reports are fetched concurrently; peers are the
    /// manager's reports minus the subject. Any branch failing fails the
    /// whole chart, no partial result.
    pub async fn org_chart(&self, email: &str) -> Result<OrgChart, DirectoryError> {
        let (manager, direct_reports) =
            tokio::try_join!(self.manager(email), self.direct_reports(email))?;

        let manager_reports = match manager.as_ref().and_then(|m| m.address()) {
            Some(manager_email) => self.direct_reports(manager_email).await?,
            None => Vec::new(),
        };

        Ok(assemble_org_chart(
            email,
            manager,
            direct_reports,
            manager_reports,
        ))
    }
}

async fn request_app_token(
    http: &reqwest::Client,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
    timeout: Option<Duration>,
) -> Result<AppTokenResponse, DirectoryError> {
    let url = format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token");
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("scope", "https://graph.microsoft.com/.default"),
    ];

    let mut req = http.post(&url).form(&params);
    if let Some(timeout) = timeout {
        req = req.timeout(timeout);
    }

    let resp = req.send().await?;
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(DirectoryError::Upstream { status, body });
    }
    Ok(resp.json::<AppTokenResponse>().await?)
}

fn groups_from(objects: Vec<RawDirectoryObject>) -> Vec<GroupMembership> {
    objects
        .into_iter()
        .filter(|o| {
            o.odata_type
                .as_deref()
                .is_some_and(|t| t.ends_with(".group"))
        })
        .filter_map(|o| {
            Some(GroupMembership {
                id: o.id?,
                display_name: o.display_name,
                description: o.description,
                mail: o.mail,
            })
        })
        .collect()
}

/// Derive the chart from already-fetched pieces. Peers are the manager's
/// reports with the subject removed (case-insensitive email match).
fn assemble_org_chart(
    subject_email: &str,
    manager: Option<GraphUser>,
    direct_reports: Vec<GraphUser>,
    manager_reports: Vec<GraphUser>,
) -> OrgChart {
    let peers = manager_reports
        .into_iter()
        .filter(|p| {
            p.address()
                .is_none_or(|a| !a.eq_ignore_ascii_case(subject_email))
        })
        .collect();
    OrgChart {
        manager,
        peers,
        direct_reports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str, mail: &str) -> GraphUser {
        GraphUser {
            id: id.to_string(),
            display_name: Some(id.to_uppercase()),
            mail: Some(mail.to_string()),
            user_principal_name: Some(mail.to_string()),
            job_title: None,
            department: None,
        }
    }

    #[test]
    fn org_chart_peers_exclude_subject() {
        let manager = Some(person("m", "boss@example.com"));
        let reports = vec![person("r1", "kid@example.com")];
        let manager_reports = vec![
            person("s", "Jo@Example.com"),
            person("p1", "peer1@example.com"),
            person("p2", "peer2@example.com"),
        ];
        let chart = assemble_org_chart("jo@example.com", manager, reports, manager_reports);
        assert_eq!(chart.peers.len(), 2);
        assert!(
            chart
                .peers
                .iter()
                .all(|p| p.mail.as_deref() != Some("Jo@Example.com"))
        );
        assert_eq!(chart.direct_reports.len(), 1);
        assert!(chart.manager.is_some());
    }

    #[test]
    fn org_chart_without_manager_has_no_peers() {
        let chart = assemble_org_chart("jo@example.com", None, Vec::new(), Vec::new());
        assert!(chart.manager.is_none());
        assert!(chart.peers.is_empty());
        assert!(chart.direct_reports.is_empty());
    }

    #[test]
    fn peer_without_address_is_kept() {
        let mut anonymous = person("x", "x@example.com");
        anonymous.mail = None;
        anonymous.user_principal_name = None;
        let chart = assemble_org_chart(
            "jo@example.com",
            Some(person("m", "boss@example.com")),
            Vec::new(),
            vec![anonymous],
        );
        assert_eq!(chart.peers.len(), 1);
    }

    #[test]
    fn member_of_filters_non_groups() {
        let json = r##"{
            "value": [
                {"@odata.type": "#microsoft.graph.group", "id": "g1", "displayName": "Platform Team", "mail": "platform@example.com"},
                {"@odata.type": "#microsoft.graph.directoryRole", "id": "dr1", "displayName": "Global Reader"},
                {"@odata.type": "#microsoft.graph.group", "id": "g2", "displayName": "All Hands", "description": "Everyone"}
            ]
        }"##;
        let raw: ListResponse<RawDirectoryObject> = serde_json::from_str(json).unwrap();
        let groups = groups_from(raw.value);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].display_name.as_deref(), Some("Platform Team"));
        assert_eq!(groups[1].description.as_deref(), Some("Everyone"));
    }

    #[test]
    fn empty_member_of_payload_parses() {
        let raw: ListResponse<RawDirectoryObject> = serde_json::from_str("{}").unwrap();
        assert!(groups_from(raw.value).is_empty());
    }

    #[test]
    fn fresh_token_check_honors_renewal_margin() {
        let fresh = CachedAppToken {
            token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(600),
        };
        assert!(fresh.is_fresh());

        let nearly_expired = CachedAppToken {
            token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!nearly_expired.is_fresh());
    }
}
