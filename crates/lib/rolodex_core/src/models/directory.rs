//! Directory domain models.
//!
//! Normalized shapes returned by the Okta and Microsoft Graph clients.
//! Serialized camelCase because handlers pass them through to the API
//! unchanged.

use serde::{Deserialize, Serialize};

/// A directory person, normalized from an Okta user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub manager: Option<String>,
}

/// A person as Microsoft Graph reports them (org-chart nodes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    pub id: String,
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
}

impl GraphUser {
    /// Address used to correlate Graph records with directory emails.
    pub fn address(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
    }
}

/// Microsoft 365 group membership entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembership {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub mail: Option<String>,
}

/// Teams presence snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub availability: String,
    pub activity: String,
}

/// Graph date-time with an explicit time zone, passed through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeTimeZone {
    pub date_time: String,
    pub time_zone: String,
}

/// Automatic-replies (out-of-office) mailbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutOfOffice {
    /// `disabled`, `alwaysEnabled` or `scheduled`.
    pub status: String,
    pub internal_reply_message: Option<String>,
    pub external_reply_message: Option<String>,
    pub scheduled_start_date_time: Option<DateTimeTimeZone>,
    pub scheduled_end_date_time: Option<DateTimeTimeZone>,
}

/// Manager, peers and direct reports for one person.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgChart {
    pub manager: Option<GraphUser>,
    pub peers: Vec<GraphUser>,
    pub direct_reports: Vec<GraphUser>,
}
