//! Directory upstream clients.
//!
//! Okta is the authoritative people directory (and the membership gate's
//! allowlist); Microsoft Graph supplies the collaboration extras: groups,
//! presence, out-of-office and reporting lines. Both clients read their
//! credentials from the live tenant settings on every call so an admin
//! update takes effect without a restart.

pub mod graph;
pub mod okta;

use thiserror::Error;

/// Directory upstream errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("User not found")]
    NotFound,
}
