//! Authentication and authorization logic.
//!
//! Provides JWT management, Easy Auth header parsing, OAuth/Office token
//! exchange, break-glass verification, and the admin allowlist queries
//! shared by `rolodex_api`.

pub mod breakglass;
pub mod easyauth;
pub mod jwt;
pub mod oauth;
pub mod office;
pub mod queries;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Authentication is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}
