//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Upstream(m) => {
                // Upstream detail goes to the log, not the client.
                tracing::warn!(detail = %m, "upstream request failed");
                (StatusCode::BAD_GATEWAY, "upstream_error", "Upstream service error")
            }
            AppError::Internal(m) => {
                tracing::error!(detail = %m, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error")
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<rolodex_core::auth::AuthError> for AppError {
    fn from(e: rolodex_core::auth::AuthError) -> Self {
        match e {
            rolodex_core::auth::AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid credentials".into())
            }
            rolodex_core::auth::AuthError::TokenExpired => {
                AppError::Unauthorized("Token expired".into())
            }
            rolodex_core::auth::AuthError::InvalidToken => {
                AppError::Unauthorized("Invalid token".into())
            }
            rolodex_core::auth::AuthError::TokenExchange(msg) => AppError::Upstream(msg),
            rolodex_core::auth::AuthError::TokenEncoding(msg) => AppError::Internal(msg),
            rolodex_core::auth::AuthError::NotConfigured(what) => {
                AppError::Internal(format!("{what} is not configured"))
            }
            rolodex_core::auth::AuthError::Db(e) => AppError::from(e),
        }
    }
}

impl From<rolodex_core::directory::DirectoryError> for AppError {
    fn from(e: rolodex_core::directory::DirectoryError) -> Self {
        match e {
            rolodex_core::directory::DirectoryError::Request(e) => AppError::Upstream(e.to_string()),
            rolodex_core::directory::DirectoryError::Upstream { status, body } => {
                AppError::Upstream(format!("HTTP {status}: {body}"))
            }
            rolodex_core::directory::DirectoryError::NotConfigured(what) => {
                AppError::Internal(format!("{what} is not configured"))
            }
            rolodex_core::directory::DirectoryError::NotFound => {
                AppError::NotFound("User not found".into())
            }
        }
    }
}

impl From<rolodex_core::settings::SettingsError> for AppError {
    fn from(e: rolodex_core::settings::SettingsError) -> Self {
        match e {
            rolodex_core::settings::SettingsError::Encryption(msg) => AppError::Internal(msg),
            rolodex_core::settings::SettingsError::Db(e) => AppError::from(e),
        }
    }
}
