//! HTTP request handlers.

pub mod admin_users;
pub mod audit_logs;
pub mod auth;
pub mod cache;
pub mod directory;
pub mod emergency;
pub mod health;
pub mod oauth;
pub mod settings;
