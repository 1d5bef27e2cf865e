//! Service layer orchestrating core operations for the handlers.

pub mod auth;
pub mod bootstrap;
pub mod cookies;
