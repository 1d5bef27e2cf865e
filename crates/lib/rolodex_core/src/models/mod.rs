//! Domain models shared across `rolodex_core` and `rolodex_api`.

pub mod auth;
pub mod directory;
