//! # rolodex_core
//!
//! Core domain logic for Rolodex.

pub mod audit;
pub mod auth;
pub mod cache;
pub mod directory;
pub mod migrate;
pub mod models;
pub mod secrets;
pub mod settings;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
