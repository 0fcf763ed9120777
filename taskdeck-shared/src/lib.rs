//! # Taskdeck Shared Library
//!
//! Domain types, persistence and the identity provider client used by the
//! Taskdeck API server.
//!
//! ## Module Organization
//!
//! - `models`: profile, project and task rows plus the profile store
//! - `search`: query normalization and the search store
//! - `identity`: identity provider contract, HTTP client and PKCE helpers
//! - `db`: connection pool and migrations
//! - `error`: store and identity provider error types

pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod search;

pub use error::{IdentityError, StoreError};

/// Current version of the Taskdeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
