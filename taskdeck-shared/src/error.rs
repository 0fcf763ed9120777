//! Error types shared by the stores and the identity provider client.

use thiserror::Error;

/// Failures raised by the relational store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or connection failure reported by sqlx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backing store refused the call (used by non-SQL stores)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failures raised while talking to the identity provider
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Transport-level failure (DNS, TLS, timeout, malformed body)
    #[error("Identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Identity provider rejected the request with status {0}")]
    Rejected(u16),

    /// The provider returned a user document without an email address
    #[error("Identity has no email address")]
    MissingEmail,

    /// A provider URL could not be built from configuration
    #[error("Invalid identity provider URL: {0}")]
    InvalidUrl(String),
}

impl From<url::ParseError> for IdentityError {
    fn from(err: url::ParseError) -> Self {
        IdentityError::InvalidUrl(err.to_string())
    }
}
