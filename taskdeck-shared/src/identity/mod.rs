/// Identity provider boundary
///
/// Taskdeck does not authenticate users itself. A hosted auth service issues
/// sessions and answers "who is this session" lookups; this module defines
/// the contract the API server consumes and ships an HTTP implementation.
///
/// # Modules
///
/// - `http`: `HttpIdentityProvider`, the reqwest client for the hosted service
/// - `pkce`: verifier/challenge generation for the login redirect
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::identity::{IdentityProvider, http::{HttpIdentityConfig, HttpIdentityProvider}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = HttpIdentityProvider::new(HttpIdentityConfig {
///     base_url: "https://auth.example.com/auth/v1".parse()?,
///     api_key: "public-anon-key".to_string(),
///     oauth_provider: "github".to_string(),
///     timeout_seconds: 10,
/// })?;
///
/// let session = provider.exchange_authorization_code("code-from-redirect", None).await?;
/// if let Some(identity) = provider.current_identity(&session).await? {
///     println!("signed in as {}", identity.email);
/// }
/// # Ok(())
/// # }
/// ```

pub mod http;
pub mod pkce;

use crate::error::IdentityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An authenticated subject as known to the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-issued subject identifier
    pub id: String,

    /// Primary email address
    pub email: String,

    /// Display name supplied by the provider, if any
    pub display_name: Option<String>,

    /// Avatar reference supplied by the provider, if any
    pub avatar_url: Option<String>,
}

/// Provider-issued credential for the current browser
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: Option<i64>,
    pub token_type: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Operations consumed from the hosted auth service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trades an authorization code (and the PKCE verifier that started the
    /// flow, when there is one) for a session.
    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, IdentityError>;

    /// Resolves the identity behind a session.
    ///
    /// `Ok(None)` is a legitimate answer right after an exchange: the session
    /// may not have propagated yet.
    async fn current_identity(&self, session: &Session) -> Result<Option<Identity>, IdentityError>;

    /// Builds the consent URL that starts a login.
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> Result<String, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_debug_redacts_tokens() {
        let session = Session {
            access_token: "secret-access".to_string(),
            refresh_token: Some("secret-refresh".to_string()),
            expires_in: Some(3600),
            token_type: "bearer".to_string(),
        };

        let printed = format!("{:?}", session);
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("3600"));
    }
}
