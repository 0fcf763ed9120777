/// HTTP client for the hosted auth service
///
/// Talks to a GoTrue-style REST API:
///
/// ```text
/// POST {base}/token?grant_type=pkce   { "auth_code": ..., "code_verifier": ... }
/// GET  {base}/user                    Authorization: Bearer <access_token>
/// GET  {base}/authorize?provider=..&redirect_to=..&code_challenge=..
/// ```
///
/// Every request carries the project's public `apikey` header. There are no
/// retries; each call is attempted once.

use super::{Identity, IdentityProvider, Session};
use crate::error::IdentityError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Connection settings for the hosted auth service
#[derive(Debug, Clone)]
pub struct HttpIdentityConfig {
    /// Base URL of the auth REST API, e.g. `https://xyz.example.co/auth/v1`
    pub base_url: Url,

    /// Public API key sent as the `apikey` header
    pub api_key: String,

    /// External OAuth provider the consent page should use (e.g. `github`)
    pub oauth_provider: String,

    /// Per-request timeout
    pub timeout_seconds: u64,
}

/// reqwest-backed `IdentityProvider`
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    oauth_provider: String,
}

#[derive(Debug, Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

/// Free-form metadata copied from the upstream OAuth profile. Different
/// upstreams use different keys for the same thing.
#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

impl ProviderUser {
    fn into_identity(self) -> Result<Identity, IdentityError> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(IdentityError::MissingEmail)?;

        let UserMetadata {
            full_name,
            name,
            avatar_url,
            picture,
        } = self.user_metadata;

        Ok(Identity {
            id: self.id,
            email,
            display_name: non_blank(full_name).or_else(|| non_blank(name)),
            avatar_url: non_blank(avatar_url).or_else(|| non_blank(picture)),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl HttpIdentityProvider {
    /// Builds the client. The base URL is normalised to end with `/` so that
    /// endpoint paths join beneath it instead of replacing its last segment.
    pub fn new(config: HttpIdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("taskdeck/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let mut base_url = config.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            oauth_provider: config.oauth_provider,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, IdentityError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "pkce");

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&PkceGrant {
                auth_code: code,
                code_verifier,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Token exchange rejected");
            return Err(IdentityError::Rejected(status.as_u16()));
        }

        let token: TokenResponse = response.json().await?;

        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            token_type: token.token_type,
        })
    }

    async fn current_identity(&self, session: &Session) -> Result<Option<Identity>, IdentityError> {
        let response = self
            .client
            .get(self.endpoint("user")?)
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => {
                debug!(status = response.status().as_u16(), "Session has no identity");
                return Ok(None);
            }
            status if !status.is_success() => {
                return Err(IdentityError::Rejected(status.as_u16()));
            }
            _ => {}
        }

        let user: ProviderUser = response.json().await?;
        user.into_identity().map(Some)
    }

    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> Result<String, IdentityError> {
        let mut url = self.endpoint("authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", &self.oauth_provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");

        Ok(url.into())
    }
}
