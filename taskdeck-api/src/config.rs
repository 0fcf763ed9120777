/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `PUBLIC_URL`: Origin used when a request carries no `Host` header
///   (default: http://localhost:8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS and `Secure` cookies (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `AUTH_URL`: Identity provider base URL (required)
/// - `AUTH_API_KEY`: Identity provider public API key (required)
/// - `AUTH_OAUTH_PROVIDER`: Upstream OAuth provider for logins (default: github)
/// - `AUTH_TIMEOUT_SECONDS`: Identity provider request timeout (default: 10)
/// - `COOKIE_SECRET`: At least 64 bytes used to encrypt the PKCE verifier
///   cookie (default: a random key per process)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Identity provider configuration
    pub auth: AuthConfig,

    /// Log output format
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Externally visible origin, e.g. `https://app.example.com`
    pub public_url: String,

    /// Allowed CORS origins (`*` = permissive)
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, secure cookies)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the hosted auth REST API
    pub url: String,

    /// Public API key sent with every provider request
    pub api_key: String,

    /// Upstream OAuth provider shown on the consent page
    pub oauth_provider: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Key material for private cookies; a random key is used when unset
    #[serde(skip_serializing)]
    pub cookie_secret: Option<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be `pretty` or `json`, got `{}`", other),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", api_port))
            .trim_end_matches('/')
            .to_string();

        let cors_origins = parse_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        let production = env::var("PRODUCTION")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let auth_url = env::var("AUTH_URL")
            .map_err(|_| anyhow::anyhow!("AUTH_URL environment variable is required"))?;

        let auth_api_key = env::var("AUTH_API_KEY")
            .map_err(|_| anyhow::anyhow!("AUTH_API_KEY environment variable is required"))?;

        let oauth_provider =
            env::var("AUTH_OAUTH_PROVIDER").unwrap_or_else(|_| "github".to_string());

        let timeout_seconds = env::var("AUTH_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()?;

        let cookie_secret = parse_cookie_secret(env::var("COOKIE_SECRET").ok())?;

        let log_format = env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .parse::<LogFormat>()?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                public_url,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            auth: AuthConfig {
                url: auth_url,
                api_key: auth_api_key,
                oauth_provider,
                timeout_seconds,
                cookie_secret,
            },
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Minimum key length accepted by the private cookie jar
pub const MIN_COOKIE_SECRET_BYTES: usize = 64;

fn parse_cookie_secret(raw: Option<String>) -> anyhow::Result<Option<String>> {
    match raw {
        Some(secret) if secret.trim().is_empty() => Ok(None),
        Some(secret) if secret.len() < MIN_COOKIE_SECRET_BYTES => anyhow::bail!(
            "COOKIE_SECRET must be at least {} bytes, got {}",
            MIN_COOKIE_SECRET_BYTES,
            secret.len()
        ),
        other => Ok(other),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
