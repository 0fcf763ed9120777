/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// External collaborators (the profile store, the search store and the
/// identity provider) are held as trait objects so handlers can be driven
/// by in-memory implementations in tests.
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::from_pool(pool, config)?;
/// let app = taskdeck_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use sqlx::PgPool;
use std::sync::Arc;
use taskdeck_shared::{
    identity::{
        http::{HttpIdentityConfig, HttpIdentityProvider},
        IdentityProvider,
    },
    models::profile::{PgProfileStore, ProfileStore},
    search::{PgSearchStore, SearchStore},
    IdentityError,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Profile persistence for the auth bootstrap flow
    pub profiles: Arc<dyn ProfileStore>,

    /// Project and task lookups for search
    pub search: Arc<dyn SearchStore>,

    /// Hosted identity provider
    pub identity: Arc<dyn IdentityProvider>,

    /// Database pool, when the stores are PostgreSQL-backed
    pub db: Option<PgPool>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Encryption key for private cookies
    pub cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl AppState {
    /// Creates state from explicit collaborators
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        search: Arc<dyn SearchStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Config,
    ) -> Self {
        let cookie_key = load_cookie_key(config.auth.cookie_secret.as_deref());

        Self {
            profiles,
            search,
            identity,
            db: None,
            config: Arc::new(config),
            cookie_key,
        }
    }

    /// Wires the PostgreSQL stores and the HTTP identity provider
    ///
    /// # Errors
    ///
    /// Returns an error if `config.auth.url` is not a valid URL or the HTTP
    /// client cannot be built.
    pub fn from_pool(pool: PgPool, config: Config) -> Result<Self, IdentityError> {
        let identity = HttpIdentityProvider::new(HttpIdentityConfig {
            base_url: config.auth.url.parse()?,
            api_key: config.auth.api_key.clone(),
            oauth_provider: config.auth.oauth_provider.clone(),
            timeout_seconds: config.auth.timeout_seconds,
        })?;

        let mut state = Self::new(
            Arc::new(PgProfileStore::new(pool.clone())),
            Arc::new(PgSearchStore::new(pool.clone())),
            Arc::new(identity),
            config,
        );
        state.db = Some(pool);
        Ok(state)
    }
}

/// Derives the private cookie key, or generates one for this process
///
/// A generated key does not survive restarts, so logins in flight during a
/// restart fail their verifier check.
fn load_cookie_key(secret: Option<&str>) -> Key {
    match secret.map(|s| Key::try_from(s.as_bytes())) {
        Some(Ok(key)) => key,
        Some(Err(err)) => {
            warn!(error = %err, "Invalid COOKIE_SECRET; using a generated key");
            Key::generate()
        }
        None => {
            warn!("COOKIE_SECRET not set; using a generated key");
            Key::generate()
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health              # Health check
/// ├── /auth/
/// │   ├── GET  /login           # Start a PKCE login
/// │   ├── GET  /callback        # Code exchange + profile provisioning
/// │   └── POST /logout          # Clear session cookies
/// └── /api/
///     └── GET  /search?q=       # Project + task search
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/login", get(routes::auth::login))
        .route("/callback", get(routes::auth::callback))
        .route("/logout", post(routes::auth::logout));

    let api_routes = Router::new().route("/search", get(routes::search::search));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
