/// Authentication endpoints
///
/// Login is delegated to the hosted identity provider. This module starts
/// the PKCE flow, finishes it when the provider redirects back, and makes
/// sure every identity has a profile row.
///
/// # Endpoints
///
/// - `GET /auth/login?next=` - Redirect to the provider consent page
/// - `GET /auth/callback?code=&next=` - Exchange the code, provision the profile
/// - `POST /auth/logout` - Clear the session cookies
///
/// # Callback flow
///
/// ```text
/// code missing ──────────────────────────────┐
/// exchange code ── rejected ─────────────────┤
///   │                                        ▼
///   ▼                               303 /login?error=...
/// resolve identity ── none/error ──┐
///   │                              │
///   ▼                              │
/// find profile ── found ───────────┤
///   │                              │
///   ▼ not found                    │
/// insert profile (failure logged) ─┤
///                                  ▼
///                         303 {origin}{next} + session cookies
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, PrivateCookieJar, SameSite};
use serde::Deserialize;
use taskdeck_shared::{
    identity::{pkce::PkceChallenge, Identity, Session},
    models::profile::{NewProfile, ProfileInsert, ProfileStore},
};
use time::Duration;
use tracing::{debug, error, info, warn};

/// Landing page after a successful login when `next` is absent or unsafe
pub const DEFAULT_NEXT: &str = "/dashboard";

/// Query string appended to `/login` when authentication fails
pub const LOGIN_ERROR_QUERY: &str = "error=Could%20not%20authenticate";

pub const ACCESS_TOKEN_COOKIE: &str = "taskdeck-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "taskdeck-refresh-token";
pub const CODE_VERIFIER_COOKIE: &str = "taskdeck-code-verifier";

const CODE_VERIFIER_MAX_AGE: Duration = Duration::minutes(10);
const REFRESH_TOKEN_MAX_AGE: Duration = Duration::days(30);

/// Query accepted by `GET /auth/callback`
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

/// Query accepted by `GET /auth/login`
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// What profile reconciliation did for a resolved identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSync {
    /// A profile already existed; nothing was written
    Existing,

    /// A profile was inserted on this login
    Created,

    /// The store failed; the login proceeds without a profile
    Failed,
}

/// GET /auth/login -> redirects to the provider consent page
///
/// Stores the PKCE verifier in a short-lived encrypted cookie so the
/// callback can prove it started this login.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    private_jar: PrivateCookieJar,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let origin = request_origin(&headers, &state.config.api.public_url);
    let requested = query.ok().and_then(|Query(q)| q.next);
    let next = safe_next(requested.as_deref());
    let secure = state.config.api.production;

    let pkce = PkceChallenge::generate();
    let redirect_to = format!(
        "{}/auth/callback?next={}",
        origin,
        url::form_urlencoded::byte_serialize(next.as_bytes()).collect::<String>()
    );
    let authorize_url = state.identity.authorize_url(&redirect_to, &pkce.challenge)?;

    let private_jar = private_jar.add(auth_cookie(
        CODE_VERIFIER_COOKIE,
        pkce.verifier,
        Some(CODE_VERIFIER_MAX_AGE),
        secure,
    ));

    info!(next = %next, "Dispatching login redirect");
    Ok((private_jar, see_other(&authorize_url)).into_response())
}

/// GET /auth/callback -> exchanges the code, provisions the profile, redirects
///
/// Never returns an error status: every failure becomes a redirect to the
/// login page, and profile provisioning failures do not block the login.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    private_jar: PrivateCookieJar,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Response {
    let origin = request_origin(&headers, &state.config.api.public_url);
    let secure = state.config.api.production;
    let jar = jar.add(expired_cookie(CODE_VERIFIER_COOKIE, secure));

    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed auth callback query");
            return failure_redirect(jar, &origin);
        }
    };
    let next = safe_next(query.next.as_deref());

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        warn!("Auth callback without `code`");
        return failure_redirect(jar, &origin);
    };

    let verifier = private_jar
        .get(CODE_VERIFIER_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());

    let session = match state
        .identity
        .exchange_authorization_code(code, verifier.as_deref())
        .await
    {
        Ok(session) => session,
        Err(err) => {
            warn!(error = %err, "Authorization code exchange failed");
            return failure_redirect(jar, &origin);
        }
    };

    match state.identity.current_identity(&session).await {
        Ok(Some(identity)) => {
            sync_profile(state.profiles.as_ref(), &identity).await;
        }
        Ok(None) => {
            warn!("Session established but no identity resolved; skipping profile sync");
        }
        Err(err) => {
            warn!(error = %err, "Identity lookup failed; skipping profile sync");
        }
    }

    info!(next = %next, "Login completed");
    (
        add_session_cookies(jar, session, secure),
        see_other(&format!("{}{}", origin, next)),
    )
        .into_response()
}

/// POST /auth/logout -> clears the session cookies and returns to `/login`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap, jar: CookieJar) -> Response {
    let origin = request_origin(&headers, &state.config.api.public_url);
    let secure = state.config.api.production;

    debug!("Clearing session cookies");
    let jar = jar
        .add(expired_cookie(ACCESS_TOKEN_COOKIE, secure))
        .add(expired_cookie(REFRESH_TOKEN_COOKIE, secure));

    (jar, see_other(&format!("{}/login", origin))).into_response()
}

/// Ensures `identity` has a profile row
///
/// Looks the profile up first so returning users cost a single read; the
/// insert itself is conflict-safe, so a concurrent first login for the same
/// identity still leaves exactly one row.
pub async fn sync_profile(store: &dyn ProfileStore, identity: &Identity) -> ProfileSync {
    match store.find_profile_by_id(&identity.id).await {
        Ok(Some(_)) => {
            debug!(user_id = %identity.id, "Returning user; profile already present");
            ProfileSync::Existing
        }
        Ok(None) => match store.insert_profile(NewProfile::from_identity(identity)).await {
            Ok(ProfileInsert::Created(profile)) => {
                info!(user_id = %profile.id, "Provisioned profile on first login");
                ProfileSync::Created
            }
            Ok(ProfileInsert::AlreadyExists) => {
                debug!(user_id = %identity.id, "Profile created by a concurrent login");
                ProfileSync::Existing
            }
            Err(err) => {
                error!(
                    user_id = %identity.id,
                    error = %err,
                    "Failed to provision profile; login continues without it"
                );
                ProfileSync::Failed
            }
        },
        Err(err) => {
            error!(
                user_id = %identity.id,
                error = %err,
                "Failed to look up profile; login continues without it"
            );
            ProfileSync::Failed
        }
    }
}

/// `{scheme}://{host}` of the inbound request
///
/// Honours `X-Forwarded-Proto`/`X-Forwarded-Host` from a reverse proxy and
/// falls back to `public_url` when no usable host is present.
pub fn request_origin(headers: &HeaderMap, public_url: &str) -> String {
    let host = header_str(headers, "x-forwarded-host")
        .or_else(|| header_str(headers, header::HOST.as_str()))
        .map(|h| h.split(',').next().unwrap_or_default().trim())
        .filter(|h| is_valid_host(h));

    let Some(host) = host else {
        return public_url.trim_end_matches('/').to_string();
    };

    let scheme = match header_str(headers, "x-forwarded-proto")
        .map(|p| p.split(',').next().unwrap_or_default().trim())
    {
        Some(p) if p.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };

    format!("{}://{}", scheme, host)
}

/// Post-login path, restricted to same-origin relative paths
///
/// Anything that could leave the origin (`//host`, `\`, absolute URLs) or
/// cannot be placed in a `Location` header verbatim falls back to
/// `DEFAULT_NEXT`.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        Some(path) => {
            warn!(next = %path, "Ignoring non-local redirect target");
            DEFAULT_NEXT
        }
        None => DEFAULT_NEXT,
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && path.chars().all(|c| c.is_ascii_graphic())
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn failure_redirect(jar: CookieJar, origin: &str) -> Response {
    (jar, see_other(&format!("{}/login?{}", origin, LOGIN_ERROR_QUERY))).into_response()
}

fn add_session_cookies(jar: CookieJar, session: Session, secure: bool) -> CookieJar {
    let access_max_age = session.expires_in.map(Duration::seconds);
    let jar = jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        session.access_token,
        access_max_age,
        secure,
    ));

    match session.refresh_token {
        Some(refresh_token) => jar.add(auth_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh_token,
            Some(REFRESH_TOKEN_MAX_AGE),
            secure,
        )),
        None => jar,
    }
}

fn auth_cookie(
    name: &'static str,
    value: String,
    max_age: Option<Duration>,
    secure: bool,
) -> Cookie<'static> {
    let builder = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);

    match max_age {
        Some(max_age) => builder.max_age(max_age).build(),
        None => builder.build(),
    }
}

/// Always emitted, whether or not the request carried the cookie
fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    auth_cookie(name, String::new(), Some(Duration::ZERO), secure)
}

fn see_other(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::SEE_OTHER, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            error!(location = %location, "Refusing to emit an invalid Location header");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}
