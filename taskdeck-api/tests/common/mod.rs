//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An in-memory store implementing both `ProfileStore` and `SearchStore`
//! - A scripted identity provider
//! - Router construction and request helpers
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use taskdeck_api::app::{build_router, AppState};
use taskdeck_api::config::{ApiConfig, AuthConfig, Config, DatabaseConfig, LogFormat};
use taskdeck_shared::identity::{Identity, IdentityProvider, Session};
use taskdeck_shared::models::profile::{NewProfile, Profile, ProfileInsert, ProfileStore};
use taskdeck_shared::models::project::{Project, ProjectSummary};
use taskdeck_shared::models::task::{ProjectRef, Task, TaskSummary};
use taskdeck_shared::search::SearchStore;
use taskdeck_shared::{IdentityError, StoreError};
use tower::Service as _;
use uuid::Uuid;

pub const VALID_CODE: &str = "valid-code";

/// In-memory relational store with call counters and failure switches
#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<String, Profile>>,
    projects: Mutex<Vec<Project>>,
    tasks: Mutex<Vec<Task>>,
    pub profile_calls: AtomicUsize,
    pub inserts: AtomicUsize,
    pub insert_attempts: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub fail_profiles: AtomicBool,
    pub fail_inserts: AtomicBool,
    pub fail_projects: AtomicBool,
    pub fail_tasks: AtomicBool,
}

impl MemoryStore {
    pub fn add_profile(&self, id: &str, email: &str) {
        let now = Utc::now();
        self.profiles.lock().unwrap().insert(
            id.to_string(),
            Profile {
                id: id.to_string(),
                email: email.to_string(),
                full_name: "Existing User".to_string(),
                avatar_url: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn profile(&self, id: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(id).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    pub fn add_project(&self, title: &str, description: Option<&str>) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.projects.lock().unwrap().push(Project {
            id,
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            status: "active".to_string(),
            priority: "high".to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn add_task(&self, project_id: Option<Uuid>, title: &str, description: Option<&str>) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.tasks.lock().unwrap().push(Task {
            id,
            project_id,
            title: title.to_string(),
            status: "todo".to_string(),
            phase: Some("build".to_string()),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn total_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst) + self.search_calls.load(Ordering::SeqCst)
    }
}

/// Evaluates the `%needle%` patterns produced by `SearchQuery::pattern`
fn like_matches(pattern: &str, text: Option<&str>) -> bool {
    let inner = pattern.strip_prefix('%').unwrap_or(pattern);
    let inner = inner.strip_suffix('%').unwrap_or(inner);

    let mut needle = String::new();
    let mut escaped = false;
    for c in inner.chars() {
        if !escaped && c == '\\' {
            escaped = true;
            continue;
        }
        escaped = false;
        needle.push(c);
    }

    text.map(|t| t.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

fn project_summary(project: &Project) -> ProjectSummary {
    ProjectSummary {
        id: project.id,
        title: project.title.clone(),
        slug: project.slug.clone(),
        status: project.status.clone(),
        priority: project.priority.clone(),
    }
}

fn task_summary(task: &Task, project: Option<ProjectRef>) -> TaskSummary {
    TaskSummary {
        id: task.id,
        title: task.title.clone(),
        status: task.status.clone(),
        phase: task.phase.clone(),
        project,
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("profiles offline".to_string()));
        }
        Ok(self.profile(id))
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileInsert, StoreError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_profiles.load(Ordering::SeqCst) || self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }

        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&profile.id) {
            return Ok(ProfileInsert::AlreadyExists);
        }

        let now = Utc::now();
        let row = Profile {
            id: profile.id.clone(),
            email: profile.email,
            full_name: profile.full_name,
            avatar_url: profile.avatar_url,
            created_at: now,
            updated_at: now,
        };
        profiles.insert(profile.id, row.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(ProfileInsert::Created(row))
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn search_projects(
        &self,
        pattern: &str,
        limit: i64,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_projects.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("projects offline".to_string()));
        }

        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                like_matches(pattern, Some(p.title.as_str())) || like_matches(pattern, p.description.as_deref())
            })
            .take(limit as usize)
            .map(project_summary)
            .collect())
    }

    async fn search_tasks(&self, pattern: &str, limit: i64) -> Result<Vec<TaskSummary>, StoreError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tasks.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("tasks offline".to_string()));
        }

        let projects = self.projects.lock().unwrap();
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                like_matches(pattern, Some(t.title.as_str())) || like_matches(pattern, t.description.as_deref())
            })
            .take(limit as usize)
            .map(|t| {
                let parent = t
                    .project_id
                    .and_then(|id| projects.iter().find(|p| p.id == id))
                    .map(|p| ProjectRef {
                        id: p.id,
                        title: p.title.clone(),
                        slug: p.slug.clone(),
                    });
                task_summary(t, parent)
            })
            .collect())
    }
}

/// Identity provider that accepts one code and reports a fixed identity
pub struct ScriptedIdentity {
    identity: Mutex<Option<Identity>>,
    lookup_fails: AtomicBool,
    pub exchanges: AtomicUsize,
    pub last_verifier: Mutex<Option<String>>,
    pub last_challenge: Mutex<Option<String>>,
}

impl ScriptedIdentity {
    pub fn new(identity: Option<Identity>) -> Self {
        Self {
            identity: Mutex::new(identity),
            lookup_fails: AtomicBool::new(false),
            exchanges: AtomicUsize::new(0),
            last_verifier: Mutex::new(None),
            last_challenge: Mutex::new(None),
        }
    }

    pub fn fail_lookups(&self) {
        self.lookup_fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn exchange_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, IdentityError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        *self.last_verifier.lock().unwrap() = code_verifier.map(str::to_string);

        if code != VALID_CODE {
            return Err(IdentityError::Rejected(400));
        }

        Ok(Session {
            access_token: "access-token".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            expires_in: Some(3600),
            token_type: "bearer".to_string(),
        })
    }

    async fn current_identity(&self, _session: &Session) -> Result<Option<Identity>, IdentityError> {
        if self.lookup_fails.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected(503));
        }
        Ok(self.identity.lock().unwrap().clone())
    }

    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> Result<String, IdentityError> {
        *self.last_challenge.lock().unwrap() = Some(code_challenge.to_string());
        let mut url = url::Url::parse("https://auth.test/authorize")?;
        url.query_pairs_mut()
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge);
        Ok(url.into())
    }
}

pub fn identity(id: &str, email: &str, display_name: Option<&str>) -> Identity {
    Identity {
        id: id.to_string(),
        email: email.to_string(),
        display_name: display_name.map(str::to_string),
        avatar_url: None,
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: "http://taskdeck.test".to_string(),
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        auth: AuthConfig {
            url: "https://auth.test".to_string(),
            api_key: "anon".to_string(),
            oauth_provider: "github".to_string(),
            timeout_seconds: 5,
            cookie_secret: Some("taskdeck-test-cookie-secret-".repeat(4)),
        },
        log_format: LogFormat::Pretty,
    }
}

/// Test context containing the router and its collaborators
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<ScriptedIdentity>,
}

impl TestContext {
    pub fn new(identity: Option<Identity>) -> Self {
        let store = Arc::new(MemoryStore::default());
        let provider = Arc::new(ScriptedIdentity::new(identity));

        let state = AppState::new(store.clone(), store.clone(), provider.clone(), test_config());

        TestContext {
            app: build_router(state),
            store,
            identity: provider,
        }
    }

    /// Number of store calls of any kind made so far
    pub fn store_calls(&self) -> usize {
        self.store.total_calls()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header("host", "localhost")
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.unwrap()
    }
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get("location")
        .expect("missing Location header")
        .to_str()
        .unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
