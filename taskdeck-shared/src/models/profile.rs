/// User profile model and store
///
/// A profile is the application's own record of a user, keyed by the
/// identity provider's subject id. It is created on the first successful
/// login and never deleted by the login flow.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id TEXT PRIMARY KEY,
///     email TEXT NOT NULL,
///     full_name TEXT NOT NULL,
///     avatar_url TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::identity::Identity;
/// use taskdeck_shared::models::profile::{NewProfile, Profile};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let identity = Identity {
///     id: "8f14e45f".to_string(),
///     email: "ada@example.com".to_string(),
///     display_name: None,
///     avatar_url: None,
/// };
///
/// if Profile::insert_if_absent(&pool, NewProfile::from_identity(&identity)).await?.is_none() {
///     println!("profile already existed");
/// }
/// # Ok(())
/// # }
/// ```

use crate::error::StoreError;
use crate::identity::Identity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Persisted user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Identity provider subject id
    pub id: String,

    pub email: String,

    /// Display name, defaulted from the email local-part
    pub full_name: String,

    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for provisioning a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

impl NewProfile {
    /// Derives the first-login profile for an identity
    ///
    /// The full name is the provider's display name when it has one, else
    /// the part of the email before `@`.
    pub fn from_identity(identity: &Identity) -> Self {
        let full_name = identity
            .display_name
            .clone()
            .unwrap_or_else(|| email_local_part(&identity.email).to_string());

        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            full_name,
            avatar_url: identity.avatar_url.clone(),
        }
    }
}

/// Substring before the first `@`; the whole input when there is none
pub fn email_local_part(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

/// Outcome of `ProfileStore::insert_profile`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileInsert {
    /// A new row was written
    Created(Profile),

    /// A row with the same id was already present; nothing was written
    AlreadyExists,
}

/// Profile persistence consumed by the auth bootstrap flow
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Inserts the profile unless one already exists for `profile.id`.
    ///
    /// Must be atomic with respect to concurrent inserts of the same id.
    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileInsert, StoreError>;
}

impl Profile {
    /// Finds a profile by identity id
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name, avatar_url, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    /// Inserts a profile, leaving an existing row with the same id untouched
    ///
    /// # Returns
    ///
    /// The new row, or `None` if the id was already taken
    pub async fn insert_if_absent(
        pool: &PgPool,
        data: NewProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO users (id, email, full_name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            RETURNING id, email, full_name, avatar_url, created_at, updated_at
            "#,
        )
        .bind(data.id)
        .bind(data.email)
        .bind(data.full_name)
        .bind(data.avatar_url)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }
}

/// `ProfileStore` over PostgreSQL
#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(Profile::find_by_id(&self.pool, id).await?)
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileInsert, StoreError> {
        Ok(match Profile::insert_if_absent(&self.pool, profile).await? {
            Some(created) => ProfileInsert::Created(created),
            None => ProfileInsert::AlreadyExists,
        })
    }
}
