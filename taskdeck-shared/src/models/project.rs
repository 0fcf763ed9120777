/// Project model
///
/// Projects are read-only in this service; they are written by the
/// dashboard's CRUD endpoints and the maintenance scripts.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     slug VARCHAR(255) NOT NULL UNIQUE,
///     status VARCHAR(50) NOT NULL DEFAULT 'planning',
///     priority VARCHAR(50) NOT NULL DEFAULT 'medium',
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Full project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    /// URL-safe unique handle
    pub slug: String,
    pub status: String,
    pub priority: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Projection returned by search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub priority: String,
}

impl Project {
    /// Projects whose title or description matches an `ILIKE` pattern
    ///
    /// No ordering is applied; rows come back in scan order.
    pub async fn search(
        pool: &PgPool,
        pattern: &str,
        limit: i64,
    ) -> Result<Vec<ProjectSummary>, sqlx::Error> {
        let projects = sqlx::query_as::<_, ProjectSummary>(
            r#"
            SELECT id, title, slug, status, priority
            FROM projects
            WHERE title ILIKE $1 OR description ILIKE $1
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }
}
