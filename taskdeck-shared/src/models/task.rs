/// Task model
///
/// A task belongs to at most one project (many-to-one). Search results carry
/// a denormalized summary of the parent so the caller does not need a second
/// round trip.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     status VARCHAR(50) NOT NULL DEFAULT 'todo',
///     phase VARCHAR(100),
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Full task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning project (None for unfiled tasks)
    pub project_id: Option<Uuid>,

    pub title: String,

    pub status: String,

    /// Delivery phase label, e.g. "discovery" or "build"
    pub phase: Option<String>,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Parent project fields embedded in a task search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

/// Projection returned by search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub phase: Option<String>,
    pub project: Option<ProjectRef>,
}

/// Flat row produced by the task/project join
#[derive(Debug, sqlx::FromRow)]
struct TaskSearchRow {
    id: Uuid,
    title: String,
    status: String,
    phase: Option<String>,
    project_id: Option<Uuid>,
    project_title: Option<String>,
    project_slug: Option<String>,
}

impl From<TaskSearchRow> for TaskSummary {
    fn from(row: TaskSearchRow) -> Self {
        let project = match (row.project_id, row.project_title, row.project_slug) {
            (Some(id), Some(title), Some(slug)) => Some(ProjectRef { id, title, slug }),
            _ => None,
        };

        TaskSummary {
            id: row.id,
            title: row.title,
            status: row.status,
            phase: row.phase,
            project,
        }
    }
}

impl Task {
    /// Tasks whose title or description matches an `ILIKE` pattern, joined
    /// with their parent project
    ///
    /// No ordering is applied; rows come back in scan order.
    pub async fn search(
        pool: &PgPool,
        pattern: &str,
        limit: i64,
    ) -> Result<Vec<TaskSummary>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TaskSearchRow>(
            r#"
            SELECT t.id, t.title, t.status, t.phase,
                   p.id AS project_id, p.title AS project_title, p.slug AS project_slug
            FROM tasks t
            LEFT JOIN projects p ON p.id = t.project_id
            WHERE t.title ILIKE $1 OR t.description ILIKE $1
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(TaskSummary::from).collect())
    }
}
