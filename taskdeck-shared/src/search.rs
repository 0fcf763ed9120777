/// Cross-entity text search
///
/// A query is matched case-insensitively as a substring of either the
/// `title` or the `description` of projects and tasks. Each entity kind is
/// capped at `SEARCH_LIMIT` rows and returned in whatever order the store
/// scans them.
///
/// # Example
///
/// ```
/// use taskdeck_shared::search::SearchQuery;
///
/// let query = SearchQuery::parse(Some("  EngIne ")).unwrap();
/// assert_eq!(query.pattern(), "%engine%");
///
/// assert!(SearchQuery::parse(Some(" a ")).is_none());
/// ```

use crate::error::StoreError;
use crate::models::project::{Project, ProjectSummary};
use crate::models::task::{Task, TaskSummary};
use async_trait::async_trait;
use sqlx::PgPool;

/// Queries shorter than this (after trimming) are not searched
pub const MIN_QUERY_CHARS: usize = 2;

/// Maximum rows returned per entity kind
pub const SEARCH_LIMIT: i64 = 5;

/// A normalized, searchable query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    /// Normalizes raw input, or returns `None` when it is too short to search
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            return None;
        }

        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// The lower-cased query text
    pub fn as_str(&self) -> &str {
        &self.needle
    }

    /// `ILIKE` pattern for substring matching; `%`, `_` and `\` in the
    /// query match literally.
    pub fn pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.needle.len() + 2);
        pattern.push('%');
        for c in self.needle.chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// Search lookups consumed by the search endpoint
#[async_trait]
pub trait SearchStore: Send + Sync {
    async fn search_projects(
        &self,
        pattern: &str,
        limit: i64,
    ) -> Result<Vec<ProjectSummary>, StoreError>;

    /// Matching tasks with their parent project embedded
    async fn search_tasks(&self, pattern: &str, limit: i64) -> Result<Vec<TaskSummary>, StoreError>;
}

/// `SearchStore` over PostgreSQL
#[derive(Debug, Clone)]
pub struct PgSearchStore {
    pool: PgPool,
}

impl PgSearchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchStore for PgSearchStore {
    async fn search_projects(
        &self,
        pattern: &str,
        limit: i64,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        Ok(Project::search(&self.pool, pattern, limit).await?)
    }

    async fn search_tasks(&self, pattern: &str, limit: i64) -> Result<Vec<TaskSummary>, StoreError> {
        Ok(Task::search(&self.pool, pattern, limit).await?)
    }
}
