/// Search endpoint
///
/// # Endpoint
///
/// ```text
/// GET /api/search?q=engine
/// ```
///
/// # Response
///
/// ```json
/// {
///   "projects": [
///     { "id": "uuid", "title": "Search Engine Revamp", "slug": "search-engine-revamp",
///       "status": "active", "priority": "high" }
///   ],
///   "tasks": [
///     { "id": "uuid", "title": "Tune engine ranking", "status": "todo", "phase": "build",
///       "project": { "id": "uuid", "title": "Search Engine Revamp", "slug": "search-engine-revamp" } }
///   ]
/// }
/// ```
///
/// Queries shorter than two characters, and query strings that cannot be
/// parsed (for example a repeated `q`), return both lists empty without
/// touching the store. If either lookup fails the whole request fails with
/// `500 {"error": "Search failed"}`; partial results are never returned.

use crate::app::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    models::{project::ProjectSummary, task::TaskSummary},
    search::{SearchQuery, SEARCH_LIMIT},
};
use tracing::{debug, error};

/// Query accepted by `GET /api/search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Search result body
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub projects: Vec<ProjectSummary>,
    pub tasks: Vec<TaskSummary>,
}

/// Failure body for the search endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchErrorBody {
    pub error: String,
}

/// Returned when either store lookup fails
#[derive(Debug)]
pub struct SearchFailed;

impl IntoResponse for SearchFailed {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SearchErrorBody {
                error: "Search failed".to_string(),
            }),
        )
            .into_response()
    }
}

/// GET /api/search -> projects and tasks matching `q`
pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, SearchFailed> {
    let raw = match params {
        Ok(Query(params)) => params.q,
        Err(rejection) => {
            debug!(error = %rejection, "Unparseable search query; returning no results");
            None
        }
    };

    let Some(query) = SearchQuery::parse(raw.as_deref()) else {
        return Ok(Json(SearchResponse::default()));
    };

    let pattern = query.pattern();
    let (mut projects, mut tasks) = tokio::try_join!(
        state.search.search_projects(&pattern, SEARCH_LIMIT),
        state.search.search_tasks(&pattern, SEARCH_LIMIT),
    )
    .map_err(|err| {
        error!(error = %err, query = %query.as_str(), "Search failed");
        SearchFailed
    })?;

    projects.truncate(SEARCH_LIMIT as usize);
    tasks.truncate(SEARCH_LIMIT as usize);

    debug!(
        query = %query.as_str(),
        projects = projects.len(),
        tasks = tasks.len(),
        "Search completed"
    );

    Ok(Json(SearchResponse { projects, tasks }))
}
