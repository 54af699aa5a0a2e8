//! Axum route handlers for direct job search.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::jobs::aggregator::{AggregateRequest, AggregateResult, SearchStrategy};
use crate::state::AppState;

/// Hard ceiling on `max_results` regardless of what the caller asks for.
const MAX_RESULTS_CEILING: usize = 100;

#[derive(Debug, Deserialize)]
pub struct JobSearchQuery {
    #[serde(default)]
    pub query: String,
    pub location: Option<String>,
    pub max_results: Option<usize>,
    pub strategy: Option<String>,
}

/// GET /api/v1/jobs/search
///
/// Aggregates all sources without ranking. Source failures are reported in
/// `errors`; the request itself only fails on bad input.
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobSearchQuery>,
) -> Result<Json<AggregateResult>, AppError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }

    let strategy = match params.strategy.as_deref() {
        Some(raw) => raw
            .parse::<SearchStrategy>()
            .map_err(AppError::Validation)?,
        None => state.config.jobs.strategy,
    };

    let mut request = AggregateRequest::new(query, params.location);
    request.max_results = params
        .max_results
        .unwrap_or(state.config.jobs.max_results)
        .clamp(1, MAX_RESULTS_CEILING);
    request.allow_mock_fallback = state.config.jobs.enable_mock_jobs;
    request.strategy = strategy;

    Ok(Json(state.aggregator.aggregate(&request).await))
}
