pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::jobs::handlers as jobs;
use crate::state::AppState;
use crate::workflow::handlers as workflow;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::readiness_handler))
        // Workflow API
        .route("/api/v1/workflow/invoke", post(workflow::handle_invoke))
        .route("/api/v1/workflow/stream", post(workflow::handle_stream))
        // Direct job search (no ranking)
        .route("/api/v1/jobs/search", get(jobs::handle_search_jobs))
        .fallback(not_found)
        .with_state(state)
}
