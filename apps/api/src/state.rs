use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::jobs::aggregator::JobAggregator;
use crate::workflow::engine::WorkflowEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub engine: Arc<WorkflowEngine>,
    /// Same aggregator the job matching node uses; exposed for direct search.
    pub aggregator: Arc<JobAggregator>,
}
