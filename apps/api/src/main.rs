mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod schema;
mod state;
mod store;
mod workflow;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, JobSearchSettings};
use crate::db::create_pool;
use crate::jobs::aggregator::JobAggregator;
use crate::jobs::sources::adzuna::AdzunaClient;
use crate::jobs::sources::arbeitnow::ArbeitnowClient;
use crate::jobs::sources::limiter::RedisWindowLimiter;
use crate::jobs::sources::remoteok::RemoteOkClient;
use crate::jobs::sources::search_cache::RedisSearchCache;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgCareerStore;
use crate::workflow::engine::WorkflowEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerFlow API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Optional Redis for the shared search cache and rate-limit window
    let redis = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Redis client initialized");
            Some(client)
        }
        None => None,
    };

    let aggregator = Arc::new(build_aggregator(&config, redis));
    let store = Arc::new(PgCareerStore::new(db.clone()));
    let engine = Arc::new(WorkflowEngine::new(
        llm,
        aggregator.clone(),
        store,
        config.jobs.clone(),
    ));

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        engine,
        aggregator,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Registers the job sources. Adzuna is only used when credentials are set.
fn build_aggregator(config: &Config, redis: Option<redis::Client>) -> JobAggregator {
    let settings: &JobSearchSettings = &config.jobs;
    let mut aggregator = JobAggregator::new()
        .with_regional(Arc::new(ArbeitnowClient::new(settings)))
        .with_remote(Arc::new(RemoteOkClient::new(settings)));

    match &config.adzuna {
        Some(credentials) => {
            let mut adzuna = AdzunaClient::new(credentials.clone(), settings);
            if let Some(client) = redis {
                adzuna = adzuna
                    .with_cache(Arc::new(RedisSearchCache::new(
                        client.clone(),
                        Duration::from_secs(settings.cache_ttl_hours * 3600),
                    )))
                    .with_limiter(Arc::new(RedisWindowLimiter::new(
                        client,
                        settings.rate_limit_per_minute,
                        Duration::from_secs(60),
                        "careerflow:adzuna:calls",
                    )));
                info!("Adzuna cache and rate limit shared through Redis");
            }
            aggregator = aggregator.with_local(Arc::new(adzuna));
            info!("Job sources: adzuna, arbeitnow, remoteok");
        }
        None => {
            warn!("ADZUNA_APP_ID/ADZUNA_APP_KEY not set; local job search disabled");
            info!("Job sources: arbeitnow, remoteok");
        }
    }

    aggregator
}
