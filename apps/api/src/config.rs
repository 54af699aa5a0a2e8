use anyhow::{Context, Result};

use crate::jobs::aggregator::SearchStrategy;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    /// Optional. When set, the Adzuna cache and rate-limit window are shared through Redis.
    pub redis_url: Option<String>,
    pub adzuna: Option<AdzunaCredentials>,
    pub jobs: JobSearchSettings,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct AdzunaCredentials {
    pub app_id: String,
    pub app_key: String,
}

/// Knobs for the job-search pipeline.
#[derive(Debug, Clone)]
pub struct JobSearchSettings {
    pub source_timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    pub cache_ttl_hours: u64,
    pub results_per_page: u32,
    pub max_results: usize,
    pub enable_mock_jobs: bool,
    pub strategy: SearchStrategy,
}

impl Default for JobSearchSettings {
    fn default() -> Self {
        Self {
            source_timeout_secs: 10,
            rate_limit_per_minute: 25,
            cache_ttl_hours: 24,
            results_per_page: 20,
            max_results: 30,
            enable_mock_jobs: true,
            strategy: SearchStrategy::Localized,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let adzuna = match (optional_env("ADZUNA_APP_ID"), optional_env("ADZUNA_APP_KEY")) {
            (Some(app_id), Some(app_key)) => Some(AdzunaCredentials { app_id, app_key }),
            _ => None,
        };

        let defaults = JobSearchSettings::default();
        let jobs = JobSearchSettings {
            source_timeout_secs: parse_env("JOB_SOURCE_TIMEOUT_SECS", defaults.source_timeout_secs)?,
            rate_limit_per_minute: parse_env(
                "ADZUNA_RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            )?,
            cache_ttl_hours: parse_env("SEARCH_CACHE_TTL_HOURS", defaults.cache_ttl_hours)?,
            results_per_page: parse_env("ADZUNA_RESULTS_PER_PAGE", defaults.results_per_page)?,
            max_results: parse_env("MAX_JOB_RESULTS", defaults.max_results)?,
            enable_mock_jobs: parse_env("ENABLE_MOCK_JOBS", defaults.enable_mock_jobs)?,
            strategy: match optional_env("JOB_SEARCH_STRATEGY") {
                Some(raw) => raw
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!("JOB_SEARCH_STRATEGY: {e}"))?,
                None => defaults.strategy,
            },
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            redis_url: optional_env("REDIS_URL"),
            adzuna,
            jobs,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}
