//! Adzuna client — the authenticated, country-scoped source.
//!
//! Every search goes cache → rate limiter → network, in that order. A cache
//! hit spends no quota, and a rejected call never reaches the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::{AdzunaCredentials, JobSearchSettings};
use crate::jobs::country::detect_country;
use crate::jobs::models::{JobSourceKind, NormalizedJob};
use crate::jobs::normalizer::normalize_adzuna;
use crate::jobs::sources::limiter::{CallLimiter, SlidingWindowLimiter};
use crate::jobs::sources::search_cache::{cache_key, SearchCache, TtlCache};
use crate::jobs::sources::{build_http_client, string_or_number, JobSource, SourceError};
use crate::schema;

const ADZUNA_API_URL: &str = "https://api.adzuna.com/v1/api/jobs";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdzunaJob {
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub redirect_url: String,
    #[serde(default)]
    pub company: Option<AdzunaCompany>,
    #[serde(default)]
    pub location: Option<AdzunaLocation>,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub contract_time: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdzunaCompany {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdzunaLocation {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub area: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdzunaSearchResponse {
    #[validate(nested)]
    pub results: Vec<AdzunaJob>,
}

pub struct AdzunaClient {
    http: reqwest::Client,
    base_url: String,
    credentials: AdzunaCredentials,
    results_per_page: u32,
    cache: Arc<dyn SearchCache>,
    limiter: Arc<dyn CallLimiter>,
}

impl AdzunaClient {
    /// Client with an in-process cache and limiter sized from `settings`.
    pub fn new(credentials: AdzunaCredentials, settings: &JobSearchSettings) -> Self {
        Self {
            http: build_http_client(Duration::from_secs(settings.source_timeout_secs)),
            base_url: ADZUNA_API_URL.to_string(),
            credentials,
            results_per_page: settings.results_per_page,
            cache: Arc::new(TtlCache::new(Duration::from_secs(
                settings.cache_ttl_hours * 3600,
            ))),
            limiter: Arc::new(SlidingWindowLimiter::per_minute(
                settings.rate_limit_per_minute,
            )),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn SearchCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<dyn CallLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Raw records for one page, served from cache when fresh.
    pub async fn search_raw(
        &self,
        query: &str,
        location: Option<&str>,
        page: u32,
    ) -> Result<(Vec<AdzunaJob>, &'static str), SourceError> {
        let origin = JobSourceKind::Adzuna;
        let country = detect_country(location);
        let key = cache_key(query, country, location, page);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Adzuna cache hit for '{key}' ({} results)", cached.len());
            return Ok((cached, country));
        }
        debug!("Adzuna cache miss for '{key}'");

        if !self.limiter.try_acquire().await {
            warn!("Adzuna rate limit exceeded, rejecting search for '{query}'");
            return Err(SourceError::RateLimited { origin });
        }

        let url = format!("{}/{country}/search/{}", self.base_url, page.max(1));
        let results_per_page = self.results_per_page.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("app_id", self.credentials.app_id.as_str()),
            ("app_key", self.credentials.app_key.as_str()),
            ("what", query),
            ("results_per_page", results_per_page.as_str()),
            ("content-type", "application/json"),
        ];
        // the country endpoint already scopes the search; `where` narrows it further
        if let Some(place) = location.map(str::trim).filter(|l| !l.is_empty()) {
            params.push(("where", place));
        }

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::from_request(origin, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                origin,
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SourceError::from_request(origin, e))?;
        let parsed: AdzunaSearchResponse =
            schema::validate(&body).map_err(|error| SourceError::Schema { origin, error })?;

        info!(
            "Adzuna returned {} results for '{query}' in '{country}'",
            parsed.results.len()
        );
        self.cache.put(&key, parsed.results.clone()).await;
        Ok((parsed.results, country))
    }
}

#[async_trait]
impl JobSource for AdzunaClient {
    fn kind(&self) -> JobSourceKind {
        JobSourceKind::Adzuna
    }

    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
        page: u32,
    ) -> Result<Vec<NormalizedJob>, SourceError> {
        let (raw, country) = self.search_raw(query, location, page).await?;
        Ok(raw.iter().map(|job| normalize_adzuna(job, country)).collect())
    }
}
