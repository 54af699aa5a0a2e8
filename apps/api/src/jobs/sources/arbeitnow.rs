//! Arbeitnow client — European job board, no credentials.
//!
//! The board has no query parameter, so results are filtered locally against
//! title, tags and description.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::config::JobSearchSettings;
use crate::jobs::models::{JobSourceKind, NormalizedJob};
use crate::jobs::normalizer::normalize_arbeitnow;
use crate::jobs::sources::{build_http_client, matches_query, JobSource, SourceError};
use crate::schema;

const ARBEITNOW_API_URL: &str = "https://www.arbeitnow.com/api/job-board-api";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ArbeitnowJob {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub slug: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub remote: bool,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub job_types: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ArbeitnowResponse {
    #[validate(nested)]
    pub data: Vec<ArbeitnowJob>,
}

pub struct ArbeitnowClient {
    http: reqwest::Client,
    base_url: String,
}

impl ArbeitnowClient {
    pub fn new(settings: &JobSearchSettings) -> Self {
        Self {
            http: build_http_client(Duration::from_secs(settings.source_timeout_secs)),
            base_url: ARBEITNOW_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl JobSource for ArbeitnowClient {
    fn kind(&self) -> JobSourceKind {
        JobSourceKind::Arbeitnow
    }

    async fn search(
        &self,
        query: &str,
        _location: Option<&str>,
        page: u32,
    ) -> Result<Vec<NormalizedJob>, SourceError> {
        let origin = self.kind();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("page", page.max(1))])
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
        let parsed: ArbeitnowResponse =
            schema::validate(&body).map_err(|error| SourceError::Schema { origin, error })?;

        let total = parsed.data.len();
        let jobs: Vec<NormalizedJob> = parsed
            .data
            .iter()
            .filter(|job| {
                let tags = job.tags.join(" ");
                matches_query(query, &[&job.title, &tags, &job.description])
            })
            .map(normalize_arbeitnow)
            .collect();

        info!("Arbeitnow: {} of {total} listings match '{query}'", jobs.len());
        Ok(jobs)
    }
}
