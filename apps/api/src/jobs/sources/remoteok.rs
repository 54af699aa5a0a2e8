//! RemoteOK client — global remote-only board, no credentials.
//!
//! The API returns a bare array whose first element is a legal notice rather
//! than a listing. Listings are validated one by one; a malformed listing is
//! skipped instead of discarding the whole page.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use validator::Validate;

use crate::config::JobSearchSettings;
use crate::jobs::models::{JobSourceKind, NormalizedJob};
use crate::jobs::normalizer::normalize_remoteok;
use crate::jobs::sources::{build_http_client, matches_query, string_or_number, JobSource, SourceError};
use crate::schema::{self, SchemaError};

const REMOTEOK_API_URL: &str = "https://remoteok.com/api";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemoteOkJob {
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    #[serde(default)]
    pub company: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub position: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub apply_url: Option<String>,
}

pub struct RemoteOkClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteOkClient {
    pub fn new(settings: &JobSearchSettings) -> Self {
        Self {
            http: build_http_client(Duration::from_secs(settings.source_timeout_secs)),
            base_url: REMOTEOK_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn is_legal_notice(item: &Value) -> bool {
    item.get("legal").is_some() && item.get("position").is_none()
}

/// Validates every listing in the body, skipping the legal notice.
fn parse_listings(body: &Value) -> Result<Vec<RemoteOkJob>, SchemaError> {
    let items = body
        .as_array()
        .ok_or_else(|| SchemaError::Invalid("$: expected an array of listings".to_string()))?;

    let mut listings = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if is_legal_notice(item) {
            continue;
        }
        match schema::validate::<RemoteOkJob>(item) {
            Ok(job) => listings.push(job),
            Err(e) => warn!("RemoteOK listing {index} skipped: {e}"),
        }
    }
    Ok(listings)
}

#[async_trait]
impl JobSource for RemoteOkClient {
    fn kind(&self) -> JobSourceKind {
        JobSourceKind::RemoteOk
    }

    async fn search(
        &self,
        query: &str,
        _location: Option<&str>,
        _page: u32,
    ) -> Result<Vec<NormalizedJob>, SourceError> {
        let origin = self.kind();
        let response = self
            .http
            .get(&self.base_url)
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

        let body: Value = response
            .json()
            .await
            .map_err(|e| SourceError::from_request(origin, e))?;
        let listings = parse_listings(&body).map_err(|error| SourceError::Schema { origin, error })?;

        let total = listings.len();
        let jobs: Vec<NormalizedJob> = listings
            .iter()
            .filter(|job| {
                let tags = job.tags.join(" ");
                matches_query(query, &[&job.position, &tags, &job.description])
            })
            .map(normalize_remoteok)
            .collect();

        info!("RemoteOK: {} of {total} listings match '{query}'", jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn body() -> Value {
        json!([
            {"last_updated": 1714557600, "legal": "API Terms of Service: please link back"},
            {
                "id": 1029384,
                "company": "Globex",
                "position": "Senior Python Engineer",
                "description": "Async services",
                "location": "Worldwide",
                "tags": ["python", "aws"],
                "salary_min": 90000,
                "salary_max": 0,
                "date": "2024-05-01T09:00:00+00:00",
                "url": "https://remoteok.example/1029384"
            },
            {
                "id": "55",
                "company": "Hooli",
                "position": "Designer",
                "tags": ["figma"]
            },
            {"id": "66", "company": "Broken"}
        ])
    }

    #[test]
    fn test_legal_notice_and_invalid_listings_are_skipped() {
        let listings = parse_listings(&body()).unwrap();
        let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["1029384", "55"]);
    }

    #[test]
    fn test_non_array_body_is_rejected() {
        let err = parse_listings(&json!({"error": "nope"})).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_search_filters_and_marks_remote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .mount(&server)
            .await;

        let client = RemoteOkClient::new(&JobSearchSettings::default()).with_base_url(server.uri());
        let jobs = client.search("python", None, 1).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "remoteok-1029384");
        assert!(jobs[0].remote);
        assert_eq!(jobs[0].salary.as_deref(), Some("$90,000+"));
        assert_eq!(jobs[0].url, "https://remoteok.example/1029384");
    }

    #[tokio::test]
    async fn test_server_error_is_source_scoped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = RemoteOkClient::new(&JobSearchSettings::default()).with_base_url(server.uri());
        let err = client.search("python", None, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "remote_ok: upstream returned status 500");
    }
}
