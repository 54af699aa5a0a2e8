//! Job Aggregator — fans one logical search out to every available source.
//!
//! Steps run concurrently but their results are concatenated in a fixed
//! local → regional → remote order, so the output is deterministic for the
//! same source responses. A failing source is recorded in `errors` and never
//! aborts the aggregation.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::jobs::country::{detect_country, is_regional};
use crate::jobs::models::{JobSourceKind, NormalizedJob, SearchCategory};
use crate::jobs::sources::{JobSource, SourceError};

const FIRST_PAGE: u32 = 1;

/// Whether the regional board is queried only for regional countries or always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    #[default]
    Localized,
    Balanced,
}

impl FromStr for SearchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "localized" | "local" => Ok(SearchStrategy::Localized),
            "balanced" => Ok(SearchStrategy::Balanced),
            other => Err(format!(
                "unknown search strategy '{other}' (expected 'localized' or 'balanced')"
            )),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::Localized => f.write_str("localized"),
            SearchStrategy::Balanced => f.write_str("balanced"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub query: String,
    pub location: Option<String>,
    pub max_results: usize,
    /// Sources the caller allows; a source outside this list is never queried.
    pub sources: Vec<JobSourceKind>,
    pub allow_mock_fallback: bool,
    pub strategy: SearchStrategy,
}

impl AggregateRequest {
    pub fn new(query: impl Into<String>, location: Option<String>) -> Self {
        Self {
            query: query.into(),
            location,
            max_results: 30,
            sources: JobSourceKind::all().to_vec(),
            allow_mock_fallback: true,
            strategy: SearchStrategy::Localized,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub jobs: Vec<NormalizedJob>,
    pub sources_used: Vec<JobSourceKind>,
    /// Source-scoped, informational. Never fatal.
    pub errors: Vec<String>,
}

/// Holds one optional client per locality step.
#[derive(Clone, Default)]
pub struct JobAggregator {
    local: Option<Arc<dyn JobSource>>,
    regional: Option<Arc<dyn JobSource>>,
    remote: Option<Arc<dyn JobSource>>,
}

type StepOutcome = Option<(JobSourceKind, Result<Vec<NormalizedJob>, SourceError>)>;

impl JobAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, source: Arc<dyn JobSource>) -> Self {
        self.local = Some(source);
        self
    }

    pub fn with_regional(mut self, source: Arc<dyn JobSource>) -> Self {
        self.regional = Some(source);
        self
    }

    pub fn with_remote(mut self, source: Arc<dyn JobSource>) -> Self {
        self.remote = Some(source);
        self
    }

    pub async fn aggregate(&self, request: &AggregateRequest) -> AggregateResult {
        let query = request.query.trim();
        let location = request
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        let country = detect_country(location);
        let query_regional =
            is_regional(country) || request.strategy == SearchStrategy::Balanced;

        info!(
            "Aggregating jobs for '{query}' (country: {country}, strategy: {}, regional: {query_regional})",
            request.strategy
        );

        let (local, regional, remote) = tokio::join!(
            run_step(self.local.as_ref(), request, query, location, true),
            run_step(self.regional.as_ref(), request, query, location, query_regional),
            run_step(self.remote.as_ref(), request, query, None, true),
        );

        let mut result = AggregateResult::default();
        let mut collected = Vec::new();
        for (outcome, category) in [
            (local, SearchCategory::Local),
            (regional, SearchCategory::Regional),
            (remote, SearchCategory::Remote),
        ] {
            let Some((kind, outcome)) = outcome else {
                continue;
            };
            match outcome {
                Ok(mut jobs) => {
                    info!("{kind}: {} jobs ({category:?})", jobs.len());
                    for job in &mut jobs {
                        job.search_category = Some(category);
                    }
                    result.sources_used.push(kind);
                    collected.extend(jobs);
                }
                Err(e) => {
                    warn!("Job source step failed: {e}");
                    result.errors.push(e.to_string());
                }
            }
        }

        if collected.is_empty() && request.allow_mock_fallback {
            info!("No jobs from any source, falling back to mock jobs for '{query}'");
            collected = mock_jobs(query, location);
            result.sources_used.push(JobSourceKind::Mock);
        }

        let mut jobs = dedup_jobs(collected);
        jobs.sort_by_key(|job| SearchCategory::priority(job.search_category));
        jobs.truncate(request.max_results);
        result.jobs = jobs;
        result
    }
}

async fn run_step(
    source: Option<&Arc<dyn JobSource>>,
    request: &AggregateRequest,
    query: &str,
    location: Option<&str>,
    enabled: bool,
) -> StepOutcome {
    let source = source?;
    if !enabled || !request.sources.contains(&source.kind()) {
        return None;
    }
    Some((source.kind(), source.search(query, location, FIRST_PAGE).await))
}

/// Drops later jobs whose lower-cased `(title, company)` was already seen.
pub fn dedup_jobs(jobs: Vec<NormalizedJob>) -> Vec<NormalizedJob> {
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|job| seen.insert(job.dedup_key()))
        .collect()
}

/// Three placeholder listings derived from the query, used when every source came back empty.
pub fn mock_jobs(query: &str, location: Option<&str>) -> Vec<NormalizedJob> {
    let role = title_case(if query.is_empty() { "software engineer" } else { query });
    let location = location.unwrap_or("Remote").to_string();
    let variants = [
        (format!("Senior {role}"), "Northwind Labs", false),
        (role.clone(), "Contoso Digital", false),
        (format!("{role} (Remote)"), "Fabrikam Cloud", true),
    ];

    variants
        .into_iter()
        .enumerate()
        .map(|(i, (title, company, remote))| {
            let source_job_id = (i + 1).to_string();
            NormalizedJob {
                id: format!("{}-{source_job_id}", JobSourceKind::Mock.id_prefix()),
                description: format!(
                    "{company} is hiring a {title}. Sample listing shown because no job board returned results."
                ),
                url: format!("https://jobs.example.com/mock/{source_job_id}"),
                source_job_id,
                source: JobSourceKind::Mock,
                title,
                company: company.to_string(),
                location: if remote { "Remote".to_string() } else { location.clone() },
                salary: None,
                remote,
                posted_date: None,
                search_category: None,
            }
        })
        .collect()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::models::fixtures::job;
    use crate::jobs::sources::testing::StaticSource;

    fn batch(kind: JobSourceKind, prefix: &str, n: usize) -> Vec<NormalizedJob> {
        (0..n)
            .map(|i| job(kind, &format!("{prefix}{i}"), &format!("{prefix} role {i}"), "Acme"))
            .collect()
    }

    fn request(location: &str) -> AggregateRequest {
        AggregateRequest::new("python developer", Some(location.to_string()))
    }

    fn three_sources(
        local: StaticSource,
        regional: StaticSource,
        remote: StaticSource,
    ) -> JobAggregator {
        JobAggregator::new()
            .with_local(Arc::new(local))
            .with_regional(Arc::new(regional))
            .with_remote(Arc::new(remote))
    }

    fn happy_aggregator() -> JobAggregator {
        // remote first in the fixture data so ordering is actually exercised
        three_sources(
            StaticSource::returning(JobSourceKind::Adzuna, batch(JobSourceKind::Adzuna, "local", 5)),
            StaticSource::returning(JobSourceKind::Arbeitnow, batch(JobSourceKind::Arbeitnow, "eu", 5)),
            StaticSource::returning(JobSourceKind::RemoteOk, batch(JobSourceKind::RemoteOk, "remote", 5)),
        )
    }

    #[tokio::test]
    async fn test_happy_path_collects_all_three_sources() {
        let result = happy_aggregator().aggregate(&request("Breda, Netherlands")).await;

        assert_eq!(result.jobs.len(), 15);
        assert!(result.errors.is_empty());
        assert_eq!(
            result.sources_used,
            vec![JobSourceKind::Adzuna, JobSourceKind::Arbeitnow, JobSourceKind::RemoteOk]
        );
        assert!(result.jobs[..5]
            .iter()
            .all(|j| j.search_category == Some(SearchCategory::Local)));
    }

    #[tokio::test]
    async fn test_categories_are_ordered_local_regional_remote() {
        let result = happy_aggregator().aggregate(&request("Berlin")).await;
        let priorities: Vec<u8> = result
            .jobs
            .iter()
            .map(|j| SearchCategory::priority(j.search_category))
            .collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
    }

    #[tokio::test]
    async fn test_regional_source_skipped_outside_regional_countries() {
        let regional = Arc::new(StaticSource::returning(
            JobSourceKind::Arbeitnow,
            batch(JobSourceKind::Arbeitnow, "eu", 2),
        ));
        let aggregator = JobAggregator::new().with_regional(regional.clone());

        let result = aggregator.aggregate(&request("Austin, TX")).await;
        assert_eq!(regional.call_count(), 0);
        assert!(result.jobs.iter().all(|j| j.source == JobSourceKind::Mock));

        let mut balanced = request("Austin, TX");
        balanced.strategy = SearchStrategy::Balanced;
        let result = aggregator.aggregate(&balanced).await;
        assert_eq!(regional.call_count(), 1);
        assert_eq!(result.jobs.len(), 2);
    }

    #[tokio::test]
    async fn test_one_failing_source_is_isolated() {
        let aggregator = three_sources(
            StaticSource::returning(JobSourceKind::Adzuna, batch(JobSourceKind::Adzuna, "local", 3)),
            StaticSource::failing(
                JobSourceKind::Arbeitnow,
                SourceError::Timeout {
                    origin: JobSourceKind::Arbeitnow,
                },
            ),
            StaticSource::returning(JobSourceKind::RemoteOk, batch(JobSourceKind::RemoteOk, "remote", 3)),
        );

        let result = aggregator.aggregate(&request("Amsterdam")).await;
        assert_eq!(result.jobs.len(), 6);
        assert_eq!(result.errors, vec!["arbeitnow: search timed out".to_string()]);
        assert!(result.jobs.iter().any(|j| j.source == JobSourceKind::Adzuna));
        assert!(result.jobs.iter().any(|j| j.source == JobSourceKind::RemoteOk));
    }

    #[tokio::test]
    async fn test_fallback_when_every_source_is_empty_or_failing() {
        let aggregator = three_sources(
            StaticSource::returning(JobSourceKind::Adzuna, vec![]),
            StaticSource::failing(
                JobSourceKind::Arbeitnow,
                SourceError::Status {
                    origin: JobSourceKind::Arbeitnow,
                    status: 502,
                },
            ),
            StaticSource::returning(JobSourceKind::RemoteOk, vec![]),
        );

        let result = aggregator.aggregate(&request("Breda, Netherlands")).await;
        assert!(!result.jobs.is_empty());
        assert!(result.jobs.iter().all(|j| j.source == JobSourceKind::Mock));
        assert!(result.jobs[0].title.contains("Python Developer"));
        assert!(result.sources_used.contains(&JobSourceKind::Mock));
    }

    #[tokio::test]
    async fn test_no_fallback_when_disabled() {
        let aggregator = JobAggregator::new();
        let mut req = request("Breda");
        req.allow_mock_fallback = false;
        assert!(aggregator.aggregate(&req).await.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_across_sources_keep_first_occurrence() {
        let aggregator = three_sources(
            StaticSource::returning(
                JobSourceKind::Adzuna,
                vec![job(JobSourceKind::Adzuna, "1", "Python Developer", "Acme")],
            ),
            StaticSource::returning(
                JobSourceKind::Arbeitnow,
                vec![job(JobSourceKind::Arbeitnow, "x", "python developer ", "ACME")],
            ),
            StaticSource::returning(
                JobSourceKind::RemoteOk,
                vec![job(JobSourceKind::RemoteOk, "2", "Python Developer", "Globex")],
            ),
        );

        let result = aggregator.aggregate(&request("Berlin, Germany")).await;
        let ids: Vec<&str> = result.jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["adzuna-1", "remoteok-2"]);
    }

    #[tokio::test]
    async fn test_aggregation_is_idempotent_and_truncated() {
        let aggregator = happy_aggregator();
        let mut req = request("Breda, Netherlands");
        req.max_results = 7;

        let first = aggregator.aggregate(&req).await;
        let second = aggregator.aggregate(&req).await;
        assert_eq!(first.jobs.len(), 7);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_source_not_requested_is_not_queried() {
        let remote = Arc::new(StaticSource::returning(
            JobSourceKind::RemoteOk,
            batch(JobSourceKind::RemoteOk, "remote", 1),
        ));
        let aggregator = JobAggregator::new().with_remote(remote.clone());
        let mut req = request("Berlin");
        req.sources = vec![JobSourceKind::Adzuna];
        req.allow_mock_fallback = false;

        let result = aggregator.aggregate(&req).await;
        assert_eq!(remote.call_count(), 0);
        assert!(result.jobs.is_empty());
    }

    #[test]
    fn test_strategy_parses_case_insensitively() {
        assert_eq!("Balanced".parse::<SearchStrategy>(), Ok(SearchStrategy::Balanced));
        assert_eq!("localized".parse::<SearchStrategy>(), Ok(SearchStrategy::Localized));
        assert!("global".parse::<SearchStrategy>().is_err());
    }
}
