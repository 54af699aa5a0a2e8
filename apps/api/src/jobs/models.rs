use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of places a job can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSourceKind {
    Adzuna,
    Arbeitnow,
    RemoteOk,
    Mock,
}

impl JobSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSourceKind::Adzuna => "adzuna",
            JobSourceKind::Arbeitnow => "arbeitnow",
            JobSourceKind::RemoteOk => "remote_ok",
            JobSourceKind::Mock => "mock",
        }
    }

    /// Prefix used to build globally unique job ids (`<prefix>-<source id>`).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            JobSourceKind::Adzuna => "adzuna",
            JobSourceKind::Arbeitnow => "arbeitnow",
            JobSourceKind::RemoteOk => "remoteok",
            JobSourceKind::Mock => "mock",
        }
    }

    pub fn all() -> [JobSourceKind; 3] {
        [
            JobSourceKind::Adzuna,
            JobSourceKind::Arbeitnow,
            JobSourceKind::RemoteOk,
        ]
    }
}

impl fmt::Display for JobSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which search step produced a job. Absent category sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Local,
    Regional,
    Remote,
}

impl SearchCategory {
    /// Stored form, identical to the serde name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchCategory::Local => "local",
            SearchCategory::Regional => "regional",
            SearchCategory::Remote => "remote",
        }
    }

    pub fn priority(category: Option<SearchCategory>) -> u8 {
        match category {
            Some(SearchCategory::Local) => 0,
            Some(SearchCategory::Regional) => 1,
            Some(SearchCategory::Remote) => 2,
            None => 3,
        }
    }
}

/// Canonical job record produced by the normalizer from any source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedJob {
    /// `<source prefix>-<source_job_id>`; unique within one aggregation.
    pub id: String,
    pub source_job_id: String,
    pub source: JobSourceKind,
    pub title: String,
    pub company: String,
    pub description: String,
    pub url: String,
    pub location: String,
    pub salary: Option<String>,
    pub remote: bool,
    pub posted_date: Option<DateTime<Utc>>,
    pub search_category: Option<SearchCategory>,
}

impl NormalizedJob {
    /// Lower-cased `(title, company)` used for cross-source deduplication.
    pub fn dedup_key(&self) -> (String, String) {
        (
            self.title.trim().to_lowercase(),
            self.company.trim().to_lowercase(),
        )
    }
}

/// A normalized job enriched with the ranking step's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatchResult {
    #[serde(flatten)]
    pub job: NormalizedJob,
    /// 0 – 100
    pub match_score: f64,
    pub match_reason: String,
    pub keyword_matches: Vec<String>,
}

/// City / state / country split of a free-text location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationParts {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}
