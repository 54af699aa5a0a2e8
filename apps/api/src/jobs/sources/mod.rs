//! External job-source clients.
//!
//! Each client talks to exactly one job board, validates the response body
//! through `schema`, and hands normalized jobs back. Failures are scoped to
//! the source that produced them so the aggregator can keep going.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::jobs::models::{JobSourceKind, NormalizedJob};
use crate::schema::SchemaError;

pub mod adzuna;
pub mod arbeitnow;
pub mod limiter;
pub mod remoteok;
pub mod search_cache;

const USER_AGENT: &str = concat!("careerflow-api/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("{origin}: search timed out")]
    Timeout { origin: JobSourceKind },

    #[error("{origin}: rate limit exceeded")]
    RateLimited { origin: JobSourceKind },

    #[error("{origin}: upstream returned status {status}")]
    Status { origin: JobSourceKind, status: u16 },

    #[error("{origin}: request failed: {message}")]
    Http {
        origin: JobSourceKind,
        message: String,
    },

    #[error("{origin}: invalid response: {error}")]
    Schema {
        origin: JobSourceKind,
        error: SchemaError,
    },
}

impl SourceError {
    /// Maps a transport error, keeping timeouts distinct from other failures.
    pub fn from_request(origin: JobSourceKind, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SourceError::Timeout { origin }
        } else {
            SourceError::Http {
                origin,
                message: error.to_string(),
            }
        }
    }
}

/// One job board. Implementations must be cheap to share across requests.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn kind(&self) -> JobSourceKind;

    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
        page: u32,
    ) -> Result<Vec<NormalizedJob>, SourceError>;
}

/// Builds the HTTP client every source uses: fixed timeout and user agent.
pub fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to build HTTP client")
}

/// Case-insensitive substring filter for boards that have no query parameter.
/// An empty query keeps everything.
pub fn matches_query(query: &str, fields: &[&str]) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

/// Accepts ids that arrive either as JSON strings or numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(f) => f.to_string(),
    })
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Source that replays a fixed outcome and counts calls.
    pub struct StaticSource {
        kind: JobSourceKind,
        outcome: Result<Vec<NormalizedJob>, SourceError>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        pub fn returning(kind: JobSourceKind, jobs: Vec<NormalizedJob>) -> Self {
            Self {
                kind,
                outcome: Ok(jobs),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(kind: JobSourceKind, error: SourceError) -> Self {
            Self {
                kind,
                outcome: Err(error),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobSource for StaticSource {
        fn kind(&self) -> JobSourceKind {
            self.kind
        }

        async fn search(
            &self,
            _query: &str,
            _location: Option<&str>,
            _page: u32,
        ) -> Result<Vec<NormalizedJob>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }
}
