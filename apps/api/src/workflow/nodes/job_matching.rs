use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::JobSearchSettings;
use crate::jobs::aggregator::{AggregateRequest, JobAggregator};
use crate::jobs::models::JobMatchResult;
use crate::jobs::ranking::JobRanker;
use crate::models::profile::CandidateProfile;
use crate::store::CareerStore;
use crate::workflow::nodes::{NodeError, NodeKind, WorkflowNode};
use crate::workflow::prompts::{NEED_CV, NO_JOBS_FOUND};
use crate::workflow::state::{StateUpdate, WorkflowState};

/// How many matches the assistant message lists.
const MATCHES_IN_MESSAGE: usize = 5;
const QUERY_SKILLS: usize = 3;

pub struct JobMatchingNode {
    aggregator: Arc<JobAggregator>,
    ranker: JobRanker,
    store: Arc<dyn CareerStore>,
    settings: JobSearchSettings,
}

impl JobMatchingNode {
    pub fn new(
        aggregator: Arc<JobAggregator>,
        ranker: JobRanker,
        store: Arc<dyn CareerStore>,
        settings: JobSearchSettings,
    ) -> Self {
        Self {
            aggregator,
            ranker,
            store,
            settings,
        }
    }

    /// Persists every match; failures are logged and skipped.
    async fn save_matches(&self, user_id: &str, cv_id: Option<&str>, matches: &[JobMatchResult]) {
        let mut failed = 0usize;
        for job_match in matches {
            if let Err(e) = self.store.upsert_job_match(user_id, cv_id, job_match).await {
                failed += 1;
                warn!("Failed to save job match {}: {e}", job_match.job.id);
            }
        }
        if failed > 0 {
            warn!("{failed} of {} job matches were not saved", matches.len());
        }
    }
}

/// Target job title, else the latest role in the CV, else the top skills.
pub fn search_query(state: &WorkflowState, profile: &CandidateProfile) -> Option<String> {
    state
        .target_job
        .as_ref()
        .and_then(|t| t.title())
        .or_else(|| profile.latest_title())
        .map(str::to_string)
        .or_else(|| {
            (!profile.skills.is_empty())
                .then(|| profile.skills[..profile.skills.len().min(QUERY_SKILLS)].join(" "))
        })
}

/// Target job location, else the candidate's own location.
pub fn search_location(state: &WorkflowState, profile: &CandidateProfile) -> Option<String> {
    state
        .target_job
        .as_ref()
        .and_then(|t| t.location.as_deref())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .or_else(|| profile.location.clone())
}

#[async_trait]
impl WorkflowNode for JobMatchingNode {
    fn kind(&self) -> NodeKind {
        NodeKind::JobMatching
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, NodeError> {
        let profile = CandidateProfile::from_cv(state.cv_data.as_ref().unwrap_or(&Value::Null));
        let Some(query) = search_query(state, &profile) else {
            return Ok(StateUpdate::wait_for_user(NEED_CV));
        };
        let location = search_location(state, &profile);

        let mut request = AggregateRequest::new(query, location);
        request.max_results = self.settings.max_results;
        request.allow_mock_fallback = self.settings.enable_mock_jobs;
        request.strategy = self.settings.strategy;

        let aggregated = self.aggregator.aggregate(&request).await;
        if !aggregated.errors.is_empty() {
            warn!(
                "Job search for '{}' had {} source errors: {}",
                request.query,
                aggregated.errors.len(),
                aggregated.errors.join("; ")
            );
        }
        if aggregated.jobs.is_empty() {
            return Ok(StateUpdate {
                job_matches: Some(Vec::new()),
                ..StateUpdate::end(NO_JOBS_FOUND)
            });
        }

        let matches = self.ranker.rank(&profile, &aggregated.jobs).await?;
        if matches.is_empty() {
            return Ok(StateUpdate {
                job_matches: Some(Vec::new()),
                ..StateUpdate::end(NO_JOBS_FOUND)
            });
        }

        if let Some(user_id) = state.user_id() {
            self.save_matches(user_id, state.cv_id.as_deref(), &matches).await;
        }

        info!(
            "Job matching for '{}' produced {} matches",
            request.query,
            matches.len()
        );
        let message = render_matches(&matches);
        Ok(StateUpdate {
            job_matches: Some(matches),
            ..StateUpdate::end(message)
        })
    }
}

fn render_matches(matches: &[JobMatchResult]) -> String {
    let mut lines = vec![format!(
        "I found {} jobs that match your profile. Top matches:",
        matches.len()
    )];
    for (i, m) in matches.iter().take(MATCHES_IN_MESSAGE).enumerate() {
        let remote = if m.job.remote { ", remote" } else { "" };
        lines.push(format!(
            "{}. {} at {} ({}{remote}) - {:.0}% match\n   {}",
            i + 1,
            m.job.title,
            m.job.company,
            m.job.location,
            m.match_score,
            m.match_reason
        ));
    }
    lines.join("\n")
}
