//! Job Ranking Step — one model call, validated, reconciled back to the jobs.
//!
//! The model is asked to echo each job's id, but it frequently rewrites them.
//! Reconciliation therefore tries, in order: the exact id, the id without its
//! source prefix, and the job's position in the prompt list. Jobs that match
//! none of these are left out of the result and logged.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::jobs::models::{JobMatchResult, NormalizedJob};
use crate::jobs::normalizer::{strip_source_prefix, to_job_match_result, truncate_description, DEFAULT_DESCRIPTION_CHARS};
use crate::jobs::prompts::{RANKING_PROMPT_TEMPLATE, RANKING_ROLE};
use crate::jobs::sources::string_or_number;
use crate::llm_client::prompts::{json_system, HONESTY_INSTRUCTION};
use crate::llm_client::{LanguageModel, LlmError};
use crate::models::profile::CandidateProfile;
use crate::schema::{self, SchemaError};

/// Upper bound on matches returned to the caller.
pub const MAX_RANKED_MATCHES: usize = 15;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("language model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("invalid ranking response: {0}")]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RankingEntry {
    #[serde(alias = "jobId", deserialize_with = "string_or_number")]
    #[validate(length(min = 1, message = "must not be empty"))]
    pub job_id: String,
    #[validate(range(min = 0.0, max = 100.0, message = "must be between 0 and 100"))]
    pub score: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RankingResponse {
    #[validate(nested)]
    pub rankings: Vec<RankingEntry>,
}

pub struct JobRanker {
    llm: Arc<dyn LanguageModel>,
}

impl JobRanker {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn rank(
        &self,
        profile: &CandidateProfile,
        jobs: &[NormalizedJob],
    ) -> Result<Vec<JobMatchResult>, RankingError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_ranking_prompt(profile, jobs);
        let system = json_system(RANKING_ROLE);
        let raw = self.llm.complete(&prompt, &system).await?;
        let response: RankingResponse = schema::parse_model_output(&raw)?;

        let ranked = reconcile(jobs, &response.rankings);
        info!(
            "Ranked {} of {} jobs ({} ranking entries)",
            ranked.len(),
            jobs.len(),
            response.rankings.len()
        );
        Ok(ranked)
    }
}

pub fn build_ranking_prompt(profile: &CandidateProfile, jobs: &[NormalizedJob]) -> String {
    let jobs_json: Vec<_> = jobs
        .iter()
        .enumerate()
        .map(|(index, job)| {
            json!({
                "index": index,
                "id": job.id,
                "title": job.title,
                "company": job.company,
                "location": job.location,
                "remote": job.remote,
                "salary": job.salary,
                "description": truncate_description(&job.description, DEFAULT_DESCRIPTION_CHARS),
            })
        })
        .collect();

    RANKING_PROMPT_TEMPLATE
        .replace("{honesty_instruction}", HONESTY_INSTRUCTION)
        .replace(
            "{profile_json}",
            &serde_json::to_string_pretty(&profile.summary()).unwrap_or_default(),
        )
        .replace(
            "{jobs_json}",
            &serde_json::to_string_pretty(&jobs_json).unwrap_or_default(),
        )
}

/// Pairs every job with its ranking entry, sorted by score, top `MAX_RANKED_MATCHES`.
///
/// Each entry is consumed at most once. Id-based matches are settled for
/// every job before any positional match is tried, so a stripped id such as
/// `1` is never mistaken for a list position.
pub fn reconcile(jobs: &[NormalizedJob], rankings: &[RankingEntry]) -> Vec<JobMatchResult> {
    let mut used = vec![false; rankings.len()];
    let mut assigned: Vec<Option<usize>> = vec![None; jobs.len()];

    let take = |id: &str, used: &mut [bool]| -> Option<usize> {
        let found = rankings
            .iter()
            .enumerate()
            .position(|(i, entry)| !used[i] && entry.job_id.trim() == id)?;
        used[found] = true;
        Some(found)
    };

    for (slot, job) in assigned.iter_mut().zip(jobs) {
        *slot = take(&job.id, &mut used).or_else(|| take(strip_source_prefix(&job.id), &mut used));
    }
    for (index, slot) in assigned.iter_mut().enumerate() {
        if slot.is_none() {
            *slot = take(&index.to_string(), &mut used);
        }
    }

    let mut matched = Vec::with_capacity(jobs.len());
    let mut dropped = 0usize;
    for (job, slot) in jobs.iter().zip(assigned) {
        match slot {
            Some(i) => {
                let entry = &rankings[i];
                matched.push(to_job_match_result(
                    job.clone(),
                    entry.score,
                    entry.reason.clone(),
                    entry.keywords.clone(),
                ));
            }
            None => {
                dropped += 1;
                warn!("No ranking entry for job '{}', dropping it", job.id);
            }
        }
    }

    for (entry, was_used) in rankings.iter().zip(&used) {
        if !was_used {
            warn!("Ranking entry '{}' matched no job", entry.job_id);
        }
    }
    if dropped > 0 {
        warn!("Dropped {dropped} unranked jobs");
    }

    matched.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matched.truncate(MAX_RANKED_MATCHES);
    matched
}
