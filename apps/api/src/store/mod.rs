//! Relational store for workflow side effects.
//!
//! Nodes only ever see the `CareerStore` trait. Each write is scoped to the
//! caller-supplied `user_id` (and `cv_id` where relevant).

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use crate::jobs::models::JobMatchResult;
use crate::models::career::{ApplicationRecord, ApplicationStatus, CvEvaluation, NewApplication};

pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgCareerStore;

/// How long an upserted job match stays valid.
pub const JOB_MATCH_TTL_DAYS: i64 = 30;

pub fn job_match_ttl() -> Duration {
    Duration::days(JOB_MATCH_TTL_DAYS)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait CareerStore: Send + Sync {
    /// Inserts or refreshes one match, keyed by `(user_id, source_job_id)`.
    async fn upsert_job_match(
        &self,
        user_id: &str,
        cv_id: Option<&str>,
        job_match: &JobMatchResult,
    ) -> Result<(), StoreError>;

    async fn create_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationRecord, StoreError>;

    /// Fails with `NotFound` when the application does not belong to `user_id`.
    async fn update_application(
        &self,
        id: &str,
        user_id: &str,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<ApplicationRecord, StoreError>;

    async fn save_cv_evaluation(
        &self,
        user_id: &str,
        cv_id: &str,
        evaluation: &CvEvaluation,
    ) -> Result<(), StoreError>;

    async fn save_letter_revision(
        &self,
        user_id: &str,
        cv_id: Option<&str>,
        original: &str,
        enhanced: &str,
        changes: &[String],
    ) -> Result<(), StoreError>;
}
