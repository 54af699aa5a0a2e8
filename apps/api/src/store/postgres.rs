use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::jobs::models::JobMatchResult;
use crate::models::career::{ApplicationRecord, ApplicationStatus, CvEvaluation, NewApplication};
use crate::store::{job_match_ttl, CareerStore, StoreError};

/// `CareerStore` over PostgreSQL. Schema: `migrations/0001_career_workflow.sql`.
#[derive(Clone)]
pub struct PgCareerStore {
    pool: PgPool,
}

impl PgCareerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CareerStore for PgCareerStore {
    async fn upsert_job_match(
        &self,
        user_id: &str,
        cv_id: Option<&str>,
        job_match: &JobMatchResult,
    ) -> Result<(), StoreError> {
        let job = &job_match.job;
        let expires_at = Utc::now() + job_match_ttl();

        sqlx::query(
            r#"
            INSERT INTO job_matches
                (user_id, source_job_id, cv_id, job_id, source, title, company, location,
                 url, salary, remote, description, posted_date, search_category,
                 match_score, match_reason, keyword_matches, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (user_id, source_job_id) DO UPDATE SET
                cv_id = EXCLUDED.cv_id,
                job_id = EXCLUDED.job_id,
                source = EXCLUDED.source,
                title = EXCLUDED.title,
                company = EXCLUDED.company,
                location = EXCLUDED.location,
                url = EXCLUDED.url,
                salary = EXCLUDED.salary,
                remote = EXCLUDED.remote,
                description = EXCLUDED.description,
                posted_date = EXCLUDED.posted_date,
                search_category = EXCLUDED.search_category,
                match_score = EXCLUDED.match_score,
                match_reason = EXCLUDED.match_reason,
                keyword_matches = EXCLUDED.keyword_matches,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&job.source_job_id)
        .bind(cv_id)
        .bind(&job.id)
        .bind(job.source.as_str())
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.url)
        .bind(&job.salary)
        .bind(job.remote)
        .bind(&job.description)
        .bind(job.posted_date)
        .bind(job.search_category.map(|c| c.as_str()))
        .bind(job_match.match_score)
        .bind(&job_match.match_reason)
        .bind(&job_match.keyword_matches)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationRecord, StoreError> {
        Ok(sqlx::query_as::<_, ApplicationRecord>(
            r#"
            INSERT INTO applications
                (id, user_id, cv_id, job_title, company, job_url, source_job_id, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&application.user_id)
        .bind(&application.cv_id)
        .bind(&application.job_title)
        .bind(&application.company)
        .bind(&application.job_url)
        .bind(&application.source_job_id)
        .bind(application.status.as_str())
        .bind(&application.notes)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_application(
        &self,
        id: &str,
        user_id: &str,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<ApplicationRecord, StoreError> {
        sqlx::query_as::<_, ApplicationRecord>(
            r#"
            UPDATE applications
            SET status = $3, notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(status.as_str())
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("application {id}")))
    }

    async fn save_cv_evaluation(
        &self,
        user_id: &str,
        cv_id: &str,
        evaluation: &CvEvaluation,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cv_evaluations
                (id, user_id, cv_id, overall_score, strengths, improvements, summary)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(cv_id)
        .bind(evaluation.overall_score)
        .bind(Json(&evaluation.strengths))
        .bind(Json(&evaluation.improvements))
        .bind(&evaluation.summary)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_letter_revision(
        &self,
        user_id: &str,
        cv_id: Option<&str>,
        original: &str,
        enhanced: &str,
        changes: &[String],
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cover_letter_revisions
                (id, user_id, cv_id, original_text, enhanced_text, changes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(cv_id)
        .bind(original)
        .bind(enhanced)
        .bind(Json(changes))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
