//! In-memory `CareerStore` used by node and engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::jobs::models::JobMatchResult;
use crate::models::career::{ApplicationRecord, ApplicationStatus, CvEvaluation, NewApplication};
use crate::store::{job_match_ttl, CareerStore, StoreError};

#[derive(Debug, Clone)]
pub struct StoredMatch {
    pub cv_id: Option<String>,
    pub job_match: JobMatchResult,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredLetter {
    pub user_id: String,
    pub original: String,
    pub enhanced: String,
}

#[derive(Default)]
pub struct InMemoryStore {
    pub matches: Mutex<HashMap<(String, String), StoredMatch>>,
    pub applications: Mutex<Vec<ApplicationRecord>>,
    pub evaluations: Mutex<Vec<(String, String, CvEvaluation)>>,
    pub letters: Mutex<Vec<StoredLetter>>,
    fail_writes: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails with a database error.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CareerStore for InMemoryStore {
    async fn upsert_job_match(
        &self,
        user_id: &str,
        cv_id: Option<&str>,
        job_match: &JobMatchResult,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.matches.lock().unwrap().insert(
            (user_id.to_string(), job_match.job.source_job_id.clone()),
            StoredMatch {
                cv_id: cv_id.map(str::to_string),
                job_match: job_match.clone(),
                expires_at: Utc::now() + job_match_ttl(),
            },
        );
        Ok(())
    }

    async fn create_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationRecord, StoreError> {
        self.check()?;
        let mut applications = self.applications.lock().unwrap();
        let now = Utc::now();
        let record = ApplicationRecord {
            id: format!("app-{}", applications.len() + 1),
            user_id: application.user_id.clone(),
            cv_id: application.cv_id.clone(),
            job_title: application.job_title.clone(),
            company: application.company.clone(),
            job_url: application.job_url.clone(),
            source_job_id: application.source_job_id.clone(),
            status: application.status.to_string(),
            notes: application.notes.clone(),
            applied_at: now,
            updated_at: now,
        };
        applications.push(record.clone());
        Ok(record)
    }

    async fn update_application(
        &self,
        id: &str,
        user_id: &str,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<ApplicationRecord, StoreError> {
        self.check()?;
        let mut applications = self.applications.lock().unwrap();
        let record = applications
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("application {id}")))?;
        record.status = status.to_string();
        if let Some(notes) = notes {
            record.notes = Some(notes.to_string());
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn save_cv_evaluation(
        &self,
        user_id: &str,
        cv_id: &str,
        evaluation: &CvEvaluation,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.evaluations.lock().unwrap().push((
            user_id.to_string(),
            cv_id.to_string(),
            evaluation.clone(),
        ));
        Ok(())
    }

    async fn save_letter_revision(
        &self,
        user_id: &str,
        _cv_id: Option<&str>,
        original: &str,
        enhanced: &str,
        _changes: &[String],
    ) -> Result<(), StoreError> {
        self.check()?;
        self.letters.lock().unwrap().push(StoredLetter {
            user_id: user_id.to_string(),
            original: original.to_string(),
            enhanced: enhanced.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::models::fixtures::job;
    use crate::jobs::models::JobSourceKind;
    use crate::jobs::normalizer::to_job_match_result;

    #[tokio::test]
    async fn test_upsert_is_keyed_by_user_and_source_job() {
        let store = InMemoryStore::new();
        let first = to_job_match_result(job(JobSourceKind::Adzuna, "1", "Dev", "Acme"), 50.0, "ok", vec![]);
        let second = to_job_match_result(job(JobSourceKind::Adzuna, "1", "Dev", "Acme"), 80.0, "better", vec![]);

        store.upsert_job_match("u1", None, &first).await.unwrap();
        store.upsert_job_match("u1", Some("cv1"), &second).await.unwrap();
        store.upsert_job_match("u2", None, &first).await.unwrap();

        let matches = store.matches.lock().unwrap();
        assert_eq!(matches.len(), 2);
        let stored = &matches[&("u1".to_string(), "1".to_string())];
        assert_eq!(stored.job_match.match_score, 80.0);
        assert!(stored.expires_at > Utc::now() + chrono::Duration::days(29));
    }

    #[tokio::test]
    async fn test_update_is_scoped_to_owner() {
        let store = InMemoryStore::new();
        let created = store
            .create_application(&NewApplication {
                user_id: "u1".to_string(),
                cv_id: None,
                job_title: "Dev".to_string(),
                company: "Acme".to_string(),
                job_url: None,
                source_job_id: None,
                status: ApplicationStatus::Applied,
                notes: None,
            })
            .await
            .unwrap();

        let err = store
            .update_application(&created.id, "intruder", ApplicationStatus::Rejected, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let updated = store
            .update_application(&created.id, "u1", ApplicationStatus::Interviewing, Some("call on Friday"))
            .await
            .unwrap();
        assert_eq!(updated.status, "interviewing");
        assert_eq!(updated.notes.as_deref(), Some("call on Friday"));
    }
}
