use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Lifecycle of a tracked job application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Saved,
    Applied,
    Interviewing,
    Offered,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Saved => "saved",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "saved" => Ok(ApplicationStatus::Saved),
            "applied" => Ok(ApplicationStatus::Applied),
            "interviewing" | "interview" => Ok(ApplicationStatus::Interviewing),
            "offered" | "offer" => Ok(ApplicationStatus::Offered),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "withdrawn" => Ok(ApplicationStatus::Withdrawn),
            other => Err(format!("unknown application status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRecord {
    pub id: String,
    pub user_id: String,
    pub cv_id: Option<String>,
    pub job_title: String,
    pub company: String,
    pub job_url: Option<String>,
    pub source_job_id: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub user_id: String,
    pub cv_id: Option<String>,
    pub job_title: String,
    pub company: String,
    pub job_url: Option<String>,
    pub source_job_id: Option<String>,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
}

/// Model verdict on a CV. Validated before it is stored or shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CvEvaluation {
    #[validate(range(min = 0.0, max = 100.0, message = "must be between 0 and 100"))]
    pub overall_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LetterEnhancement {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub enhanced_letter: String,
    #[serde(default)]
    pub changes: Vec<String>,
}
