use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::career::{ApplicationStatus, NewApplication};
use crate::store::CareerStore;
use crate::workflow::nodes::{NodeError, NodeKind, WorkflowNode};
use crate::workflow::prompts::{NEED_TARGET_JOB, NEED_USER};
use crate::workflow::state::{IntentClassification, StateUpdate, WorkflowState};

/// Records new applications and status changes. The store write is this
/// node's result, so a failed write is an error rather than a warning.
pub struct ApplicationTrackingNode {
    store: Arc<dyn CareerStore>,
}

impl ApplicationTrackingNode {
    pub fn new(store: Arc<dyn CareerStore>) -> Self {
        Self { store }
    }
}

/// The status the user asked for, if the classifier extracted a valid one.
pub fn requested_status(intent: Option<&IntentClassification>) -> Option<ApplicationStatus> {
    let raw = intent?.application_status.as_deref()?;
    match raw.parse() {
        Ok(status) => Some(status),
        Err(e) => {
            warn!("Ignoring requested application status: {e}");
            None
        }
    }
}

fn requested_notes(state: &WorkflowState) -> Option<&str> {
    state
        .intent
        .as_ref()
        .and_then(|i| i.notes.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

#[async_trait]
impl WorkflowNode for ApplicationTrackingNode {
    fn kind(&self) -> NodeKind {
        NodeKind::ApplicationTracking
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, NodeError> {
        let Some(user_id) = state.user_id() else {
            return Ok(StateUpdate::wait_for_user(NEED_USER));
        };
        let status = requested_status(state.intent.as_ref());
        let notes = requested_notes(state);

        if let (Some(application_id), Some(status)) = (state.application_id.as_deref(), status) {
            let record = self
                .store
                .update_application(application_id, user_id, status, notes)
                .await?;
            info!("Application {} moved to {status}", record.id);
            let message = format!(
                "Updated your application for {} at {} to \"{status}\".",
                record.job_title, record.company
            );
            return Ok(StateUpdate {
                application_id: Some(record.id),
                ..StateUpdate::end(message)
            });
        }

        let Some(target) = state.target_job.as_ref().filter(|t| t.title().is_some()) else {
            return Ok(StateUpdate::wait_for_user(NEED_TARGET_JOB));
        };
        let job_title = target.title().unwrap_or_default().to_string();
        let company = target
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Unknown company")
            .to_string();

        let record = self
            .store
            .create_application(&NewApplication {
                user_id: user_id.to_string(),
                cv_id: state.cv_id.clone(),
                job_title,
                company,
                job_url: target.url.clone(),
                source_job_id: target.source_job_id.clone(),
                status: ApplicationStatus::Applied,
                notes: notes.map(str::to_string),
            })
            .await?;
        info!("Application {} created for user {user_id}", record.id);

        let message = format!(
            "Saved your application for {} at {}. I will keep track of it; tell me when anything changes.",
            record.job_title, record.company
        );
        Ok(StateUpdate {
            application_id: Some(record.id),
            ..StateUpdate::end(message)
        })
    }
}
