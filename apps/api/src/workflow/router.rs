//! Orchestrator: classifies the user's turn and picks the next edge of the graph.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::llm_client::prompts::json_system;
use crate::llm_client::LanguageModel;
use crate::schema;
use crate::workflow::nodes::application_tracking::requested_status;
use crate::workflow::nodes::{NodeError, NodeKind, WorkflowNode};
use crate::workflow::prompts::{
    CAPABILITIES, GREETING, INTENT_PROMPT_TEMPLATE, NEED_COVER_LETTER, NEED_CV, NEED_TARGET_JOB,
    NEED_USER, ORCHESTRATOR_ROLE,
};
use crate::workflow::state::{Intent, IntentClassification, NextAction, StateUpdate, WorkflowState};

/// Classifies the latest user message and picks the next action.
pub struct Orchestrator {
    llm: Arc<dyn LanguageModel>,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl WorkflowNode for Orchestrator {
    fn kind(&self) -> NodeKind {
        NodeKind::Orchestrator
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, NodeError> {
        let Some(message) = state.last_user_message() else {
            return Ok(StateUpdate::wait_for_user(GREETING));
        };

        let prompt = build_intent_prompt(state, message);
        let raw = self.llm.complete(&prompt, &json_system(ORCHESTRATOR_ROLE)).await?;
        let classification: IntentClassification = schema::parse_model_output(&raw)?;

        let update = decide(state, &classification);
        info!(
            "Routing {:?} (confidence {:.2}) -> {}",
            classification.intent,
            classification.confidence,
            update
                .next_action
                .map(|a| a.as_str())
                .unwrap_or("none")
        );
        Ok(StateUpdate {
            intent: Some(classification),
            ..update
        })
    }
}

fn build_intent_prompt(state: &WorkflowState, message: &str) -> String {
    let context = json!({
        "cv_selected": state.has_cv(),
        "signed_in": state.user_id().is_some(),
        "target_job": state.target_job,
        "application_id": state.application_id,
        "cover_letter_provided": has_cover_letter(state),
        "job_matches_shown": state.job_matches.len(),
    });
    INTENT_PROMPT_TEMPLATE
        .replace(
            "{context_json}",
            &serde_json::to_string_pretty(&context).unwrap_or_default(),
        )
        .replace("{message}", message)
}

fn has_cover_letter(state: &WorkflowState) -> bool {
    state
        .cover_letter
        .as_deref()
        .is_some_and(|l| !l.trim().is_empty())
}

/// Maps a classification to the next step, checking that the chosen
/// specialist has the data it needs. Missing data asks the user instead.
pub fn decide(state: &WorkflowState, classification: &IntentClassification) -> StateUpdate {
    let has_target_title = state.target_job.as_ref().and_then(|t| t.title()).is_some();

    match classification.intent {
        Intent::AnalyzeCv if state.has_cv() => StateUpdate::goto(NextAction::AnalyzeCv),
        Intent::AnalyzeCv => StateUpdate::wait_for_user(NEED_CV),

        Intent::FindJobs if state.has_cv() || has_target_title => {
            StateUpdate::goto(NextAction::FindJobs)
        }
        Intent::FindJobs => StateUpdate::wait_for_user(NEED_CV),

        Intent::TrackApplication => {
            let updates_existing = state.application_id.is_some()
                && requested_status(Some(classification)).is_some();
            if state.user_id().is_none() {
                StateUpdate::wait_for_user(NEED_USER)
            } else if updates_existing || has_target_title {
                StateUpdate::goto(NextAction::TrackApplication)
            } else {
                StateUpdate::wait_for_user(NEED_TARGET_JOB)
            }
        }

        Intent::EnhanceLetter if has_cover_letter(state) => {
            StateUpdate::goto(NextAction::EnhanceLetter)
        }
        Intent::EnhanceLetter => StateUpdate::wait_for_user(NEED_COVER_LETTER),

        Intent::General => {
            let reply = classification
                .reply
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(CAPABILITIES);
            StateUpdate::goto(NextAction::RespondGeneral).with_message(reply)
        }
    }
}

/// Where the graph goes after the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Node(NodeKind),
    End,
}

/// Pure edge selection. Terminal or missing actions always end the run.
pub fn route(action: Option<NextAction>) -> Route {
    match action {
        Some(NextAction::AnalyzeCv) => Route::Node(NodeKind::CvEvaluation),
        Some(NextAction::FindJobs) => Route::Node(NodeKind::JobMatching),
        Some(NextAction::TrackApplication) => Route::Node(NodeKind::ApplicationTracking),
        Some(NextAction::EnhanceLetter) => Route::Node(NodeKind::LetterEnhancement),
        Some(
            NextAction::RespondGeneral
            | NextAction::WaitForUser
            | NextAction::Error
            | NextAction::End,
        )
        | None => Route::End,
    }
}
