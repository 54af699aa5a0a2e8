//! Workflow state and the reducer that advances it.
//!
//! Nodes never mutate `WorkflowState`; they return a `StateUpdate` and the
//! engine folds it in with `merge`. `merge` is the only place the state
//! invariants are enforced:
//! - `messages` is append-only,
//! - `error` is set if and only if `next_action` is `Error`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::jobs::models::JobMatchResult;

/// Routing targets. The last four end the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    AnalyzeCv,
    FindJobs,
    TrackApplication,
    EnhanceLetter,
    RespondGeneral,
    WaitForUser,
    Error,
    End,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::AnalyzeCv => "analyze_cv",
            NextAction::FindJobs => "find_jobs",
            NextAction::TrackApplication => "track_application",
            NextAction::EnhanceLetter => "enhance_letter",
            NextAction::RespondGeneral => "respond_general",
            NextAction::WaitForUser => "wait_for_user",
            NextAction::Error => "error",
            NextAction::End => "end",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NextAction::RespondGeneral | NextAction::WaitForUser | NextAction::Error | NextAction::End
        )
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The job the user is currently focused on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetJob {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_job_id: Option<String>,
}

impl TargetJob {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AnalyzeCv,
    FindJobs,
    TrackApplication,
    EnhanceLetter,
    General,
}

/// Orchestrator's reading of the latest user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct IntentClassification {
    pub intent: Intent,
    #[serde(default = "default_confidence")]
    #[validate(range(min = 0.0, max = 1.0, message = "must be between 0 and 1"))]
    pub confidence: f64,
    /// Direct answer for general questions.
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub application_status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

/// The record threaded through one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub cv_id: Option<String>,
    /// Opaque CV document; see `models::profile::CandidateProfile`.
    #[serde(default)]
    pub cv_data: Option<Value>,
    #[serde(default)]
    pub target_job: Option<TargetJob>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub job_matches: Vec<JobMatchResult>,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub intent: Option<IntentClassification>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub next_action: Option<NextAction>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkflowState {
    /// The pending user turn: the trailing message, if the user sent it.
    /// An answered turn earlier in the history is never replayed.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.trim())
            .filter(|c| !c.is_empty())
    }

    pub fn has_cv(&self) -> bool {
        self.cv_data.as_ref().is_some_and(|cv| !cv.is_null())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Partial update returned by a node. `None` fields leave the state untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_matches: Option<Vec<JobMatchResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentClassification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    /// Appended, never replacing existing messages.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StateUpdate {
    pub fn goto(action: NextAction) -> Self {
        Self {
            next_action: Some(action),
            ..Self::default()
        }
    }

    /// Terminal success with a user-facing message.
    pub fn end(message: impl Into<String>) -> Self {
        Self::goto(NextAction::End).with_message(message)
    }

    pub fn wait_for_user(question: impl Into<String>) -> Self {
        Self::goto(NextAction::WaitForUser).with_message(question)
    }

    /// Error terminal: `internal` is kept in state for logs and callers,
    /// `user_message` is what the user reads.
    pub fn failure(internal: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            error: Some(internal.into()),
            ..Self::goto(NextAction::Error)
        }
        .with_message(user_message)
    }

    pub fn with_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::assistant(content));
        self
    }
}

/// Folds `update` into `state`, returning the new state.
pub fn merge(mut state: WorkflowState, update: StateUpdate) -> WorkflowState {
    if let Some(job_matches) = update.job_matches {
        state.job_matches = job_matches;
    }
    if let Some(application_id) = update.application_id {
        state.application_id = Some(application_id);
    }
    if let Some(intent) = update.intent {
        state.intent = Some(intent);
    }
    if let Some(cover_letter) = update.cover_letter {
        state.cover_letter = Some(cover_letter);
    }
    state.messages.extend(update.messages);

    if let Some(action) = update.next_action {
        state.next_action = Some(action);
    }
    if update.error.is_some() {
        state.error = update.error;
    }

    if state.next_action == Some(NextAction::Error) {
        state
            .error
            .get_or_insert_with(|| "unspecified workflow error".to_string());
    } else {
        state.error = None;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_message(text: &str) -> WorkflowState {
        WorkflowState {
            messages: vec![Message::user(text)],
            ..WorkflowState::default()
        }
    }

    #[test]
    fn test_merge_appends_messages_in_order() {
        let state = state_with_message("find me jobs");
        let state = merge(state, StateUpdate::goto(NextAction::FindJobs));
        let state = merge(state, StateUpdate::end("Here are your matches"));

        let contents: Vec<&str> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["find me jobs", "Here are your matches"]);
        assert_eq!(state.next_action, Some(NextAction::End));
    }

    #[test]
    fn test_error_only_present_on_error_action() {
        let state = merge(
            WorkflowState::default(),
            StateUpdate::failure("db down", "Sorry, something went wrong."),
        );
        assert_eq!(state.error.as_deref(), Some("db down"));
        assert_eq!(state.next_action, Some(NextAction::Error));

        // a stray error on a non-error action is discarded
        let stray = StateUpdate {
            error: Some("ignored".to_string()),
            ..StateUpdate::goto(NextAction::End)
        };
        let state = merge(WorkflowState::default(), stray);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_error_action_without_text_gets_placeholder() {
        let state = merge(WorkflowState::default(), StateUpdate::goto(NextAction::Error));
        assert!(state.error.is_some());
    }

    #[test]
    fn test_untouched_fields_survive_merge() {
        let state = WorkflowState {
            user_id: Some("u1".to_string()),
            application_id: Some("app-1".to_string()),
            ..WorkflowState::default()
        };
        let state = merge(state, StateUpdate::goto(NextAction::TrackApplication));
        assert_eq!(state.user_id.as_deref(), Some("u1"));
        assert_eq!(state.application_id.as_deref(), Some("app-1"));
    }

    #[test]
    fn test_terminal_actions() {
        assert!(NextAction::WaitForUser.is_terminal());
        assert!(NextAction::RespondGeneral.is_terminal());
        assert!(!NextAction::FindJobs.is_terminal());
        assert_eq!(
            serde_json::to_value(NextAction::TrackApplication).unwrap(),
            serde_json::json!("track_application")
        );
    }

    #[test]
    fn test_last_user_message_is_trailing_turn_only() {
        let mut state = state_with_message("evaluate my cv");
        assert_eq!(state.last_user_message(), Some("evaluate my cv"));
        state.messages.push(Message::assistant("On it"));
        assert_eq!(state.last_user_message(), None);
        assert_eq!(state_with_message("   ").last_user_message(), None);
    }
}
