//! Specialist nodes. Each one reads the state, does its work (including any
//! store writes) and returns a partial update. Internal failures never escape
//! a node: `run_node` turns them into the error terminal.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::jobs::ranking::RankingError;
use crate::llm_client::LlmError;
use crate::schema::SchemaError;
use crate::store::StoreError;
use crate::workflow::prompts::{GENERIC_FAILURE, RANKING_FAILURE};
use crate::workflow::state::{StateUpdate, WorkflowState};

pub mod application_tracking;
pub mod cv_evaluation;
pub mod job_matching;
pub mod letter_enhancement;

pub use application_tracking::ApplicationTrackingNode;
pub use cv_evaluation::CvEvaluationNode;
pub use job_matching::JobMatchingNode;
pub use letter_enhancement::LetterEnhancementNode;

/// Every vertex in the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Orchestrator,
    CvEvaluation,
    JobMatching,
    ApplicationTracking,
    LetterEnhancement,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Orchestrator => "orchestrator",
            NodeKind::CvEvaluation => "cv_evaluation",
            NodeKind::JobMatching => "job_matching",
            NodeKind::ApplicationTracking => "application_tracking",
            NodeKind::LetterEnhancement => "letter_enhancement",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid model output: {0}")]
    Schema(#[from] SchemaError),

    #[error("Ranking error: {0}")]
    Ranking(#[from] RankingError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl NodeError {
    /// Short, non-sensitive description kept in `WorkflowState::error`.
    pub fn summary(&self) -> &'static str {
        match self {
            NodeError::Llm(_) => "language model unavailable",
            NodeError::Schema(_) => "invalid model response",
            NodeError::Ranking(_) => "job ranking failed",
            NodeError::Store(StoreError::NotFound(_)) => "record not found",
            NodeError::Store(StoreError::Database(_)) => "database write failed",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            NodeError::Ranking(_) => RANKING_FAILURE,
            NodeError::Store(StoreError::NotFound(_)) => {
                "I could not find that application. Please check which one you meant."
            }
            _ => GENERIC_FAILURE,
        }
    }
}

#[async_trait]
pub trait WorkflowNode: Send + Sync {
    fn kind(&self) -> NodeKind;

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, NodeError>;
}

/// Runs a node and converts any failure into the error terminal.
/// The underlying error is logged here and never shown to the user.
pub async fn run_node(node: &dyn WorkflowNode, state: &WorkflowState) -> StateUpdate {
    match node.execute(state).await {
        Ok(update) => update,
        Err(e) => {
            error!("Node {} failed: {e}", node.kind());
            StateUpdate::failure(e.summary(), e.user_message())
        }
    }
}

/// Renders a bulleted list, one `- item` per line.
pub(crate) fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::NextAction;

    struct Exploding;

    #[async_trait]
    impl WorkflowNode for Exploding {
        fn kind(&self) -> NodeKind {
            NodeKind::CvEvaluation
        }

        async fn execute(&self, _state: &WorkflowState) -> Result<StateUpdate, NodeError> {
            Err(NodeError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)))
        }
    }

    #[tokio::test]
    async fn test_failures_become_error_terminal_without_internal_text() {
        let update = run_node(&Exploding, &WorkflowState::default()).await;
        assert_eq!(update.next_action, Some(NextAction::Error));
        assert_eq!(update.error.as_deref(), Some("database write failed"));
        assert_eq!(update.messages.len(), 1);
        assert!(!update.messages[0].content.contains("pool"));
    }

    #[test]
    fn test_node_names_are_stable() {
        assert_eq!(NodeKind::JobMatching.to_string(), "job_matching");
        assert_eq!(
            serde_json::to_value(NodeKind::LetterEnhancement).unwrap(),
            serde_json::json!("letter_enhancement")
        );
    }
}
