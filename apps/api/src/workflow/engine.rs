//! The workflow graph: orchestrator, then at most one specialist, then end.

use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use serde::Serialize;
use tracing::info;

use crate::config::JobSearchSettings;
use crate::jobs::aggregator::JobAggregator;
use crate::jobs::ranking::JobRanker;
use crate::llm_client::LanguageModel;
use crate::store::CareerStore;
use crate::workflow::nodes::{
    run_node, ApplicationTrackingNode, CvEvaluationNode, JobMatchingNode, LetterEnhancementNode,
    NodeKind, WorkflowNode,
};
use crate::workflow::router::{route, Orchestrator, Route};
use crate::workflow::state::{merge, NextAction, StateUpdate, WorkflowState};

/// One node's partial update, as emitted by `WorkflowEngine::stream`.
#[derive(Debug, Clone, Serialize)]
pub struct StreamChunk {
    pub node: NodeKind,
    pub update: StateUpdate,
}

pub struct WorkflowEngine {
    orchestrator: Orchestrator,
    cv_evaluation: CvEvaluationNode,
    job_matching: JobMatchingNode,
    application_tracking: ApplicationTrackingNode,
    letter_enhancement: LetterEnhancementNode,
}

impl WorkflowEngine {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        aggregator: Arc<JobAggregator>,
        store: Arc<dyn CareerStore>,
        settings: JobSearchSettings,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(llm.clone()),
            cv_evaluation: CvEvaluationNode::new(llm.clone(), store.clone()),
            job_matching: JobMatchingNode::new(
                aggregator,
                JobRanker::new(llm.clone()),
                store.clone(),
                settings,
            ),
            application_tracking: ApplicationTrackingNode::new(store.clone()),
            letter_enhancement: LetterEnhancementNode::new(llm, store),
        }
    }

    fn node(&self, kind: NodeKind) -> &dyn WorkflowNode {
        match kind {
            NodeKind::Orchestrator => &self.orchestrator,
            NodeKind::CvEvaluation => &self.cv_evaluation,
            NodeKind::JobMatching => &self.job_matching,
            NodeKind::ApplicationTracking => &self.application_tracking,
            NodeKind::LetterEnhancement => &self.letter_enhancement,
        }
    }

    /// Runs the graph to completion and returns the final state.
    pub async fn invoke(&self, initial: WorkflowState) -> WorkflowState {
        let mut state = initial;
        let mut current = Route::Node(NodeKind::Orchestrator);
        while let Route::Node(kind) = current {
            let update = run_node(self.node(kind), &state).await;
            state = merge(state, update);
            current = next_route(kind, state.next_action);
        }
        log_outcome(&state);
        state
    }

    /// Same traversal as `invoke`, yielding each node's update as it completes.
    pub fn stream(
        self: Arc<Self>,
        initial: WorkflowState,
    ) -> impl Stream<Item = StreamChunk> + Send + 'static {
        let engine = self;
        stream! {
            let mut state = initial;
            let mut current = Route::Node(NodeKind::Orchestrator);
            while let Route::Node(kind) = current {
                let update = run_node(engine.node(kind), &state).await;
                state = merge(state, update.clone());
                current = next_route(kind, state.next_action);
                yield StreamChunk { node: kind, update };
            }
            log_outcome(&state);
        }
    }
}

/// Only the orchestrator has conditional edges; specialists always end.
fn next_route(finished: NodeKind, action: Option<NextAction>) -> Route {
    match finished {
        NodeKind::Orchestrator => route(action),
        NodeKind::CvEvaluation
        | NodeKind::JobMatching
        | NodeKind::ApplicationTracking
        | NodeKind::LetterEnhancement => Route::End,
    }
}

fn log_outcome(state: &WorkflowState) {
    info!(
        "Workflow finished: next_action={} messages={}",
        state.next_action.map(|a| a.as_str()).unwrap_or("none"),
        state.messages.len()
    );
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::jobs::models::fixtures::job;
    use crate::jobs::models::JobSourceKind;
    use crate::jobs::sources::testing::StaticSource;
    use crate::llm_client::testing::ScriptedModel;
    use crate::models::profile::fixtures::cv;
    use crate::store::memory::InMemoryStore;
    use crate::workflow::state::{Message, Role};

    fn engine(model: ScriptedModel, store: Arc<InMemoryStore>) -> WorkflowEngine {
        let aggregator = JobAggregator::new().with_local(Arc::new(StaticSource::returning(
            JobSourceKind::Adzuna,
            vec![job(JobSourceKind::Adzuna, "1", "Python Developer", "Acme")],
        )));
        WorkflowEngine::new(
            Arc::new(model),
            Arc::new(aggregator),
            store,
            JobSearchSettings {
                enable_mock_jobs: false,
                ..JobSearchSettings::default()
            },
        )
    }

    fn state(message: &str) -> WorkflowState {
        WorkflowState {
            user_id: Some("u1".to_string()),
            cv_id: Some("cv1".to_string()),
            cv_data: Some(cv()),
            messages: vec![Message::user(message)],
            ..WorkflowState::default()
        }
    }

    #[tokio::test]
    async fn test_invoke_runs_orchestrator_then_one_specialist() {
        let store = Arc::new(InMemoryStore::new());
        let model = ScriptedModel::new()
            .with_reply(r#"{"intent": "find_jobs", "confidence": 0.95}"#)
            .with_reply(r#"{"rankings": [{"job_id": "1", "score": 82, "reason": "Python"}]}"#);

        let final_state = engine(model, store.clone()).invoke(state("find me jobs")).await;

        assert_eq!(final_state.next_action, Some(NextAction::End));
        assert_eq!(final_state.error, None);
        assert_eq!(final_state.job_matches.len(), 1);
        assert_eq!(final_state.messages.len(), 2);
        assert_eq!(final_state.messages[0].role, Role::User);
        assert_eq!(final_state.messages[1].role, Role::Assistant);
        assert_eq!(store.matches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_answered_history_without_new_turn_greets() {
        let model = Arc::new(ScriptedModel::new().with_reply(r#"{"intent": "analyze_cv"}"#));
        let mut initial = state("rate my cv");
        initial.messages.push(Message::assistant("Your CV scores 64/100."));
        let engine = WorkflowEngine::new(
            model.clone(),
            Arc::new(JobAggregator::new()),
            Arc::new(InMemoryStore::new()),
            JobSearchSettings::default(),
        );

        let final_state = engine.invoke(initial).await;

        assert_eq!(final_state.next_action, Some(NextAction::WaitForUser));
        assert_eq!(final_state.messages.len(), 3);
        assert_eq!(
            final_state.messages[2].content,
            crate::workflow::prompts::GREETING
        );
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_precondition_miss_never_reaches_specialist() {
        let model = ScriptedModel::new().with_reply(r#"{"intent": "enhance_letter"}"#);
        let final_state = engine(model, Arc::new(InMemoryStore::new()))
            .invoke(state("polish my letter"))
            .await;

        assert_eq!(final_state.next_action, Some(NextAction::WaitForUser));
        assert_eq!(final_state.messages.len(), 2);
        assert_eq!(
            final_state.intent.map(|i| i.intent),
            Some(crate::workflow::state::Intent::EnhanceLetter)
        );
    }

    #[tokio::test]
    async fn test_specialist_failure_ends_in_error_state() {
        let model = ScriptedModel::new()
            .with_reply(r#"{"intent": "analyze_cv"}"#)
            .with_failure("upstream exploded");
        let final_state = engine(model, Arc::new(InMemoryStore::new()))
            .invoke(state("rate my cv"))
            .await;

        assert_eq!(final_state.next_action, Some(NextAction::Error));
        assert!(final_state.error.is_some());
        let last = final_state.messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(!last.content.contains("exploded"));
    }

    #[tokio::test]
    async fn test_stream_yields_one_chunk_per_node() {
        let model = ScriptedModel::new()
            .with_reply(r#"{"intent": "analyze_cv"}"#)
            .with_reply(r#"{"overall_score": 64, "summary": "Decent."}"#);
        let engine = Arc::new(engine(model, Arc::new(InMemoryStore::new())));

        let chunks: Vec<StreamChunk> = engine.stream(state("rate my cv")).collect().await;
        let nodes: Vec<NodeKind> = chunks.iter().map(|c| c.node).collect();
        assert_eq!(nodes, vec![NodeKind::Orchestrator, NodeKind::CvEvaluation]);
        assert_eq!(chunks[0].update.next_action, Some(NextAction::AnalyzeCv));
        assert_eq!(chunks[1].update.next_action, Some(NextAction::End));
    }

    #[tokio::test]
    async fn test_stream_stops_after_terminal_orchestrator_decision() {
        let model = ScriptedModel::new().with_reply(r#"{"intent": "general", "reply": "Hello!"}"#);
        let engine = Arc::new(engine(model, Arc::new(InMemoryStore::new())));

        let chunks: Vec<StreamChunk> = engine.stream(state("hi")).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].update.next_action, Some(NextAction::RespondGeneral));
    }
}
