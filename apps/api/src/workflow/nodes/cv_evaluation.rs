use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::llm_client::prompts::{json_system, HONESTY_INSTRUCTION};
use crate::llm_client::LanguageModel;
use crate::models::career::CvEvaluation;
use crate::schema;
use crate::store::CareerStore;
use crate::workflow::nodes::{bullet_list, NodeError, NodeKind, WorkflowNode};
use crate::workflow::prompts::{CV_EVALUATION_PROMPT_TEMPLATE, CV_EVALUATION_ROLE, NEED_CV};
use crate::workflow::state::{StateUpdate, WorkflowState};

pub struct CvEvaluationNode {
    llm: Arc<dyn LanguageModel>,
    store: Arc<dyn CareerStore>,
}

impl CvEvaluationNode {
    pub fn new(llm: Arc<dyn LanguageModel>, store: Arc<dyn CareerStore>) -> Self {
        Self { llm, store }
    }
}

#[async_trait]
impl WorkflowNode for CvEvaluationNode {
    fn kind(&self) -> NodeKind {
        NodeKind::CvEvaluation
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, NodeError> {
        let Some(cv) = state.cv_data.as_ref().filter(|_| state.has_cv()) else {
            return Ok(StateUpdate::wait_for_user(NEED_CV));
        };

        let prompt = CV_EVALUATION_PROMPT_TEMPLATE
            .replace("{honesty_instruction}", HONESTY_INSTRUCTION)
            .replace(
                "{target_job_json}",
                &serde_json::to_string_pretty(&state.target_job).unwrap_or_default(),
            )
            .replace(
                "{cv_json}",
                &serde_json::to_string_pretty(cv).unwrap_or_default(),
            );

        let raw = self.llm.complete(&prompt, &json_system(CV_EVALUATION_ROLE)).await?;
        let evaluation: CvEvaluation = schema::parse_model_output(&raw)?;
        info!("CV evaluated: score {:.0}", evaluation.overall_score);

        // persistence is best-effort; the evaluation is still shown
        if let (Some(user_id), Some(cv_id)) = (state.user_id(), state.cv_id.as_deref()) {
            if let Err(e) = self.store.save_cv_evaluation(user_id, cv_id, &evaluation).await {
                warn!("Failed to save CV evaluation for cv {cv_id}: {e}");
            }
        }

        Ok(StateUpdate::end(render_evaluation(&evaluation)))
    }
}

fn render_evaluation(evaluation: &CvEvaluation) -> String {
    let mut text = format!(
        "Your CV scores {:.0}/100.\n\n{}",
        evaluation.overall_score,
        evaluation.summary.trim()
    );
    if !evaluation.strengths.is_empty() {
        text.push_str("\n\nStrengths:\n");
        text.push_str(&bullet_list(&evaluation.strengths));
    }
    if !evaluation.improvements.is_empty() {
        text.push_str("\n\nWhat to improve:\n");
        text.push_str(&bullet_list(&evaluation.improvements));
    }
    text
}
