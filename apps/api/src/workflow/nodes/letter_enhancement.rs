use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::llm_client::prompts::{json_system, HONESTY_INSTRUCTION};
use crate::llm_client::LanguageModel;
use crate::models::career::LetterEnhancement;
use crate::models::profile::CandidateProfile;
use crate::schema;
use crate::store::CareerStore;
use crate::workflow::nodes::{bullet_list, NodeError, NodeKind, WorkflowNode};
use crate::workflow::prompts::{LETTER_PROMPT_TEMPLATE, LETTER_ROLE, NEED_COVER_LETTER};
use crate::workflow::state::{StateUpdate, WorkflowState};

pub struct LetterEnhancementNode {
    llm: Arc<dyn LanguageModel>,
    store: Arc<dyn CareerStore>,
}

impl LetterEnhancementNode {
    pub fn new(llm: Arc<dyn LanguageModel>, store: Arc<dyn CareerStore>) -> Self {
        Self { llm, store }
    }
}

#[async_trait]
impl WorkflowNode for LetterEnhancementNode {
    fn kind(&self) -> NodeKind {
        NodeKind::LetterEnhancement
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, NodeError> {
        let Some(letter) = state
            .cover_letter
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
        else {
            return Ok(StateUpdate::wait_for_user(NEED_COVER_LETTER));
        };

        let profile = CandidateProfile::from_cv(state.cv_data.as_ref().unwrap_or(&Value::Null));
        let prompt = LETTER_PROMPT_TEMPLATE
            .replace("{honesty_instruction}", HONESTY_INSTRUCTION)
            .replace(
                "{profile_json}",
                &serde_json::to_string_pretty(&profile.summary()).unwrap_or_default(),
            )
            .replace(
                "{target_job_json}",
                &serde_json::to_string_pretty(&state.target_job).unwrap_or_default(),
            )
            .replace("{letter}", letter);

        let raw = self.llm.complete(&prompt, &json_system(LETTER_ROLE)).await?;
        let enhancement: LetterEnhancement = schema::parse_model_output(&raw)?;
        info!(
            "Cover letter enhanced with {} listed changes",
            enhancement.changes.len()
        );

        if let Some(user_id) = state.user_id() {
            if let Err(e) = self
                .store
                .save_letter_revision(
                    user_id,
                    state.cv_id.as_deref(),
                    letter,
                    &enhancement.enhanced_letter,
                    &enhancement.changes,
                )
                .await
            {
                warn!("Failed to save cover letter revision: {e}");
            }
        }

        let mut message = format!(
            "Here is your improved cover letter:\n\n{}",
            enhancement.enhanced_letter.trim()
        );
        if !enhancement.changes.is_empty() {
            message.push_str("\n\nWhat I changed:\n");
            message.push_str(&bullet_list(&enhancement.changes));
        }

        Ok(StateUpdate {
            cover_letter: Some(enhancement.enhanced_letter),
            ..StateUpdate::end(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedModel;
    use crate::store::memory::InMemoryStore;
    use crate::workflow::nodes::run_node;
    use crate::workflow::state::NextAction;

    fn state() -> WorkflowState {
        WorkflowState {
            user_id: Some("u1".to_string()),
            cover_letter: Some("Dear team, I want job.".to_string()),
            ..WorkflowState::default()
        }
    }

    #[tokio::test]
    async fn test_letter_is_replaced_and_revision_saved() {
        let store = Arc::new(InMemoryStore::new());
        let model = Arc::new(ScriptedModel::new().with_reply(
            r#"```json
{"enhanced_letter": "Dear hiring team, I would love to join.", "changes": ["Warmer opening"]}
```"#,
        ));
        let node = LetterEnhancementNode::new(model.clone(), store.clone());

        let update = run_node(&node, &state()).await;
        assert_eq!(update.next_action, Some(NextAction::End));
        assert_eq!(
            update.cover_letter.as_deref(),
            Some("Dear hiring team, I would love to join.")
        );
        assert!(update.messages[0].content.contains("- Warmer opening"));
        assert!(model.prompts.lock().unwrap()[0].contains("Dear team, I want job."));

        let letters = store.letters.lock().unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].original, "Dear team, I want job.");
        assert_eq!(letters[0].user_id, "u1");
    }

    #[tokio::test]
    async fn test_empty_letter_from_model_is_rejected() {
        let model = Arc::new(ScriptedModel::new().with_reply(r#"{"enhanced_letter": ""}"#));
        let node = LetterEnhancementNode::new(model, Arc::new(InMemoryStore::new()));
        let update = run_node(&node, &state()).await;
        assert_eq!(update.next_action, Some(NextAction::Error));
        assert_eq!(update.cover_letter, None);
    }

    #[tokio::test]
    async fn test_missing_letter_asks_for_it() {
        let node = LetterEnhancementNode::new(
            Arc::new(ScriptedModel::new()),
            Arc::new(InMemoryStore::new()),
        );
        let update = run_node(&node, &WorkflowState::default()).await;
        assert_eq!(update.next_action, Some(NextAction::WaitForUser));
        assert_eq!(update.messages[0].content, NEED_COVER_LETTER);
    }
}
