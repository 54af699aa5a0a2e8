//! Axum route handlers for the career workflow.

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use validator::Validate;

use crate::errors::AppError;
use crate::state::AppState;
use crate::workflow::state::{merge, Message, TargetJob, WorkflowState};

const MAX_MESSAGE_CHARS: u64 = 8_000;
const MAX_LETTER_CHARS: u64 = 20_000;

#[derive(Debug, Deserialize, Validate)]
pub struct WorkflowRequest {
    pub user_id: Option<String>,
    pub cv_id: Option<String>,
    pub cv_data: Option<Value>,
    pub target_job: Option<TargetJob>,
    #[validate(length(max = MAX_LETTER_CHARS, message = "is too long"))]
    pub cover_letter: Option<String>,
    pub application_id: Option<String>,
    /// Earlier turns of the conversation, oldest first.
    #[serde(default)]
    pub history: Vec<Message>,
    /// The new user message. May be empty, in which case the assistant greets.
    #[serde(default)]
    #[validate(length(max = MAX_MESSAGE_CHARS, message = "is too long"))]
    pub message: String,
}

impl WorkflowRequest {
    fn into_state(self) -> WorkflowState {
        let mut messages = self.history;
        let text = self.message.trim();
        if !text.is_empty() {
            messages.push(Message::user(text));
        }
        WorkflowState {
            user_id: self.user_id,
            cv_id: self.cv_id,
            cv_data: self.cv_data,
            target_job: self.target_job,
            cover_letter: self.cover_letter,
            application_id: self.application_id,
            messages,
            ..WorkflowState::default()
        }
    }
}

fn validated(req: WorkflowRequest) -> Result<WorkflowState, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(crate::schema::flatten_errors(&e)))?;
    Ok(req.into_state())
}

/// POST /api/v1/workflow/invoke
///
/// Runs one turn of the workflow and returns the final state.
pub async fn handle_invoke(
    State(state): State<AppState>,
    Json(req): Json<WorkflowRequest>,
) -> Result<Json<WorkflowState>, AppError> {
    let initial = validated(req)?;
    info!(
        "Workflow invoke for user {}",
        initial.user_id.as_deref().unwrap_or("anonymous")
    );
    Ok(Json(state.engine.invoke(initial).await))
}

/// POST /api/v1/workflow/stream
///
/// Same as invoke, but sends a `node_update` event per node followed by a
/// `done` event carrying the final state.
pub async fn handle_stream(
    State(state): State<AppState>,
    Json(req): Json<WorkflowRequest>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    let initial = validated(req)?;
    let chunks = state.engine.clone().stream(initial.clone());

    let events = stream! {
        let mut current = initial;
        let mut chunks = Box::pin(chunks);
        while let Some(chunk) = chunks.next().await {
            match serde_json::to_string(&chunk) {
                Ok(payload) => {
                    yield Ok(SseEvent::default().event("node_update").data(payload));
                }
                Err(e) => error!("Failed to serialize node update: {e}"),
            }
            current = merge(current, chunk.update);
        }
        let payload = serde_json::to_string(&current)
            .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
        yield Ok(SseEvent::default().event("done").data(payload));
    };

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keepalive"),
    ))
}
