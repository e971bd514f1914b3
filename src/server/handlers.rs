//! Route handlers.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::error::ApiError;
use super::AppState;
use crate::error::EcoError;
use crate::form::{extract_travel_form, TravelForm};
use crate::history::{HistoryWindow, StreamAggregator};
use crate::run_loop::{RunOutcome, RunRequest};
use crate::types::{ConversationMessage, StreamEventType, ThreadId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub message_history: Vec<ConversationMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub response: String,
    pub thread_id: ThreadId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct FormRequest {
    pub message: String,
}

/// `/ecoclaim_assistant` body. Fields other than `message` and `threadId`
/// are echoed back untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoclaimRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `POST /chat`: stream a completion as SSE, then send the trimmed history.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut window =
        HistoryWindow::from_messages(request.message_history, state.config.history_max_messages);
    window.append(ConversationMessage::user(request.message));

    let mut deltas = state.chat.stream_chat(&window.snapshot()).await?;
    debug!(model = state.chat.model_id(), history = window.len(), "chat stream opened");

    let events = async_stream::stream! {
        let mut aggregator = StreamAggregator::new();
        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) if delta.event_type == StreamEventType::TextDelta => {
                    if delta.text.is_empty() {
                        continue;
                    }
                    aggregator.push(&delta.text);
                    yield Ok::<_, Infallible>(Event::default().data(delta.text.replace('\r', "")));
                }
                Ok(_) => {}
                Err(err) => {
                    error!(error = %err, "chat stream failed");
                    yield Ok::<_, Infallible>(Event::default().data(
                        serde_json::json!({ "error": err.to_string() }).to_string(),
                    ));
                    return;
                }
            }
        }

        window.complete_turn(aggregator.finish());
        yield Ok::<_, Infallible>(Event::default().data(
            serde_json::json!({ "completeHistory": window.snapshot() }).to_string(),
        ));
    };

    Ok(Sse::new(events))
}

/// `POST /assistant`
pub async fn assistant(
    State(state): State<AppState>,
    Json(request): Json<AssistantRequest>,
) -> Result<Json<AssistantResponse>, ApiError> {
    let assistant_id = require_assistant(state.config.assistant_id.as_deref(), "ASSISTANT_ID")?;
    let outcome = run_assistant(&state, assistant_id, request.message, request.thread_id).await?;
    Ok(Json(AssistantResponse {
        response: outcome.response,
        thread_id: outcome.thread_id,
        form_data: outcome.form_data,
    }))
}

/// `POST /form`
pub async fn form(
    State(state): State<AppState>,
    Json(request): Json<FormRequest>,
) -> Result<Json<TravelForm>, ApiError> {
    let form = extract_travel_form(state.chat.as_ref(), &state.config.form_model, &request.message).await?;
    Ok(Json(form))
}

/// `POST /ecoclaim_assistant`
pub async fn ecoclaim_assistant(
    State(state): State<AppState>,
    Json(request): Json<EcoclaimRequest>,
) -> Result<Json<Value>, ApiError> {
    let assistant_id = require_assistant(
        state.config.ecoclaim_assistant_id.as_deref(),
        "ECOCLAIM_ASSISTANT_ID",
    )?;
    let mut body = request.extra;
    body.insert("message".into(), Value::String(request.message.clone()));

    let outcome = run_assistant(&state, assistant_id, request.message, request.thread_id).await?;
    body.insert("assistantResponse".into(), Value::String(outcome.response));
    body.insert("threadId".into(), Value::String(outcome.thread_id.to_string()));
    if let Some(form_data) = outcome.form_data {
        body.insert("formData".into(), form_data);
    }
    Ok(Json(Value::Object(body)))
}

/// `POST /test`
pub async fn test() -> Json<Value> {
    Json(serde_json::json!({ "message": "Test response successful" }))
}

fn require_assistant<'a>(id: Option<&'a str>, var: &str) -> Result<&'a str, EcoError> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| EcoError::Configuration(format!("{var} is not set")))
}

/// Run one message against an assistant, one request per thread at a time.
///
/// Dropping the returned future (client disconnect) cancels the run loop.
async fn run_assistant(
    state: &AppState,
    assistant_id: &str,
    message: String,
    thread_id: Option<String>,
) -> Result<RunOutcome, EcoError> {
    let thread_id = thread_id.filter(|id| !id.is_empty()).map(ThreadId::new);
    let _conversation = match &thread_id {
        Some(thread) => Some(state.locks.acquire(thread).await),
        None => None,
    };

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    state
        .orchestrator()
        .run(RunRequest::new(message, assistant_id).with_thread(thread_id), cancel)
        .await
}
