//! OpenAI Assistants v2 client (threads, runs, messages).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::EcoError;
use crate::types::*;

use super::http::{assistants_headers, check_status, shared_client};
use super::openai::DEFAULT_BASE_URL;
use super::JobService;

/// Page size when listing the messages of a finished run.
const MESSAGE_PAGE_LIMIT: u32 = 20;

pub struct OpenAiAssistantsClient {
    api_key: String,
    base_url: String,
}

impl OpenAiAssistantsClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, EcoError> {
        let url = format!("{}{path}", self.base_url);
        let resp = shared_client()
            .post(&url)
            .headers(assistants_headers(&self.api_key))
            .json(body)
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, EcoError> {
        let url = format!("{}{path}", self.base_url);
        let resp = shared_client()
            .get(&url)
            .headers(assistants_headers(&self.api_key))
            .query(query)
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }
}

#[async_trait]
impl JobService for OpenAiAssistantsClient {
    async fn create_thread(&self) -> Result<ThreadId, EcoError> {
        let thread: ObjectId = self.post("/threads", &serde_json::json!({})).await?;
        debug!(thread_id = %thread.id, "created thread");
        Ok(ThreadId::new(thread.id))
    }

    async fn append_message(&self, thread: &ThreadId, content: &str) -> Result<(), EcoError> {
        let body = serde_json::json!({ "role": "user", "content": content });
        let _: ObjectId = self
            .post(&format!("/threads/{thread}/messages"), &body)
            .await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread: &ThreadId,
        assistant_id: &str,
    ) -> Result<RunSnapshot, EcoError> {
        let body = serde_json::json!({ "assistant_id": assistant_id });
        let run: OpenAiRun = self.post(&format!("/threads/{thread}/runs"), &body).await?;
        debug!(%thread, run_id = %run.id, status = %run.status, "created run");
        run.into_snapshot()
    }

    async fn retrieve_run(&self, thread: &ThreadId, run: &RunId) -> Result<RunSnapshot, EcoError> {
        let run: OpenAiRun = self
            .get(&format!("/threads/{thread}/runs/{run}"), &[])
            .await?;
        run.into_snapshot()
    }

    async fn list_messages(
        &self,
        thread: &ThreadId,
        run: Option<&RunId>,
    ) -> Result<Vec<ThreadMessage>, EcoError> {
        let mut query = vec![
            ("order", "desc".to_string()),
            ("limit", MESSAGE_PAGE_LIMIT.to_string()),
        ];
        if let Some(run) = run {
            query.push(("run_id", run.to_string()));
        }
        let page: OpenAiList<OpenAiThreadMessage> = self
            .get(&format!("/threads/{thread}/messages"), &query)
            .await?;
        Ok(page
            .data
            .into_iter()
            .filter_map(OpenAiThreadMessage::into_message)
            .collect())
    }

    async fn submit_tool_outputs(
        &self,
        thread: &ThreadId,
        run: &RunId,
        outputs: &[ToolOutput],
    ) -> Result<RunSnapshot, EcoError> {
        let tool_outputs: Vec<serde_json::Value> = outputs
            .iter()
            .map(|o| serde_json::json!({ "tool_call_id": o.invocation_id, "output": o.output }))
            .collect();
        let body = serde_json::json!({ "tool_outputs": tool_outputs });
        let run: OpenAiRun = self
            .post(
                &format!("/threads/{thread}/runs/{run}/submit_tool_outputs"),
                &body,
            )
            .await?;
        run.into_snapshot()
    }
}

// Assistants API response types (internal)

#[derive(Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Deserialize)]
struct OpenAiList<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct OpenAiRun {
    id: String,
    status: String,
    #[serde(default)]
    required_action: Option<OpenAiRequiredAction>,
    #[serde(default)]
    last_error: Option<OpenAiRunError>,
    #[serde(default)]
    incomplete_details: Option<OpenAiIncompleteDetails>,
}

#[derive(Deserialize)]
struct OpenAiRequiredAction {
    submit_tool_outputs: OpenAiSubmitToolOutputs,
}

#[derive(Deserialize)]
struct OpenAiSubmitToolOutputs {
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiRunError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiIncompleteDetails {
    reason: Option<String>,
}

impl OpenAiRun {
    fn into_snapshot(self) -> Result<RunSnapshot, EcoError> {
        let status = match self.status.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" | "cancelling" => RunStatus::InProgress,
            "requires_action" => {
                let action = self.required_action.ok_or_else(|| {
                    EcoError::Provider(format!("run {} requires action but lists none", self.id))
                })?;
                RunStatus::RequiresAction {
                    actions: action
                        .submit_tool_outputs
                        .tool_calls
                        .into_iter()
                        .map(|call| ToolInvocation {
                            invocation_id: call.id,
                            tool_name: call.function.name,
                            raw_arguments: call.function.arguments,
                        })
                        .collect(),
                }
            }
            "completed" => RunStatus::Completed,
            "failed" | "cancelled" | "expired" | "incomplete" => RunStatus::Failed {
                reason: failure_reason(
                    &self.status,
                    self.last_error.as_ref(),
                    self.incomplete_details.as_ref(),
                ),
            },
            other => {
                return Err(EcoError::Provider(format!("unknown run status '{other}'")));
            }
        };
        Ok(RunSnapshot {
            id: RunId::new(self.id),
            status,
        })
    }
}

fn failure_reason(
    status: &str,
    last_error: Option<&OpenAiRunError>,
    incomplete: Option<&OpenAiIncompleteDetails>,
) -> Option<String> {
    if let Some(err) = last_error {
        let detail = match (&err.code, &err.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (Some(code), None) => Some(code.clone()),
            (None, Some(message)) => Some(message.clone()),
            (None, None) => None,
        };
        if detail.is_some() {
            return detail;
        }
    }
    if let Some(reason) = incomplete.and_then(|d| d.reason.as_ref()) {
        return Some(format!("{status}: {reason}"));
    }
    (status != "failed").then(|| format!("run {status}"))
}

#[derive(Deserialize)]
struct OpenAiThreadMessage {
    id: String,
    role: String,
    created_at: i64,
    #[serde(default)]
    content: Vec<OpenAiMessageContent>,
}

#[derive(Deserialize)]
struct OpenAiMessageContent {
    #[serde(default)]
    text: Option<OpenAiText>,
}

#[derive(Deserialize)]
struct OpenAiText {
    value: String,
}

impl OpenAiThreadMessage {
    fn into_message(self) -> Option<ThreadMessage> {
        let role: Role = self.role.parse().ok()?;
        let content = self
            .content
            .into_iter()
            .filter_map(|part| part.text.map(|t| t.value))
            .collect::<Vec<_>>()
            .join("");
        Some(ThreadMessage {
            id: self.id,
            role,
            content,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        })
    }
}
