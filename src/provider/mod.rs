//! Provider traits and the OpenAI-compatible implementations.
//!
//! Two seams are consumed: a streaming chat-completion call ([`ChatProvider`])
//! and an asynchronous job service over threads and runs ([`JobService`]).

pub mod assistants;
pub mod http;
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::ServerConfig;
use crate::error::EcoError;
use crate::types::{
    ConversationMessage, RunId, RunSnapshot, TextStreamDelta, ThreadId, ThreadMessage, ToolOutput,
};

/// Chat-completion provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Stream a completion for the given history, fragment by fragment.
    async fn stream_chat(
        &self,
        messages: &[ConversationMessage],
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, EcoError>>, EcoError>;

    /// Non-streaming completion constrained to a JSON object.
    async fn complete_json(
        &self,
        model: &str,
        messages: &[ConversationMessage],
    ) -> Result<serde_json::Value, EcoError>;
}

/// Remote asynchronous job service (threads, runs, messages, tool outputs).
#[async_trait]
pub trait JobService: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadId, EcoError>;

    async fn append_message(&self, thread: &ThreadId, content: &str) -> Result<(), EcoError>;

    async fn create_run(&self, thread: &ThreadId, assistant_id: &str)
        -> Result<RunSnapshot, EcoError>;

    async fn retrieve_run(&self, thread: &ThreadId, run: &RunId) -> Result<RunSnapshot, EcoError>;

    /// List messages on a thread, optionally restricted to one run.
    ///
    /// Ordering is provider-defined; callers must not rely on it.
    async fn list_messages(
        &self,
        thread: &ThreadId,
        run: Option<&RunId>,
    ) -> Result<Vec<ThreadMessage>, EcoError>;

    /// Submit the full output batch for a paused run in one call.
    async fn submit_tool_outputs(
        &self,
        thread: &ThreadId,
        run: &RunId,
        outputs: &[ToolOutput],
    ) -> Result<RunSnapshot, EcoError>;
}

/// Create the chat provider for the given config.
pub fn create_chat_provider(config: &ServerConfig) -> openai::OpenAiChatProvider {
    openai::OpenAiChatProvider::new(
        config.chat_model.clone(),
        config.api_key.clone(),
        config.base_url.clone(),
    )
}

/// Create the job service for the given config.
pub fn create_job_service(config: &ServerConfig) -> assistants::OpenAiAssistantsClient {
    assistants::OpenAiAssistantsClient::new(config.api_key.clone(), config.base_url.clone())
}
