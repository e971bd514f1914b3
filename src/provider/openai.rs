//! OpenAI Chat Completions API provider.

use std::fmt;

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::error::EcoError;
use crate::types::*;

use super::http::{bearer_headers, check_status, shared_client};
use super::ChatProvider;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiChatProvider {
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiChatProvider {
    pub fn new(model: impl Into<String>, api_key: String, base_url: Option<String>) -> Self {
        Self {
            model: model.into(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn build_request_body(
        &self,
        model: &str,
        messages: &[ConversationMessage],
        stream: bool,
        json_mode: bool,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": stream,
        });
        if json_mode {
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "response_format".into(),
                    serde_json::json!({ "type": "json_object" }),
                );
            }
        }
        body
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_chat(
        &self,
        messages: &[ConversationMessage],
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, EcoError>>, EcoError> {
        let body = self.build_request_body(&self.model, messages, true, false);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, messages = messages.len(), "OpenAI stream_chat");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let stream = text_deltas(resp.bytes_stream());
        Ok(Box::pin(stream))
    }

    async fn complete_json(
        &self,
        model: &str,
        messages: &[ConversationMessage],
    ) -> Result<serde_json::Value, EcoError> {
        let body = self.build_request_body(model, messages, false, true);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model, "OpenAI complete_json");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let data: OpenAiChatResponse = resp.json().await?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EcoError::Provider("No choices in OpenAI response".into()))?;

        Ok(serde_json::from_str(&content)?)
    }
}

/// Decode an SSE byte stream into text deltas.
///
/// Bytes are buffered until a UTF-8 sequence is complete, so a character split
/// across network chunks reaches the caller intact.
pub(crate) fn text_deltas<S, B, E>(bytes: S) -> impl Stream<Item = Result<TextStreamDelta, EcoError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<EcoError> + fmt::Display,
{
    async_stream::stream! {
        let events = bytes.eventsource();
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(EventStreamError::Transport(e)) => {
                    yield Err(e.into());
                    break;
                }
                Err(e) => {
                    yield Err(EcoError::Stream(e.to_string()));
                    break;
                }
            };
            if event.data == "[DONE]" {
                break;
            }

            match serde_json::from_str::<OpenAiStreamChunk>(&event.data) {
                Ok(chunk) => {
                    let Some(choice) = chunk.choices.into_iter().next() else {
                        continue;
                    };
                    if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                        yield Ok(TextStreamDelta::text(text));
                    }
                    if let Some(reason) = choice.finish_reason.as_deref() {
                        yield Ok(TextStreamDelta::done(parse_finish_reason(reason)));
                    }
                }
                Err(e) => {
                    debug!(error = %e, "skipping unparseable stream chunk");
                }
            }
        }
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    s.parse().ok()
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
}
