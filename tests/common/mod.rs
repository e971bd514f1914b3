//! Shared test helpers: mock job service and mock chat provider.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use ecoclaim::error::EcoError;
use ecoclaim::provider::{ChatProvider, JobService};
use ecoclaim::types::*;

pub const RUN_ID: &str = "run_1";

/// A job service that replays queued run statuses.
///
/// Once the queue is empty every status query reports `in_progress`.
#[derive(Default)]
pub struct MockJobService {
    statuses: Mutex<VecDeque<RunStatus>>,
    submit_statuses: Mutex<VecDeque<RunStatus>>,
    messages: Mutex<Vec<ThreadMessage>>,
    threads_created: AtomicUsize,
    retrieves: AtomicUsize,
    appended: Mutex<Vec<(ThreadId, String)>>,
    runs_created: Mutex<Vec<(ThreadId, String)>>,
    submissions: Mutex<Vec<Vec<ToolOutput>>>,
    list_filters: Mutex<Vec<Option<RunId>>>,
}

impl MockJobService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_statuses(&self, statuses: impl IntoIterator<Item = RunStatus>) {
        self.statuses.lock().unwrap().extend(statuses);
    }

    /// Statuses returned by successive tool-output submissions; `queued` once empty.
    pub fn queue_submit_statuses(&self, statuses: impl IntoIterator<Item = RunStatus>) {
        self.submit_statuses.lock().unwrap().extend(statuses);
    }

    /// Add a thread message created `secs` after the epoch.
    pub fn add_message(&self, role: Role, content: &str, secs: i64) {
        let mut messages = self.messages.lock().unwrap();
        let id = format!("msg_{}", messages.len() + 1);
        messages.push(ThreadMessage {
            id,
            role,
            content: content.to_string(),
            created_at: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
        });
    }

    pub fn threads_created(&self) -> usize {
        self.threads_created.load(Ordering::SeqCst)
    }

    pub fn retrieve_count(&self) -> usize {
        self.retrieves.load(Ordering::SeqCst)
    }

    pub fn appended(&self) -> Vec<(ThreadId, String)> {
        self.appended.lock().unwrap().clone()
    }

    pub fn runs_created(&self) -> Vec<(ThreadId, String)> {
        self.runs_created.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn list_filters(&self) -> Vec<Option<RunId>> {
        self.list_filters.lock().unwrap().clone()
    }

    fn snapshot(status: RunStatus) -> RunSnapshot {
        RunSnapshot {
            id: RunId::new(RUN_ID),
            status,
        }
    }
}

#[async_trait]
impl JobService for MockJobService {
    async fn create_thread(&self) -> Result<ThreadId, EcoError> {
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ThreadId::new(format!("thread_{n}")))
    }

    async fn append_message(&self, thread: &ThreadId, content: &str) -> Result<(), EcoError> {
        self.appended
            .lock()
            .unwrap()
            .push((thread.clone(), content.to_string()));
        Ok(())
    }

    async fn create_run(&self, thread: &ThreadId, assistant_id: &str) -> Result<RunSnapshot, EcoError> {
        self.runs_created
            .lock()
            .unwrap()
            .push((thread.clone(), assistant_id.to_string()));
        Ok(Self::snapshot(RunStatus::Queued))
    }

    async fn retrieve_run(&self, _thread: &ThreadId, _run: &RunId) -> Result<RunSnapshot, EcoError> {
        self.retrieves.fetch_add(1, Ordering::SeqCst);
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RunStatus::InProgress);
        Ok(Self::snapshot(status))
    }

    async fn list_messages(
        &self,
        _thread: &ThreadId,
        run: Option<&RunId>,
    ) -> Result<Vec<ThreadMessage>, EcoError> {
        self.list_filters.lock().unwrap().push(run.cloned());
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn submit_tool_outputs(
        &self,
        _thread: &ThreadId,
        _run: &RunId,
        outputs: &[ToolOutput],
    ) -> Result<RunSnapshot, EcoError> {
        self.submissions.lock().unwrap().push(outputs.to_vec());
        let status = self
            .submit_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RunStatus::Queued);
        Ok(Self::snapshot(status))
    }
}

/// A chat provider that streams canned fragments.
#[derive(Default)]
pub struct MockChatProvider {
    fragments: Vec<String>,
    fail_mid_stream: Option<String>,
    fail_open: Option<String>,
    json_response: Mutex<Option<serde_json::Value>>,
    requests: Mutex<Vec<Vec<ConversationMessage>>>,
}

impl MockChatProvider {
    pub fn with_fragments(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Stream the fragments, then fail with `message`.
    pub fn failing_after(mut self, message: &str) -> Self {
        self.fail_mid_stream = Some(message.to_string());
        self
    }

    /// Fail before any fragment is produced.
    pub fn failing_to_open(message: &str) -> Self {
        Self {
            fail_open: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_json(value: serde_json::Value) -> Self {
        Self {
            json_response: Mutex::new(Some(value)),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    fn model_id(&self) -> &str {
        "mock-model"
    }

    async fn stream_chat(
        &self,
        messages: &[ConversationMessage],
    ) -> Result<BoxStream<'static, Result<TextStreamDelta, EcoError>>, EcoError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if let Some(message) = &self.fail_open {
            return Err(EcoError::api(502, message.clone()));
        }

        let mut items: Vec<Result<TextStreamDelta, EcoError>> = self
            .fragments
            .iter()
            .map(|f| Ok(TextStreamDelta::text(f.clone())))
            .collect();
        match &self.fail_mid_stream {
            Some(message) => items.push(Err(EcoError::Stream(message.clone()))),
            None => items.push(Ok(TextStreamDelta::done(Some(FinishReason::Stop)))),
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn complete_json(
        &self,
        _model: &str,
        messages: &[ConversationMessage],
    ) -> Result<serde_json::Value, EcoError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.json_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EcoError::Provider("no JSON response queued".into()))
    }
}

pub fn invocation(id: &str, tool: &str, args: &str) -> ToolInvocation {
    ToolInvocation {
        invocation_id: id.to_string(),
        tool_name: tool.to_string(),
        raw_arguments: args.to_string(),
    }
}
