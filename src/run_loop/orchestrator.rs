//! Drives one assistant run from thread setup to the final reply.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::poller::{PollPolicy, RunPoller};
use crate::error::EcoError;
use crate::provider::JobService;
use crate::tools::dispatch::{merge_side_payload, ToolDispatchStep};
use crate::tools::registry::ToolRegistry;
use crate::types::{Role, RunId, RunStatus, ThreadId, ThreadMessage};

/// One user message to run against an assistant.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Existing conversation to continue; `None` starts a new thread.
    pub thread_id: Option<ThreadId>,
    pub message: String,
    pub assistant_id: String,
}

impl RunRequest {
    pub fn new(message: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            thread_id: None,
            message: message.into(),
            assistant_id: assistant_id.into(),
        }
    }

    pub fn with_thread(mut self, thread_id: Option<ThreadId>) -> Self {
        self.thread_id = thread_id;
        self
    }
}

/// Final reply of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub thread_id: ThreadId,
    pub response: String,
    /// Merged secondary payload from every action round, if any tool produced one.
    pub form_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Created,
    Running,
    RequiresAction,
    Completed,
    Failed,
    TimedOut,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::RequiresAction => "requires_action",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

fn enter(run: &RunId, from: RunPhase, to: RunPhase) -> RunPhase {
    debug!(%run, %from, %to, "run phase");
    to
}

/// Runs user messages against assistants, executing requested tools locally.
#[derive(Clone)]
pub struct RunOrchestrator {
    service: Arc<dyn JobService>,
    registry: Arc<ToolRegistry>,
    policy: PollPolicy,
}

impl RunOrchestrator {
    pub fn new(service: Arc<dyn JobService>, registry: Arc<ToolRegistry>, policy: PollPolicy) -> Self {
        Self {
            service,
            registry,
            policy,
        }
    }

    /// Append `request.message` to its thread, run the assistant to completion
    /// and return the newest assistant reply.
    pub async fn run(&self, request: RunRequest, cancel: CancellationToken) -> Result<RunOutcome, EcoError> {
        let service = self.service.as_ref();

        let thread = match request.thread_id {
            Some(thread) => thread,
            None => service.create_thread().await?,
        };
        service.append_message(&thread, &request.message).await?;
        let run = service.create_run(&thread, &request.assistant_id).await?.id;
        let mut phase = RunPhase::Created;
        info!(%thread, %run, assistant_id = %request.assistant_id, "run created");

        let dispatcher = ToolDispatchStep::new(&self.registry).with_thread(thread.clone());
        let mut poller = RunPoller::new(service, self.policy, cancel.clone());
        let mut form_data = None;
        let mut rounds = 0u32;
        let mut submitted: Option<RunStatus> = None;

        loop {
            phase = enter(&run, phase, RunPhase::Running);
            // A submission that already settled the run skips the next poll.
            let status = match submitted.take().filter(RunStatus::needs_attention) {
                Some(status) => status,
                None => match poller.poll(&thread, &run).await {
                    Ok(status) => status,
                    Err(err @ EcoError::PollTimeout { .. }) => {
                        enter(&run, phase, RunPhase::TimedOut);
                        return Err(err);
                    }
                    Err(err) => return Err(err),
                },
            };

            match status {
                RunStatus::Completed => {
                    enter(&run, phase, RunPhase::Completed);
                    break;
                }
                RunStatus::Failed { reason } => {
                    enter(&run, phase, RunPhase::Failed);
                    return Err(EcoError::RunFailed { reason });
                }
                RunStatus::RequiresAction { actions } => {
                    phase = enter(&run, phase, RunPhase::RequiresAction);
                    rounds += 1;

                    let batch = tokio::select! {
                        _ = cancel.cancelled() => return Err(EcoError::Canceled),
                        batch = dispatcher.dispatch(&actions) => batch,
                    };
                    if let Some(payload) = batch.side_payload.clone() {
                        merge_side_payload(&mut form_data, payload);
                    }
                    let snapshot = dispatcher
                        .submit(service, &thread, &run, &actions, &batch)
                        .await?;
                    debug!(%run, status = snapshot.status.label(), "tool outputs accepted");
                    submitted = Some(snapshot.status);
                }
                // The poller only returns once the run needs attention.
                RunStatus::Queued | RunStatus::InProgress => continue,
            }
        }

        let messages = service.list_messages(&thread, Some(&run)).await?;
        let response = newest_assistant_message(&messages)
            .map(|message| message.content.clone())
            .ok_or_else(|| EcoError::Provider(format!("run {run} completed without an assistant message")))?;

        info!(%thread, %run, rounds, polls = poller.attempts_used(), "run completed");
        Ok(RunOutcome {
            thread_id: thread,
            response,
            form_data,
        })
    }
}

/// Newest assistant message by `created_at`; ties go to the later entry.
pub fn newest_assistant_message(messages: &[ThreadMessage]) -> Option<&ThreadMessage> {
    messages
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .max_by_key(|message| message.created_at)
}
