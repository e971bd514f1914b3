//! Turns a `requires_action` snapshot into a complete tool-output batch.
//!
//! Per-invocation failures (malformed arguments, unknown tools, tool errors)
//! become error-marker outputs and the rest of the batch still runs. Only
//! submission can fail, when the batch does not cover the requested
//! invocations.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, warn};

use super::arguments::ToolArguments;
use super::registry::ToolRegistry;
use super::tool::ToolExecutionContext;
use crate::error::{EcoError, ErrorKind};
use crate::provider::JobService;
use crate::types::{RunId, RunSnapshot, ThreadId, ToolInvocation, ToolOutput};

/// Outputs for one action round plus any secondary payload tools produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchBatch {
    pub outputs: Vec<ToolOutput>,
    pub side_payload: Option<serde_json::Value>,
}

impl DispatchBatch {
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// One dispatch round against a tool registry.
pub struct ToolDispatchStep<'a> {
    registry: &'a ToolRegistry,
    thread_id: Option<ThreadId>,
}

impl<'a> ToolDispatchStep<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self {
            registry,
            thread_id: None,
        }
    }

    pub fn with_thread(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Execute every invocation. Output order follows input order.
    pub async fn dispatch(&self, actions: &[ToolInvocation]) -> DispatchBatch {
        let results = join_all(actions.iter().map(|action| self.invoke(action))).await;

        let mut batch = DispatchBatch::default();
        for (output, side_payload) in results {
            if let Some(payload) = side_payload {
                merge_side_payload(&mut batch.side_payload, payload);
            }
            batch.outputs.push(output);
        }
        batch
    }

    async fn invoke(&self, action: &ToolInvocation) -> (ToolOutput, Option<serde_json::Value>) {
        let id = action.invocation_id.as_str();

        let args = match ToolArguments::parse(&action.raw_arguments) {
            Ok(args) => args,
            Err(e) => {
                let err = EcoError::ToolArgumentParse {
                    tool_name: action.tool_name.clone(),
                    message: e.to_string(),
                };
                warn!(invocation_id = id, tool = %action.tool_name, error = %err, "tool arguments rejected");
                return (failure(id, &err), None);
            }
        };

        let Some(tool) = self.registry.get(&action.tool_name) else {
            let err = EcoError::UnknownTool(action.tool_name.clone());
            warn!(invocation_id = id, tool = %action.tool_name, "unknown tool requested");
            return (failure(id, &err), None);
        };

        let ctx = ToolExecutionContext {
            tool_call_id: Some(action.invocation_id.clone()),
            thread_id: self.thread_id.clone(),
        };
        match tool.execute(&args, &ctx).await {
            Ok(outcome) => {
                debug!(invocation_id = id, tool = %action.tool_name, "tool succeeded");
                (ToolOutput::success(id, &outcome.value), outcome.side_payload)
            }
            Err(err) => {
                warn!(invocation_id = id, tool = %action.tool_name, error = %err, "tool failed");
                (failure(id, &err), None)
            }
        }
    }

    /// Validate the batch against the requested actions and submit it in one call.
    ///
    /// An empty or partial batch fails with `IncompleteToolSubmission` and
    /// the provider is not contacted.
    pub async fn submit(
        &self,
        service: &dyn JobService,
        thread: &ThreadId,
        run: &RunId,
        actions: &[ToolInvocation],
        batch: &DispatchBatch,
    ) -> Result<RunSnapshot, EcoError> {
        check_complete(actions, &batch.outputs)?;
        debug!(%thread, %run, outputs = batch.outputs.len(), "submitting tool outputs");
        service
            .submit_tool_outputs(thread, run, &batch.outputs)
            .await
    }
}

/// Every requested invocation id must appear exactly once, with nothing extra.
pub fn check_complete(actions: &[ToolInvocation], outputs: &[ToolOutput]) -> Result<(), EcoError> {
    let requested: HashSet<&str> = actions.iter().map(|a| a.invocation_id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut unexpected = Vec::new();

    for output in outputs {
        let id = output.invocation_id.as_str();
        if !requested.contains(id) || !seen.insert(id) {
            unexpected.push(id.to_string());
        }
    }

    let mut missing: Vec<String> = requested
        .difference(&seen)
        .map(|id| id.to_string())
        .collect();
    missing.sort();

    if requested.is_empty() || !missing.is_empty() || !unexpected.is_empty() {
        return Err(EcoError::IncompleteToolSubmission {
            missing,
            unexpected,
        });
    }
    Ok(())
}

/// Merge a tool's secondary payload into the accumulated one.
///
/// Objects merge key by key with later values winning; anything else replaces.
pub fn merge_side_payload(acc: &mut Option<serde_json::Value>, next: serde_json::Value) {
    match (acc, next) {
        (Some(serde_json::Value::Object(existing)), serde_json::Value::Object(incoming)) => {
            existing.extend(incoming);
        }
        (acc, next) => *acc = Some(next),
    }
}

fn failure(invocation_id: &str, err: &EcoError) -> ToolOutput {
    let kind = match err.kind() {
        ErrorKind::ToolArgument => "invalid_arguments",
        ErrorKind::UnknownTool => "unknown_tool",
        _ => "tool_error",
    };
    ToolOutput::failure(invocation_id, kind, err.to_string())
}
