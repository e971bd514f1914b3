//! Remote run types: threads, runs, tool invocations and outputs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Role;

/// Provider-side conversation container (the job handle).
///
/// Created once per conversation and echoed back to the caller, who supplies
/// it again on the next turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one run on a thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a remote run. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction { actions: Vec<ToolInvocation> },
    Completed,
    Failed { reason: Option<String> },
}

impl RunStatus {
    /// Whether the poller should stop and hand control back to its caller.
    pub fn needs_attention(&self) -> bool {
        !matches!(self, Self::Queued | Self::InProgress)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction { .. } => "requires_action",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// A run as returned by create, retrieve and submit calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub id: RunId,
    pub status: RunStatus,
}

/// A tool call requested by a paused run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub invocation_id: String,
    pub tool_name: String,
    /// JSON-encoded arguments, exactly as the provider sent them.
    pub raw_arguments: String,
}

/// Result of one tool invocation, submitted back to unblock the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub invocation_id: String,
    /// JSON-encoded when structured.
    pub output: String,
    #[serde(default, skip_serializing)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(invocation_id: impl Into<String>, value: &serde_json::Value) -> Self {
        let output = match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Self {
            invocation_id: invocation_id.into(),
            output,
            is_error: false,
        }
    }

    /// Error-marker output; the run continues and the model sees the failure.
    pub fn failure(invocation_id: impl Into<String>, kind: &str, message: impl Into<String>) -> Self {
        let payload = serde_json::json!({
            "error": "Failure",
            "kind": kind,
            "message": message.into(),
        });
        Self {
            invocation_id: invocation_id.into(),
            output: payload.to_string(),
            is_error: true,
        }
    }
}

/// A message stored on a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    /// Concatenated text parts.
    pub content: String,
    pub created_at: DateTime<Utc>,
}
