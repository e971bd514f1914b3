//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use crate::error::EcoError;
use crate::types::ThreadId;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Invocation id assigned by the provider.
    pub tool_call_id: Option<String>,
    /// Thread the paused run belongs to.
    pub thread_id: Option<ThreadId>,
}

/// What a tool produced.
///
/// `value` goes back to the model as the tool output. `side_payload` is
/// structured data for the HTTP caller (e.g. a partially filled form) and is
/// never sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub value: serde_json::Value,
    pub side_payload: Option<serde_json::Value>,
}

impl ToolOutcome {
    pub fn with_side_payload(mut self, payload: serde_json::Value) -> Self {
        self.side_payload = Some(payload);
        self
    }
}

impl From<serde_json::Value> for ToolOutcome {
    fn from(value: serde_json::Value) -> Self {
        Self {
            value,
            side_payload: None,
        }
    }
}

/// Core tool trait. Implement it to add a local tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the assistant calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Execute the tool with parsed arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolOutcome, EcoError>;
}

/// Type alias for the tool handler function.
type ToolHandler = dyn Fn(
        ToolArguments,
        ToolExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, EcoError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    description: String,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, EcoError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolOutcome, EcoError> {
        (self.handler)(args.clone(), ctx.clone())
            .await
            .map(ToolOutcome::from)
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
