//! Convenience re-exports for common use.

pub use crate::config::ServerConfig;
pub use crate::error::{EcoError, ErrorKind, Result};
pub use crate::history::{HistoryWindow, StreamAggregator};
pub use crate::provider::{ChatProvider, JobService};
pub use crate::run_loop::{PollPolicy, RunOrchestrator, RunOutcome, RunPoller, RunRequest};
pub use crate::tools::{AgentTool, Tool, ToolArguments, ToolDispatchStep, ToolRegistry};
pub use crate::types::{ConversationMessage, Role, RunStatus, ThreadId, ToolInvocation, ToolOutput};
