//! Local tools invoked by paused assistant runs.

pub mod arguments;
pub mod builtin;
pub mod dispatch;
pub mod registry;
pub mod tool;

pub use arguments::ToolArguments;
pub use dispatch::{DispatchBatch, ToolDispatchStep};
pub use registry::ToolRegistry;
pub use tool::{AgentTool, Tool, ToolExecutionContext, ToolOutcome};
