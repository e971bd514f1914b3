//! ecoclaim: chat and assistant proxy for carbon footprint tools.
//!
//! Streams chat completions to a browser client and drives remote assistant
//! runs to completion, executing the tool calls they request locally.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ecoclaim::prelude::*;
//!
//! # async fn example() -> ecoclaim::error::Result<()> {
//! let config = ServerConfig::from_env()?;
//! let jobs = Arc::new(ecoclaim::provider::create_job_service(&config));
//! let orchestrator = RunOrchestrator::new(
//!     jobs,
//!     Arc::new(ToolRegistry::with_builtins()),
//!     PollPolicy::from_config(&config),
//! );
//! let outcome = orchestrator
//!     .run(
//!         RunRequest::new("How much CO2 is 10kg of steel?", "asst_123"),
//!         tokio_util::sync::CancellationToken::new(),
//!     )
//!     .await?;
//! println!("{}", outcome.response);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod form;
pub mod history;
pub mod prelude;
pub mod provider;
pub mod run_loop;
pub mod tools;
pub mod types;

#[cfg(feature = "server")]
pub mod cli;

#[cfg(feature = "server")]
pub mod server;
