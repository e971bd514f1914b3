//! Bounded, cooperative run-status polling.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::config::ServerConfig;
use crate::error::EcoError;
use crate::provider::JobService;
use crate::types::{RunId, RunStatus, ThreadId};

/// Delay between status queries and the total query budget for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.poll_interval, config.poll_max_attempts)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000), 20)
    }
}

/// Polls one run until it needs attention.
///
/// The attempt budget belongs to the poller, so every `poll` call made for
/// the same run draws from it.
pub struct RunPoller<'a> {
    service: &'a dyn JobService,
    policy: PollPolicy,
    attempts_used: u32,
    cancel: CancellationToken,
}

impl<'a> RunPoller<'a> {
    pub fn new(service: &'a dyn JobService, policy: PollPolicy, cancel: CancellationToken) -> Self {
        Self {
            service,
            policy,
            attempts_used: 0,
            cancel,
        }
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.policy.max_attempts.saturating_sub(self.attempts_used)
    }

    /// Query until the run is completed, failed or requires action.
    ///
    /// The first query of each call is immediate; the policy interval is
    /// slept only between queries.
    pub async fn poll(&mut self, thread: &ThreadId, run: &RunId) -> Result<RunStatus, EcoError> {
        let mut first = true;
        loop {
            if self.attempts_used >= self.policy.max_attempts {
                return Err(EcoError::PollTimeout {
                    attempts: self.attempts_used,
                });
            }

            if !first {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(EcoError::Canceled),
                    _ = time::sleep(self.policy.interval) => {}
                }
            }
            first = false;

            self.attempts_used += 1;
            let snapshot = tokio::select! {
                _ = self.cancel.cancelled() => return Err(EcoError::Canceled),
                snapshot = self.service.retrieve_run(thread, run) => snapshot?,
            };
            trace!(%run, attempt = self.attempts_used, status = snapshot.status.label(), "polled run");

            if snapshot.status.needs_attention() {
                return Ok(snapshot.status);
            }
        }
    }
}
