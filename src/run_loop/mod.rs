//! Remote run lifecycle: bounded polling and the action-round state machine.

pub mod orchestrator;
pub mod poller;

pub use orchestrator::*;
pub use poller::*;
