//! Error classification shared by the orchestration layer and the HTTP surface.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Broad error kind used to tell failures apart at the HTTP boundary.
///
/// `RunFailed` means the provider reported the run as failed; `PollTimeout`
/// means the local attempt budget ran out first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    ProviderTransport,
    ToolArgument,
    UnknownTool,
    IncompleteToolSubmission,
    RunFailed,
    PollTimeout,
    CorsRejected,
    Canceled,
    Configuration,
    Internal,
}
