//! Error types for ecoclaim.

pub mod unified;

pub use unified::ErrorKind;

use thiserror::Error;

/// Primary error type for all ecoclaim operations.
#[derive(Error, Debug)]
pub enum EcoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed arguments for tool {tool_name}: {message}")]
    ToolArgumentParse { tool_name: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Incomplete tool submission: missing {missing:?}, unexpected {unexpected:?}")]
    IncompleteToolSubmission {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Run failed: {}", reason.as_deref().unwrap_or("no reason given"))]
    RunFailed { reason: Option<String> },

    #[error("Run did not finish after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("Origin not allowed: {0}")]
    CorsRejected(String),

    #[error("Canceled")]
    Canceled,
}

impl EcoError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { .. }
            | Self::Network(_)
            | Self::Authentication(_)
            | Self::RateLimited { .. }
            | Self::Stream(_)
            | Self::Provider(_) => ErrorKind::ProviderTransport,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::ToolArgumentParse { .. } | Self::InvalidArgument(_) => ErrorKind::ToolArgument,
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::IncompleteToolSubmission { .. } => ErrorKind::IncompleteToolSubmission,
            Self::RunFailed { .. } => ErrorKind::RunFailed,
            Self::PollTimeout { .. } => ErrorKind::PollTimeout,
            Self::CorsRejected(_) => ErrorKind::CorsRejected,
            Self::Canceled => ErrorKind::Canceled,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EcoError>;
