//! Error types for pipeloop.

use thiserror::Error;

/// Primary error type for all agent-loop operations.
#[derive(Error, Debug)]
pub enum AgentError {
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

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Model error: {provider} — {message}")]
    Model { provider: String, message: String },

    #[error("Malformed model response: {0}")]
    Parse(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Not enough parameters provided for {tool}: expected {expected}, got {provided}")]
    Arity {
        tool: String,
        expected: usize,
        provided: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tool execution error: {tool_name} — {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Tool host error: {0}")]
    ToolHost(String),

    #[error("Run canceled")]
    Canceled,
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Model boundary failures: the round is re-attempted.
    Model,
    /// Malformed model output: the round is re-attempted.
    Parse,
    /// Dispatch or tool failures: reported to the model as an observation.
    Dispatch,
    /// Tool host unreachable: the run is aborted.
    ToolHost,
    Configuration,
    Canceled,
}

impl AgentError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a model backend error.
    pub fn model(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api { .. }
            | Self::Network(_)
            | Self::RateLimited { .. }
            | Self::Timeout(_)
            | Self::Model { .. }
            | Self::Serialization(_) => ErrorCategory::Model,
            Self::Parse(_) => ErrorCategory::Parse,
            Self::UnknownTool(_)
            | Self::Arity { .. }
            | Self::InvalidArgument(_)
            | Self::ToolExecution { .. } => ErrorCategory::Dispatch,
            Self::ToolHost(_) | Self::Io(_) => ErrorCategory::ToolHost,
            Self::Configuration(_) | Self::ConfigFile(_) | Self::Authentication(_) => {
                ErrorCategory::Configuration
            }
            Self::Canceled => ErrorCategory::Canceled,
        }
    }

    /// Whether the controller should re-attempt the same round.
    pub fn is_round_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Model | ErrorCategory::Parse)
    }

    /// Whether the error is fed back to the model as an observation.
    pub fn is_observable(&self) -> bool {
        self.category() == ErrorCategory::Dispatch
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AgentError>;
