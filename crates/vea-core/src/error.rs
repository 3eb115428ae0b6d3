//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Tool-local failures (division by zero, a failed weather lookup) are not
/// represented here: they travel back to the model as failed tool results.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model requested a tool that is not in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments do not match the declared schema
    #[error("Invalid arguments for tool '{tool}': field '{field}' {reason}")]
    InvalidToolArguments {
        tool: String,
        field: String,
        reason: String,
    },

    /// A tool with the same name is already registered
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// Model backend unreachable or refusing requests
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Model backend answered with something we could not interpret
    #[error("Provider error: {0}")]
    Provider(String),

    /// A model or tool invocation exceeded its deadline
    #[error("{operation} timed out after {}s", .after.as_secs())]
    UpstreamTimeout { operation: String, after: Duration },

    /// Model kept requesting tools past the configured round cap
    #[error("Tool loop exceeded {0} rounds")]
    ToolLoopExceeded(usize),

    /// Transcript has unanswered or orphaned tool calls
    #[error("Malformed transcript: {0}")]
    MalformedTranscript(String),

    /// Agent is being rebuilt from fresh configuration
    #[error("Agent is reconfiguring")]
    Reconfiguring,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::UpstreamTimeout {
            operation: operation.into(),
            after,
        }
    }

    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable(_)
                | Self::UpstreamTimeout { .. }
                | Self::Reconfiguring
                | Self::Io(_)
        )
    }

    /// Stable machine-readable code for API responses
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::InvalidToolArguments { .. } => "INVALID_TOOL_ARGUMENTS",
            Self::DuplicateTool(_) => "DUPLICATE_TOOL",
            Self::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::UpstreamTimeout { .. } => "UPSTREAM_TIMEOUT",
            Self::ToolLoopExceeded(_) => "TOOL_LOOP_EXCEEDED",
            Self::MalformedTranscript(_) => "MALFORMED_TRANSCRIPT",
            Self::Reconfiguring => "RECONFIGURING",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) | Self::Json(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownTool(name) => format!("The model asked for a tool that is not available: '{name}'."),
            Self::InvalidToolArguments { tool, field, .. } => {
                format!("The model called '{tool}' with an invalid '{field}' argument.")
            }
            Self::ModelUnavailable(_) => "The AI model is currently unavailable. Please try again.".into(),
            Self::Provider(msg) => format!("The AI model returned an unexpected response: {msg}"),
            Self::UpstreamTimeout { operation, .. } => format!("The {operation} took too long to respond. Please try again."),
            Self::ToolLoopExceeded(_) => "The request needed too many tool calls. Please try a simpler query.".into(),
            Self::Reconfiguring => "The assistant is being reconfigured. Please retry in a moment.".into(),
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
