use thiserror::Error;

/// Message shown to the user when neither the agent nor the direct fallback
/// produced an answer.
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "I'm experiencing technical difficulties. Please try again in a moment.";

/// Application-level errors surfaced to the caller
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String, cause: String },

    #[error("Resolution cancelled")]
    Cancelled,
}

impl AppError {
    /// Human-readable explanation suitable for showing in a chat transcript.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ServiceUnavailable { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Completion service errors
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Completion service unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of a single knowledge-source adapter call.
///
/// Never reaches the caller: the reasoning loop turns it into an observation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} request failed: {message}")]
    Http { tool: String, message: String },

    #[error("{tool} returned {status}: {message}")]
    Api {
        tool: String,
        status: u16,
        message: String,
    },

    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("{tool} returned an unreadable response: {message}")]
    InvalidResponse { tool: String, message: String },
}

/// Synthesizer step output that does not follow the step protocol.
///
/// Recovered inside the reasoning loop with a corrective observation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty response")]
    Empty,

    #[error("missing 'Action:' after 'Thought:'")]
    MissingAction,

    #[error("missing 'Action Input:' after 'Action:'")]
    MissingActionInput,

    #[error("response contains both a final answer and an action")]
    AmbiguousOutput,

    #[error("invalid tool '{name}'; choose from: {available}")]
    UnknownTool { name: String, available: String },
}

/// Terminal outcomes of the reasoning loop that the failure shield handles
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("No final answer after {max_steps} steps")]
    Exhaustion { max_steps: usize },

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthError),

    #[error("Resolution cancelled")]
    Cancelled,
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for completion service calls
pub type SynthResult<T> = Result<T, SynthError>;

/// Result type alias for adapter calls
pub type ToolResult<T> = Result<T, ToolError>;

/// Result type alias for the reasoning loop
pub type AgentResult<T> = Result<T, AgentError>;
