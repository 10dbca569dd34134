//! Error types for the codeloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all collaborator-facing operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Execution errors ---
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by a [`ModelInvoker`](crate::model::ModelInvoker).
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// Failures reported by an [`ExecutionEngine`](crate::executor::ExecutionEngine).
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("Code execution failed: {0}")]
    Runtime(String),

    #[error("Import of {module} is not allowed. Authorized imports are: {authorized:?}")]
    UnauthorizedImport {
        module: String,
        authorized: Vec<String>,
    },

    #[error("Code execution timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Code execution interrupted: {0}")]
    Interrupted(String),
}

impl ExecutionError {
    /// Whether this failure was caused by importing a module the sandbox does not allow.
    ///
    /// Engines that only report free-form messages are matched on the message text.
    pub fn is_unauthorized_import(&self) -> bool {
        match self {
            Self::UnauthorizedImport { .. } => true,
            Self::Runtime(msg) => msg.contains("Import of ") && msg.contains(" is not allowed"),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Couldn't connect to the tool server at {server}: {reason}")]
    ServerUnreachable { server: String, reason: String },
}
