//! Agent-level errors.
//!
//! Step failures are recorded on the step that produced them and the run
//! moves on; only setup failures (a template that will not render, an agent
//! that cannot be built) escape a run.

use codeloop_core::{ExecutionError, ModelError, ToolError};
use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The model answered without a code block.
    #[error(transparent)]
    Parsing(#[from] ParseError),

    #[error("Error in generating model output:\n{0}")]
    Generation(#[from] ModelError),

    #[error("Error executing code: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Reached max steps ({0}) without a final answer")]
    MaxSteps(u32),

    #[error("Couldn't connect to the remote tool server: {0}")]
    ToolServerUnreachable(String),

    #[error("Tool error: {0}")]
    Tool(ToolError),

    #[error("Agent '{0}' is already running")]
    AgentBusy(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ToolError> for AgentError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::ServerUnreachable { server, reason } => {
                Self::ToolServerUnreachable(format!("{server}: {reason}"))
            }
            other => Self::Tool(other),
        }
    }
}

impl From<minijinja::Error> for AgentError {
    fn from(err: minijinja::Error) -> Self {
        Self::Template(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_unreachable_maps_to_dedicated_variant() {
        let err: AgentError = ToolError::ServerUnreachable {
            server: "http://tools:5011/sse".into(),
            reason: "timed out".into(),
        }
        .into();
        assert!(matches!(err, AgentError::ToolServerUnreachable(ref s) if s.contains("tools:5011")));
    }

    #[test]
    fn other_tool_errors_stay_tool_errors() {
        let err: AgentError = ToolError::NotFound("search".into()).into();
        assert!(matches!(err, AgentError::Tool(ToolError::NotFound(_))));
    }

    #[test]
    fn generation_error_wraps_cause() {
        let err = AgentError::from(ModelError::Timeout("30s".into()));
        let text = err.to_string();
        assert!(text.starts_with("Error in generating model output"));
        assert!(text.contains("30s"));
    }
}
