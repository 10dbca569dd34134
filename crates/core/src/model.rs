//! ModelInvoker trait: the abstraction over LLM backends.
//!
//! A ModelInvoker takes the ordered conversation rebuilt from agent memory
//! plus a set of stop sequences, and returns one completion. Transport,
//! retries, and vendor specifics live behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::message::ChatMessage;

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

/// A complete response from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated message
    pub message: ChatMessage,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ModelResponse {
    /// Build a response with no usage information.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: ChatMessage::assistant(content),
            usage: None,
        }
    }
}

/// The core model trait.
///
/// The agent loop calls `invoke()` without knowing which backend answers it.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// A human-readable name for the backing model (e.g. "qwen-max").
    fn name(&self) -> &str;

    /// Generate one completion for `messages`, stopping at any of `stop_sequences`.
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        stop_sequences: &[String],
    ) -> std::result::Result<ModelResponse, ModelError>;
}
