//! ExecutionEngine trait: the sandbox that runs model-written code.
//!
//! The agent hands the engine a code string plus the [`Namespace`] the code
//! may reference (state variables and callable capabilities) and gets back
//! the last value, the captured print output, and whether the code called
//! the final-answer function.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;
use crate::tool::Toolbox;

/// Everything a code snippet can see: variables and capabilities.
#[derive(Clone, Default)]
pub struct Namespace {
    /// State variables, visible to code under their key names.
    pub variables: serde_json::Map<String, serde_json::Value>,

    /// Tools and managed agents callable from code.
    pub tools: Toolbox,
}

impl Namespace {
    pub fn new(variables: serde_json::Map<String, serde_json::Value>, tools: Toolbox) -> Self {
        Self { variables, tools }
    }
}

/// The result of running one code snippet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Value of the last expression, or the final answer.
    pub output: Option<serde_json::Value>,

    /// Captured print output.
    pub logs: String,

    /// Whether the snippet produced the run's final answer.
    pub is_final_answer: bool,
}

/// The core execution trait.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Run `code` against `namespace`.
    async fn execute(
        &self,
        code: &str,
        namespace: &Namespace,
    ) -> std::result::Result<ExecutionOutcome, ExecutionError>;

    /// Print output captured by the most recent `execute` before it failed.
    ///
    /// Only meaningful right after `execute` returned an error.
    fn partial_output(&self) -> Option<String> {
        None
    }
}
