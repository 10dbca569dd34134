//! The code-writing agent loop: the heart of codeloop.
//!
//! An agent solves a task in a **think → code → observe** cycle:
//!
//! 1. **Rebuild** the conversation from memory (system prompt, task, past steps)
//! 2. **Generate** with the model, stopping at the end-of-code marker
//! 3. **Extract** the code block from the response ([`parser`])
//! 4. **Execute** it through the execution engine and record the observation
//! 5. **Repeat** until the code produces a final answer, the model answers
//!    in prose, the stop signal is set, or the step budget runs out
//!
//! Runs are exposed as a pull-based stream of step records ([`RunStream`]);
//! [`bridge::agent_run`] moves a run onto its own thread and streams its
//! observer events instead.

pub mod agent;
pub mod bridge;
pub mod error;
pub mod managed;
pub mod memory;
pub mod parser;
pub mod run_loop;
mod step;
mod syntax;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::{CodeAgent, RunOptions};
pub use bridge::{AgentFactory, AgentRunInfo, TOOL_SERVER_UNREACHABLE_MESSAGE, agent_run};
pub use error::AgentError;
pub use managed::ManagedAgent;
pub use memory::{
    ActionStep, AgentMemory, FinalAnswerStep, MemoryStep, PlanningStep, SystemPromptStep,
    TaskStep, ToolCallRecord, truncate_content,
};
pub use parser::{ParseError, extract_code, reformat_for_display};
pub use run_loop::{CANCELLATION_MARKER, FinalAnswer, RunStream, StepOutput};
pub use step::STOP_SEQUENCES;
pub use syntax::is_valid_script;
