//! Progress events and the observer that buffers them.
//!
//! The run thread records events as it goes; a consumer on another thread
//! drains them in batches. The buffer is the only channel between the two,
//! so `drain` takes everything recorded so far and leaves the buffer empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// What an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new step started; payload is the step number.
    StepCount,
    /// Raw text generated by the model for the current step.
    ModelOutput,
    /// Code extracted from the model output, about to run.
    ParsedCode,
    /// Print output captured while running code.
    ExecutionLogs,
    /// A plan or plan update.
    Planning,
    /// A step-level error.
    Error,
    /// The run's final answer.
    FinalAnswer,
    /// An agent started a run; payload is the task.
    AgentNewRun,
    /// A managed agent finished; payload is its report.
    AgentFinish,
    /// Progress reported by a tool while it runs.
    ToolProgress,
}

impl EventKind {
    /// Wire name for this event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StepCount => "step_count",
            Self::ModelOutput => "model_output",
            Self::ParsedCode => "parsed_code",
            Self::ExecutionLogs => "execution_logs",
            Self::Planning => "planning",
            Self::Error => "error",
            Self::FinalAnswer => "final_answer",
            Self::AgentNewRun => "agent_new_run",
            Self::AgentFinish => "agent_finish",
            Self::ToolProgress => "tool_progress",
        }
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Name of the agent (or tool) that produced the event; empty for the runtime itself.
    pub source: String,

    #[serde(rename = "type")]
    pub kind: EventKind,

    pub payload: String,

    pub timestamp: DateTime<Utc>,
}

/// Append-only, thread-safe event buffer with drain-and-clear semantics.
#[derive(Debug, Default)]
pub struct Observer {
    buffer: Mutex<Vec<AgentEvent>>,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<AgentEvent>> {
        self.buffer.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Observer buffer lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Record an event. Never fails.
    pub fn record(&self, source: &str, kind: EventKind, payload: impl Into<String>) {
        let event = AgentEvent {
            source: source.to_string(),
            kind,
            payload: payload.into(),
            timestamp: Utc::now(),
        };
        self.buffer().push(event);
    }

    /// Take every buffered event, oldest first.
    pub fn drain(&self) -> Vec<AgentEvent> {
        std::mem::take(&mut *self.buffer())
    }

    /// Number of events waiting to be drained.
    pub fn pending(&self) -> usize {
        self.buffer().len()
    }
}
