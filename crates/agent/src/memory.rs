//! Agent memory: the ordered record of everything a run did.
//!
//! Memory is the single source of truth for what the model sees: every
//! model call rebuilds its conversation from these records via
//! [`AgentMemory::to_messages`]. Records are plain data and are yielded to
//! callers as the run progresses.

use chrono::{DateTime, Utc};
use codeloop_core::{ChatMessage, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AgentError;
use crate::run_loop::FinalAnswer;

/// Tool name recorded for every code execution.
pub const CODE_TOOL_NAME: &str = "python_interpreter";

const RETRY_NUDGE: &str = "\nNow let's retry: take care not to repeat previous errors! If you have retried several times, try a completely different approach.\n";

// ── Step records ──────────────────────────────────────────────────────────

/// The rendered system prompt. Lives outside the step list so a reset keeps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemPromptStep {
    pub system_prompt: String,
}

/// A task handed to the agent, either by the caller or from injected history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    pub task: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_images: Vec<String>,
}

impl TaskStep {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            task_images: Vec::new(),
        }
    }
}

/// A plan produced between action steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningStep {
    pub model_input_messages: Vec<ChatMessage>,
    pub plan: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<Usage>,
}

/// The record of one code execution, as shown back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallRecord {
    fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": self.arguments,
            }
        })
    }
}

/// One think → code → observe iteration.
#[derive(Debug, Clone)]
pub struct ActionStep {
    /// 1-based step number within the run.
    pub step_number: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub model_input_messages: Vec<ChatMessage>,
    pub model_output_message: Option<ChatMessage>,
    pub model_output: Option<String>,
    pub tool_call: Option<ToolCallRecord>,
    pub observations: Option<String>,
    pub observation_images: Vec<String>,
    pub action_output: Option<serde_json::Value>,
    pub error: Option<AgentError>,
    pub token_usage: Option<Usage>,
}

impl ActionStep {
    pub fn new(step_number: u32) -> Self {
        Self {
            step_number,
            start_time: Utc::now(),
            end_time: None,
            model_input_messages: Vec::new(),
            model_output_message: None,
            model_output: None,
            tool_call: None,
            observations: None,
            observation_images: Vec::new(),
            action_output: None,
            error: None,
            token_usage: None,
        }
    }

    /// Build a step that stands for an earlier assistant turn.
    pub fn from_history(content: impl Into<String>) -> Self {
        let content = content.into();
        let mut step = Self::new(0);
        step.model_output = Some(content.clone());
        step.action_output = Some(serde_json::Value::String(content));
        step.end_time = Some(step.start_time);
        step
    }

    pub(crate) fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// Wall-clock time spent on this step, once it has finished.
    pub fn duration(&self) -> Option<Duration> {
        let end = self.end_time?;
        (end - self.start_time).to_std().ok()
    }

    fn to_messages(&self, summary_mode: bool) -> Vec<ChatMessage> {
        let mut messages = Vec::new();

        if let Some(output) = &self.model_output
            && !summary_mode
        {
            messages.push(ChatMessage::assistant(output.trim()));
        }

        if let Some(call) = &self.tool_call {
            let calls = serde_json::Value::Array(vec![call.to_wire()]);
            messages.push(ChatMessage::assistant(format!("Calling tools:\n{calls}")));
        }

        if !self.observation_images.is_empty() {
            messages.push(
                ChatMessage::user("Here are the observed images:")
                    .with_images(self.observation_images.clone()),
            );
        }

        if let Some(observations) = &self.observations {
            messages.push(ChatMessage::tool_response(format!(
                "Observation:\n{observations}"
            )));
        }

        if let Some(error) = &self.error {
            let mut content = match &self.tool_call {
                Some(call) => format!("Call id: {}\n", call.id),
                None => String::new(),
            };
            content.push_str(&format!("Error:\n{error}{RETRY_NUDGE}"));
            messages.push(ChatMessage::tool_response(content));
        }

        messages
    }
}

/// The terminal record of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalAnswerStep {
    pub output: FinalAnswer,
}

/// Any record stored in memory.
#[derive(Debug, Clone)]
pub enum MemoryStep {
    Task(TaskStep),
    Planning(PlanningStep),
    Action(ActionStep),
    FinalAnswer(FinalAnswerStep),
}

impl From<TaskStep> for MemoryStep {
    fn from(step: TaskStep) -> Self {
        Self::Task(step)
    }
}

impl From<PlanningStep> for MemoryStep {
    fn from(step: PlanningStep) -> Self {
        Self::Planning(step)
    }
}

impl From<ActionStep> for MemoryStep {
    fn from(step: ActionStep) -> Self {
        Self::Action(step)
    }
}

impl From<FinalAnswerStep> for MemoryStep {
    fn from(step: FinalAnswerStep) -> Self {
        Self::FinalAnswer(step)
    }
}

impl MemoryStep {
    fn to_messages(&self, summary_mode: bool) -> Vec<ChatMessage> {
        match self {
            Self::Task(step) => vec![
                ChatMessage::user(format!("New task:\n{}", step.task))
                    .with_images(step.task_images.clone()),
            ],
            Self::Planning(step) if !summary_mode => vec![
                ChatMessage::assistant(step.plan.trim()),
                ChatMessage::user("Now proceed and carry out this plan."),
            ],
            Self::Planning(_) | Self::FinalAnswer(_) => Vec::new(),
            Self::Action(step) => step.to_messages(summary_mode),
        }
    }
}

// ── Memory ────────────────────────────────────────────────────────────────

/// Ordered step records plus the system prompt.
#[derive(Debug, Clone, Default)]
pub struct AgentMemory {
    pub system_prompt: SystemPromptStep,
    steps: Vec<MemoryStep>,
}

impl AgentMemory {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: SystemPromptStep {
                system_prompt: system_prompt.into(),
            },
            steps: Vec::new(),
        }
    }

    /// Drop every step; the system prompt stays.
    pub fn reset(&mut self) {
        self.steps.clear();
    }

    pub fn push(&mut self, step: impl Into<MemoryStep>) {
        self.steps.push(step.into());
    }

    pub fn steps(&self) -> &[MemoryStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn action_steps(&self) -> impl Iterator<Item = &ActionStep> {
        self.steps.iter().filter_map(|step| match step {
            MemoryStep::Action(action) => Some(action),
            _ => None,
        })
    }

    /// Rebuild the model conversation from memory.
    ///
    /// Summary mode leaves out the system prompt, model outputs, and plans,
    /// keeping tasks, tool calls, observations, and errors.
    pub fn to_messages(&self, summary_mode: bool) -> Vec<ChatMessage> {
        let mut messages = Vec::new();
        if !summary_mode {
            messages.push(ChatMessage::system(&self.system_prompt.system_prompt));
        }
        for step in &self.steps {
            messages.extend(step.to_messages(summary_mode));
        }
        messages
    }

    /// Token usage summed across every model call recorded in memory.
    pub fn token_usage(&self) -> Usage {
        let mut total = Usage::default();
        for step in &self.steps {
            let usage = match step {
                MemoryStep::Action(action) => action.token_usage,
                MemoryStep::Planning(planning) => planning.token_usage,
                _ => None,
            };
            if let Some(usage) = usage {
                total += usage;
            }
        }
        total
    }
}

/// Keep at most `max_chars` characters, cutting from the middle.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    let total = content.chars().count();
    if total <= max_chars {
        return content.to_string();
    }
    let half = max_chars / 2;
    let head: String = content.chars().take(half).collect();
    let tail: String = content.chars().skip(total - half).collect();
    format!(
        "{head}\n..._This content has been truncated to stay below {max_chars} characters_...\n{tail}"
    )
}
