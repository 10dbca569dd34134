//! The run loop: drives steps until an answer, a stop, or the step budget.
//!
//! A run is pulled, not pushed: [`RunStream::next`] advances the agent just
//! far enough to produce the next record, so a caller sees every planning
//! step and action step as soon as it exists, followed by exactly one
//! [`FinalAnswerStep`].

use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, warn};

use crate::agent::CodeAgent;
use crate::error::AgentError;
use crate::memory::{ActionStep, FinalAnswerStep, PlanningStep};
use crate::parser::reformat_for_display;

/// Final answer reported when a run was stopped from outside.
pub const CANCELLATION_MARKER: &str = "<user_break>";

/// What a run ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalAnswer {
    /// Text, already reformatted for display.
    Text(String),
    /// A non-text value produced by the final-answer function.
    Structured(Value),
    /// The stop signal was set.
    Interrupted,
}

impl FinalAnswer {
    /// Wrap a value produced by executed code.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(reformat_for_display(&text)),
            other => Self::Structured(other),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// The answer as a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Structured(value) => value.clone(),
            Self::Interrupted => Value::String(CANCELLATION_MARKER.into()),
        }
    }
}

impl fmt::Display for FinalAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(value) => write!(f, "{value}"),
            Self::Interrupted => f.write_str(CANCELLATION_MARKER),
        }
    }
}

/// One record yielded by a run.
#[derive(Debug, Clone)]
pub enum StepOutput {
    Planning(PlanningStep),
    Action(ActionStep),
    Final(FinalAnswerStep),
}

/// A run in progress. Borrows the agent for the run's duration.
pub struct RunStream<'a> {
    agent: &'a mut CodeAgent,
    max_steps: u32,
    step_number: u32,
    final_answer: Option<FinalAnswer>,
    pending: VecDeque<StepOutput>,
    finished: bool,
}

impl<'a> RunStream<'a> {
    pub(crate) fn new(agent: &'a mut CodeAgent, max_steps: u32) -> Self {
        Self {
            agent,
            max_steps,
            step_number: 1,
            final_answer: None,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Advance the run to its next record. `None` once the final answer has
    /// been yielded.
    pub async fn next(&mut self) -> Option<StepOutput> {
        loop {
            if let Some(output) = self.pending.pop_front() {
                return Some(output);
            }
            if self.finished {
                return None;
            }

            let keep_going = self.final_answer.is_none()
                && self.step_number <= self.max_steps
                && !self.agent.stop.is_set();

            if keep_going {
                self.run_iteration().await;
            } else {
                self.finish().await;
            }
        }
    }

    /// Drive the run to completion and return every record it produced.
    pub async fn collect(mut self) -> Vec<StepOutput> {
        let mut outputs = Vec::new();
        while let Some(output) = self.next().await {
            outputs.push(output);
        }
        outputs
    }

    /// Number of the step that will run next.
    pub fn step_number(&self) -> u32 {
        self.step_number
    }

    fn planning_due(&self) -> bool {
        match self.agent.settings.planning_interval {
            Some(interval) if interval > 0 => {
                self.step_number == 1 || (self.step_number - 1) % interval == 0
            }
            _ => false,
        }
    }

    async fn run_iteration(&mut self) {
        let mut action_step = ActionStep::new(self.step_number);

        let result = match self.plan_if_due().await {
            Ok(()) => self.agent.step(&mut action_step).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(answer) => self.final_answer = answer,
            Err(AgentError::Parsing(_)) => {
                // No code in the output: the output itself is the answer.
                let text = action_step.model_output.as_deref().unwrap_or_default();
                self.final_answer = Some(FinalAnswer::Text(reformat_for_display(text)));
            }
            Err(e) => {
                warn!(
                    agent = %self.agent.name,
                    step = self.step_number,
                    error = %e,
                    "Step failed"
                );
                action_step.error = Some(e);
            }
        }

        action_step.finish();
        self.agent.memory.push(action_step.clone());
        self.pending.push_back(StepOutput::Action(action_step));
        self.step_number += 1;
    }

    async fn plan_if_due(&mut self) -> Result<(), AgentError> {
        if !self.planning_due() {
            return Ok(());
        }
        let planning = self
            .agent
            .planning_step(self.step_number == 1, self.step_number, self.max_steps)
            .await?;
        self.agent.memory.push(planning.clone());
        self.pending.push_back(StepOutput::Planning(planning));
        Ok(())
    }

    async fn finish(&mut self) {
        let output = if self.agent.stop.is_set() {
            info!(agent = %self.agent.name, "Run interrupted by stop signal");
            FinalAnswer::Interrupted
        } else if let Some(answer) = self.final_answer.take() {
            answer
        } else {
            warn!(
                agent = %self.agent.name,
                max_steps = self.max_steps,
                "Reached max steps without a final answer"
            );
            let answer = self.agent.provide_final_answer().await;
            let mut exhausted = ActionStep::new(self.step_number);
            exhausted.error = Some(AgentError::MaxSteps(self.max_steps));
            exhausted.action_output = Some(answer.to_value());
            exhausted.finish();
            self.agent.memory.push(exhausted);
            answer
        };

        debug!(
            agent = %self.agent.name,
            steps = self.step_number - 1,
            total_tokens = self.agent.memory.token_usage().total_tokens,
            "Run finished"
        );

        let step = FinalAnswerStep { output };
        self.agent.memory.push(step.clone());
        self.pending.push_back(StepOutput::Final(step));
        self.finished = true;
    }
}
