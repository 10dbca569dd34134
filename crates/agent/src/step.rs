//! The step engine: one think → code → observe iteration, plus planning
//! and the answer synthesized when the step budget runs out.

use chrono::Utc;
use codeloop_core::{ChatMessage, EventKind, Namespace};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::agent::CodeAgent;
use crate::error::AgentError;
use crate::memory::{ActionStep, CODE_TOOL_NAME, PlanningStep, ToolCallRecord, truncate_content};
use crate::parser::{END_CODE, extract_code, reformat_for_display};
use crate::run_loop::FinalAnswer;
use crate::templates::render;

/// Where the model should stop generating during an action step.
pub const STOP_SEQUENCES: [&str; 3] = [END_CODE, "Observation:", "Calling tools:"];

const END_PLAN: &str = "<end_plan>";

fn stop_sequences() -> Vec<String> {
    STOP_SEQUENCES.iter().map(|s| s.to_string()).collect()
}

/// How an output value reads inside an observation.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl CodeAgent {
    /// Run one action step, filling in `step` as it goes.
    ///
    /// Returns the final answer when the executed code produced one. A
    /// response without code comes back as [`AgentError::Parsing`] with the
    /// raw output already stored on `step`.
    pub(crate) async fn step(
        &mut self,
        step: &mut ActionStep,
    ) -> Result<Option<FinalAnswer>, AgentError> {
        self.observer.record(
            &self.name,
            EventKind::StepCount,
            step.step_number.to_string(),
        );

        let messages = self.memory.to_messages(false);
        step.model_input_messages = messages.clone();

        let response = self.model.invoke(&messages, &stop_sequences()).await?;
        step.token_usage = response.usage;

        let mut output = response.message.content;
        // The stop sequence swallows the end marker; put it back so the
        // model sees well-formed blocks in its own history.
        if output.trim_end().ends_with("```") {
            output.push_str(END_CODE);
        }
        debug!(agent = %self.name, step = step.step_number, "Model output received");
        self.observer
            .record(&self.name, EventKind::ModelOutput, output.clone());
        step.model_output_message = Some(ChatMessage::assistant(output.clone()));
        step.model_output = Some(output.clone());

        let code = extract_code(&output)?;
        step.tool_call = Some(ToolCallRecord {
            id: format!("call_{}", self.memory.len()),
            name: CODE_TOOL_NAME.into(),
            arguments: code.clone(),
        });
        self.observer
            .record(&self.name, EventKind::ParsedCode, code.clone());

        let namespace = Namespace::new(self.state.clone(), self.tools.clone());
        let max_chars = self.settings.max_output_chars;

        match self.executor.execute(&code, &namespace).await {
            Ok(outcome) => {
                let logs = truncate_content(&outcome.logs, max_chars);
                if !logs.is_empty() {
                    self.observer
                        .record(&self.name, EventKind::ExecutionLogs, logs.clone());
                }

                let mut observation = format!("Execution logs:\n{logs}");
                if let Some(value) = &outcome.output {
                    observation.push_str("Last output from code snippet:\n");
                    observation.push_str(&truncate_content(&display_value(value), max_chars));
                }
                step.observations = Some(observation);
                step.action_output = outcome.output.clone();

                if outcome.is_final_answer {
                    debug!(agent = %self.name, step = step.step_number, "Final answer produced");
                    return Ok(Some(FinalAnswer::from_value(
                        outcome.output.unwrap_or(Value::Null),
                    )));
                }
                Ok(None)
            }
            Err(err) => {
                if let Some(partial) = self.executor.partial_output()
                    && !partial.is_empty()
                {
                    let logs = truncate_content(&partial, max_chars);
                    self.observer
                        .record(&self.name, EventKind::ExecutionLogs, logs.clone());
                    step.observations = Some(format!("Execution logs:\n{logs}"));
                }
                if err.is_unauthorized_import() {
                    warn!(
                        agent = %self.name,
                        "Code tried a disallowed import; consider adding it to agent.authorized_imports"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Produce an initial plan (`is_first`) or an updated one.
    pub(crate) async fn planning_step(
        &mut self,
        is_first: bool,
        step_number: u32,
        max_steps: u32,
    ) -> Result<PlanningStep, AgentError> {
        let start_time = Utc::now();
        let tools = self.tools.tool_descriptors();
        let managed_agents = self.tools.agent_descriptors();
        let templates = &self.prompts.planning;

        let input = if is_first {
            let prompt = render(
                &templates.initial_plan,
                json!({ "task": self.task, "tools": tools, "managed_agents": managed_agents }),
            )?;
            vec![ChatMessage::user(prompt)]
        } else {
            let pre = render(
                &templates.update_plan_pre_messages,
                json!({ "task": self.task }),
            )?;
            let post = render(
                &templates.update_plan_post_messages,
                json!({
                    "task": self.task,
                    "tools": tools,
                    "managed_agents": managed_agents,
                    "remaining_steps": max_steps.saturating_sub(step_number),
                }),
            )?;
            let mut input = vec![ChatMessage::system(pre)];
            input.extend(self.memory.to_messages(false).into_iter().skip(1));
            input.push(ChatMessage::user(post));
            input
        };

        let response = self.model.invoke(&input, &[END_PLAN.to_string()]).await?;
        let content = response.message.content.trim();
        let plan = if is_first {
            format!(
                "Here are the facts I know and the plan of action that I will follow to solve the task:\n```\n{content}\n```"
            )
        } else {
            format!(
                "I still need to solve the task I was given:\n```\n{}\n```\n\nHere are the facts I know and my new/updated plan of action to solve the task:\n```\n{content}\n```",
                self.task
            )
        };

        self.observer
            .record(&self.name, EventKind::Planning, plan.clone());
        Ok(PlanningStep {
            model_input_messages: input,
            plan,
            start_time,
            end_time: Utc::now(),
            token_usage: response.usage,
        })
    }

    /// Ask the model for an answer from the memory transcript alone.
    ///
    /// Never fails: a model error becomes the answer text.
    pub(crate) async fn provide_final_answer(&self) -> FinalAnswer {
        let templates = &self.prompts.final_answer;
        let post = match render(&templates.post_messages, json!({ "task": self.task })) {
            Ok(post) => post,
            Err(e) => {
                return FinalAnswer::Text(format!("Error in generating final LLM output:\n{e}"));
            }
        };

        let mut messages = vec![ChatMessage::system(&templates.pre_messages)];
        messages.extend(self.memory.to_messages(false).into_iter().skip(1));
        messages.push(ChatMessage::user(post));

        match self.model.invoke(&messages, &[]).await {
            Ok(response) => FinalAnswer::Text(reformat_for_display(&response.message.content)),
            Err(e) => FinalAnswer::Text(format!("Error in generating final LLM output:\n{e}")),
        }
    }
}
