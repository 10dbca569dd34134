//! Managed agents: a [`CodeAgent`] callable by a parent agent's code.
//!
//! The parent sees a capability that takes a task string and returns a
//! report. Calling it wraps the task in the sub-agent's task template, runs
//! the sub-agent to completion, and renders its answer through the report
//! template, optionally followed by a transcript of the sub-agent's work.

use async_trait::async_trait;
use codeloop_core::{Delegate, EventKind, ToolError};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::agent::{CodeAgent, RunOptions};
use crate::error::AgentError;
use crate::memory::truncate_content;
use crate::run_loop::FinalAnswer;
use crate::templates::render;

/// A sub-agent wrapper. One call runs at a time.
pub struct ManagedAgent {
    name: String,
    description: String,
    agent: Mutex<CodeAgent>,
}

impl ManagedAgent {
    pub fn new(agent: CodeAgent) -> Self {
        Self {
            name: agent.name.clone(),
            description: agent.description.clone(),
            agent: Mutex::new(agent),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the sub-agent on `task` and return its rendered report.
    pub async fn call(&self, task: &str, options: RunOptions) -> Result<String, AgentError> {
        let mut agent = self
            .agent
            .try_lock()
            .map_err(|_| AgentError::AgentBusy(self.name.clone()))?;

        let mut variables = agent.state.clone();
        variables.insert("name".into(), Value::String(self.name.clone()));
        variables.insert("task".into(), Value::String(task.to_string()));
        let full_task = render(&agent.prompts.managed_agent.task, &variables)?;

        info!(agent = %self.name, "Managed agent received a task");
        let answer = agent.run(&full_task, options).await?;
        let report = report_text(&answer);

        agent
            .observer
            .record(&self.name, EventKind::AgentFinish, report.clone());

        let mut output = render(
            &agent.prompts.managed_agent.report,
            json!({ "name": self.name, "final_answer": report }),
        )?;

        if agent.settings.provide_run_summary {
            let max_chars = agent.settings.max_output_chars;
            output.push_str(
                "\n\nFor more detail, find below a summary of this agent's work:\n<summary_of_work>\n",
            );
            for message in agent.memory.to_messages(true) {
                output.push('\n');
                output.push_str(&truncate_content(&message.content, max_chars));
                output.push_str("\n---");
            }
            output.push_str("\n</summary_of_work>");
        }

        debug!(agent = %self.name, chars = output.len(), "Managed agent report ready");
        Ok(output)
    }
}

/// The sub-agent's answer as plain text; empty when it cannot be serialized.
fn report_text(answer: &FinalAnswer) -> String {
    match answer {
        FinalAnswer::Structured(value) => serde_json::to_string(value).unwrap_or_default(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Delegate for ManagedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn delegate(&self, task: &str) -> Result<String, ToolError> {
        self.call(task, RunOptions::default())
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedExecutor, ScriptedModel, code_response, final_outcome};
    use codeloop_config::{AgentSettings, PromptTemplates};
    use codeloop_core::{Observer, Toolbox};
    use std::sync::Arc;

    fn sub_agent(answer: &str, settings: AgentSettings) -> CodeAgent {
        let model = ScriptedModel::new(vec![code_response(&format!("final_answer('{answer}')"))]);
        let executor = ScriptedExecutor::new(vec![Ok(final_outcome(json!(answer)))]);
        CodeAgent::new("researcher", Arc::new(model), Arc::new(executor))
            .with_description("Finds facts")
            .with_settings(settings)
    }

    #[tokio::test]
    async fn report_wraps_answer() {
        let managed = ManagedAgent::new(sub_agent("Tokyo", AgentSettings::default()));
        let report = managed
            .call("find X", RunOptions::default())
            .await
            .unwrap();
        assert_eq!(
            report,
            "Here is the final answer from your managed agent 'researcher':\nTokyo"
        );
    }

    #[tokio::test]
    async fn task_template_sees_name_and_task() {
        let managed = ManagedAgent::new(sub_agent("ok", AgentSettings::default()));
        managed.call("find X", RunOptions::default()).await.unwrap();

        let agent = managed.agent.lock().await;
        let crate::memory::MemoryStep::Task(task) = &agent.memory().steps()[0] else {
            panic!("expected task step");
        };
        assert!(task.task.contains("named 'researcher'"));
        assert!(task.task.contains("find X"));
    }

    #[tokio::test]
    async fn run_summary_is_appended() {
        let settings = AgentSettings {
            provide_run_summary: true,
            ..AgentSettings::default()
        };
        let managed = ManagedAgent::new(sub_agent("Tokyo", settings));
        let report = managed
            .call("find X", RunOptions::default())
            .await
            .unwrap();

        assert!(report.starts_with("Here is the final answer from your managed agent 'researcher':\nTokyo"));
        assert!(report.contains("<summary_of_work>"));
        assert!(report.ends_with("\n</summary_of_work>"));
        assert!(report.contains("New task:"));
        assert!(report.contains("\n---"));
        // Summary mode leaves out the system prompt.
        assert!(!report.contains("You are an expert assistant"));
    }

    #[tokio::test]
    async fn finish_event_is_recorded() {
        let observer = Arc::new(Observer::new());
        let agent = sub_agent("Tokyo", AgentSettings::default()).with_observer(observer.clone());
        let managed = ManagedAgent::new(agent);
        managed.call("find X", RunOptions::default()).await.unwrap();

        let events = observer.drain();
        let finish = events
            .iter()
            .find(|e| e.kind == EventKind::AgentFinish)
            .unwrap();
        assert_eq!(finish.source, "researcher");
        assert_eq!(finish.payload, "Tokyo");
    }

    #[tokio::test]
    async fn structured_answers_are_serialized() {
        let model = ScriptedModel::new(vec![code_response("final_answer({'a': 1})")]);
        let executor = ScriptedExecutor::new(vec![Ok(final_outcome(json!({"a": 1})))]);
        let agent = CodeAgent::new("calc", Arc::new(model), Arc::new(executor));
        let report = ManagedAgent::new(agent)
            .call("compute", RunOptions::default())
            .await
            .unwrap();
        assert!(report.ends_with(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn bad_task_template_is_an_error() {
        let mut prompts = PromptTemplates::default();
        prompts.managed_agent.task = "{{ name }} {{ missing }}".into();
        let agent = sub_agent("x", AgentSettings::default()).with_prompts(prompts);
        let err = ManagedAgent::new(agent)
            .call("t", RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Template(_)));
    }

    #[tokio::test]
    async fn callable_through_toolbox() {
        let mut toolbox = Toolbox::new();
        toolbox.register_agent(Arc::new(ManagedAgent::new(sub_agent(
            "Tokyo",
            AgentSettings::default(),
        ))));

        let descriptors = toolbox.agent_descriptors();
        assert_eq!(descriptors[0].name, "researcher");
        assert_eq!(descriptors[0].description, "Finds facts");

        let result = toolbox
            .invoke("researcher", json!({"task": "capital of Japan"}))
            .await
            .unwrap();
        assert!(result.as_str().unwrap().ends_with("Tokyo"));
    }
}
