//! The code-writing agent.
//!
//! A [`CodeAgent`] owns its memory and state, and borrows a model, an
//! execution engine, and a toolbox. Runs are started with [`CodeAgent::run`]
//! (answer only), [`CodeAgent::run_stream`] (every step as it happens), or
//! [`CodeAgent::run_with_observer`] (answer plus observer events, the way the
//! streaming bridge drives it).

use codeloop_config::{AgentSettings, PromptTemplates};
use codeloop_core::{
    ChatMessage, EventKind, ExecutionEngine, ModelInvoker, Observer, Role, StopSignal, Tool,
    Toolbox,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::managed::ManagedAgent;
use crate::memory::{ActionStep, AgentMemory, TaskStep};
use crate::parser::reformat_for_display;
use crate::run_loop::{FinalAnswer, RunStream, StepOutput};
use crate::templates::render;

/// Per-run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Clear memory before the run. Turn off to continue a conversation.
    pub reset: bool,
    /// Overrides the agent's configured step budget for this run.
    pub max_steps: Option<u32>,
    /// Images attached to the task.
    pub images: Vec<String>,
    /// Extra variables made visible to the generated code.
    pub additional_args: Map<String, Value>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            reset: true,
            max_steps: None,
            images: Vec::new(),
            additional_args: Map::new(),
        }
    }
}

impl RunOptions {
    /// Options that keep memory from earlier runs.
    pub fn continuing() -> Self {
        Self {
            reset: false,
            ..Self::default()
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// An agent that solves tasks by writing and running code.
pub struct CodeAgent {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) model: Arc<dyn ModelInvoker>,
    pub(crate) executor: Arc<dyn ExecutionEngine>,
    pub(crate) tools: Toolbox,
    pub(crate) observer: Arc<Observer>,
    pub(crate) stop: StopSignal,
    pub(crate) prompts: PromptTemplates,
    pub(crate) settings: AgentSettings,
    pub(crate) state: Map<String, Value>,
    pub(crate) memory: AgentMemory,
    pub(crate) task: String,
}

impl CodeAgent {
    /// Create an agent with default settings, prompts, and a private observer.
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn ModelInvoker>,
        executor: Arc<dyn ExecutionEngine>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            model,
            executor,
            tools: Toolbox::new(),
            observer: Arc::new(Observer::new()),
            stop: StopSignal::new(),
            prompts: PromptTemplates::default(),
            settings: AgentSettings::default(),
            state: Map::new(),
            memory: AgentMemory::default(),
            task: String::new(),
        }
    }

    /// Set the description a manager sees for this agent.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the toolbox.
    pub fn with_tools(mut self, tools: Toolbox) -> Self {
        self.tools = tools;
        self
    }

    /// Register one local tool.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.register_tool(tool);
        self
    }

    /// Register a sub-agent, callable from code by its name.
    pub fn with_managed_agent(mut self, agent: ManagedAgent) -> Self {
        self.tools.register_agent(Arc::new(agent));
        self
    }

    /// Share an observer, typically with a streaming bridge and sub-agents.
    pub fn with_observer(mut self, observer: Arc<Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptTemplates) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Seed state variables visible to generated code.
    pub fn with_state(mut self, state: Map<String, Value>) -> Self {
        self.state = state;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    pub fn tools(&self) -> &Toolbox {
        &self.tools
    }

    pub fn observer(&self) -> &Arc<Observer> {
        &self.observer
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Render the system prompt from the current toolbox.
    pub fn system_prompt(&self) -> Result<String, AgentError> {
        render(
            &self.prompts.system_prompt,
            json!({
                "tools": self.tools.tool_descriptors(),
                "managed_agents": self.tools.agent_descriptors(),
                "authorized_imports": self.settings.authorized_imports,
            }),
        )
    }

    /// Replay an earlier conversation into memory.
    ///
    /// User turns become tasks, assistant turns become completed steps.
    /// Follow with a run whose options have `reset: false`, or the history
    /// is cleared again.
    pub fn add_history(&mut self, history: &[ChatMessage]) {
        for message in history {
            match message.role {
                Role::User => self.memory.push(TaskStep::new(&message.content)),
                Role::Assistant => self.memory.push(ActionStep::from_history(&message.content)),
                Role::System | Role::ToolResponse => {}
            }
        }
        debug!(agent = %self.name, turns = history.len(), "History added to memory");
    }

    /// Start a run and return the stream of its records.
    pub fn run_stream(
        &mut self,
        task: &str,
        options: RunOptions,
    ) -> Result<RunStream<'_>, AgentError> {
        let max_steps = options.max_steps.unwrap_or(self.settings.max_steps);

        let mut task = task.to_string();
        if !options.additional_args.is_empty() {
            let args = Value::Object(options.additional_args.clone());
            self.state.extend(options.additional_args);
            task.push_str(&format!(
                "\nYou have been provided with these additional arguments, that you can access using the keys as variables in your python code:\n{args}."
            ));
        }
        self.task = task;

        let system_prompt = self.system_prompt()?;
        self.memory.system_prompt.system_prompt = system_prompt;
        if options.reset {
            self.memory.reset();
        }
        self.memory.push(TaskStep {
            task: self.task.clone(),
            task_images: options.images,
        });

        info!(agent = %self.name, max_steps, "Agent run starting");
        self.observer
            .record(&self.name, EventKind::AgentNewRun, self.task.clone());

        Ok(RunStream::new(self, max_steps))
    }

    /// Run to completion and return the final answer.
    pub async fn run(&mut self, task: &str, options: RunOptions) -> Result<FinalAnswer, AgentError> {
        let mut stream = self.run_stream(task, options)?;
        let mut answer = None;
        while let Some(output) = stream.next().await {
            if let StepOutput::Final(step) = output {
                answer = Some(step.output);
            }
        }
        answer.ok_or_else(|| AgentError::Internal("run ended without a final answer".into()))
    }

    /// Run to completion, reporting step errors and the final answer to the
    /// observer.
    ///
    /// The final answer is recorded exactly once, reformatted for display.
    pub async fn run_with_observer(
        &mut self,
        task: &str,
        options: RunOptions,
    ) -> Result<FinalAnswer, AgentError> {
        let observer = self.observer.clone();
        let name = self.name.clone();

        let mut stream = self.run_stream(task, options)?;
        let mut answer = None;
        while let Some(output) = stream.next().await {
            match output {
                StepOutput::Action(step) => {
                    if let Some(error) = &step.error {
                        observer.record(&name, EventKind::Error, error.to_string());
                    }
                }
                StepOutput::Final(step) => answer = Some(step.output),
                StepOutput::Planning(_) => {}
            }
        }

        let answer =
            answer.ok_or_else(|| AgentError::Internal("run ended without a final answer".into()))?;
        observer.record(
            &name,
            EventKind::FinalAnswer,
            reformat_for_display(&answer.to_string()),
        );
        Ok(answer)
    }
}
