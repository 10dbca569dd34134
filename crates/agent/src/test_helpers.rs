//! Shared test helpers: scripted collaborators.

use async_trait::async_trait;
use codeloop_core::{
    ChatMessage, ExecutionEngine, ExecutionError, ExecutionOutcome, ModelError, ModelInvoker,
    ModelResponse, Namespace, StopSignal, Tool, ToolError, Usage,
};
use std::sync::Mutex;

/// A model that returns a sequence of scripted results.
///
/// Each call to `invoke` returns the next result in the queue and records the
/// messages it was given. Panics if more calls are made than results provided.
pub struct ScriptedModel {
    results: Vec<Result<ModelResponse, ModelError>>,
    inputs: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    pub fn from_results(results: Vec<Result<ModelResponse, ModelError>>) -> Self {
        Self {
            results,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Messages received by the `call`-th invocation (0-based).
    pub fn inputs(&self, call: usize) -> Vec<ChatMessage> {
        self.inputs.lock().unwrap()[call].clone()
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedModel {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn invoke(
        &self,
        messages: &[ChatMessage],
        _stop_sequences: &[String],
    ) -> Result<ModelResponse, ModelError> {
        let mut inputs = self.inputs.lock().unwrap();
        let call = inputs.len();
        if call >= self.results.len() {
            panic!(
                "ScriptedModel: no more responses (call #{}, have {})",
                call,
                self.results.len()
            );
        }
        inputs.push(messages.to_vec());
        self.results[call].clone()
    }
}

/// An execution engine that returns scripted outcomes and records the code it ran.
pub struct ScriptedExecutor {
    outcomes: Vec<Result<ExecutionOutcome, ExecutionError>>,
    repeat: bool,
    partial: Option<String>,
    stop_on_execute: Option<StopSignal>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(outcomes: Vec<Result<ExecutionOutcome, ExecutionError>>) -> Self {
        Self {
            outcomes,
            repeat: false,
            partial: None,
            stop_on_execute: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Return the same outcome for every call.
    pub fn always(outcome: Result<ExecutionOutcome, ExecutionError>) -> Self {
        Self {
            repeat: true,
            ..Self::new(vec![outcome])
        }
    }

    /// Print output reported after a failed execution.
    pub fn with_partial_output(mut self, partial: &str) -> Self {
        self.partial = Some(partial.to_string());
        self
    }

    /// Set `stop` whenever code runs, as a user pressing stop mid-step would.
    pub fn setting_on_execute(mut self, stop: StopSignal) -> Self {
        self.stop_on_execute = Some(stop);
        self
    }

    #[allow(dead_code)]
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionEngine for ScriptedExecutor {
    async fn execute(
        &self,
        code: &str,
        _namespace: &Namespace,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let mut executed = self.executed.lock().unwrap();
        let call = if self.repeat { 0 } else { executed.len() };
        executed.push(code.to_string());
        if let Some(stop) = &self.stop_on_execute {
            stop.set();
        }
        match self.outcomes.get(call) {
            Some(outcome) => outcome.clone(),
            None => panic!("ScriptedExecutor: no more outcomes (call #{call})"),
        }
    }

    fn partial_output(&self) -> Option<String> {
        self.partial.clone()
    }
}

/// A tool that returns its arguments.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the input back"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        Ok(arguments)
    }
}

/// A model response that runs `code`.
pub fn code_response(code: &str) -> ModelResponse {
    ModelResponse {
        message: ChatMessage::assistant(format!(
            "Thought: I will run some code.\n```<RUN>\n{code}\n```<END_CODE>"
        )),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

/// An execution outcome that ends the run with `value`.
pub fn final_outcome(value: serde_json::Value) -> ExecutionOutcome {
    ExecutionOutcome {
        output: Some(value),
        logs: String::new(),
        is_final_answer: true,
    }
}
