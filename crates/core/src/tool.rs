//! Tool and capability abstractions.
//!
//! Tools are what the agent's generated code can call. A sub-agent can be
//! called the same way through [`Delegate`]. Both are resolved once, when
//! registered into a [`Toolbox`], into a [`Capability`] whose kind decides how
//! a call is dispatched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ToolError;

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (rendered into the system prompt).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn call(&self, arguments: serde_json::Value)
    -> std::result::Result<serde_json::Value, ToolError>;
}

/// An agent that can be handed a task by a parent agent.
#[async_trait]
pub trait Delegate: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the delegate on `task` and return its rendered report.
    async fn delegate(&self, task: &str) -> std::result::Result<String, ToolError>;
}

/// How a capability is dispatched.
#[derive(Clone)]
pub enum CapabilityKind {
    /// A tool implemented in-process.
    Local(Arc<dyn Tool>),
    /// A tool served by a remote tool server.
    Remote { server: String, tool: Arc<dyn Tool> },
    /// A managed sub-agent.
    Agent(Arc<dyn Delegate>),
}

/// A registered, resolved capability.
#[derive(Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub kind: CapabilityKind,
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("source", &self.source())
            .finish()
    }
}

impl Capability {
    /// Where this capability comes from ("local", "remote" or "agent").
    pub fn source(&self) -> &'static str {
        match self.kind {
            CapabilityKind::Local(_) => "local",
            CapabilityKind::Remote { .. } => "remote",
            CapabilityKind::Agent(_) => "agent",
        }
    }

    /// A serializable description, used when rendering prompts.
    pub fn descriptor(&self) -> CapabilityDescriptor {
        let inputs = match &self.kind {
            CapabilityKind::Local(tool) | CapabilityKind::Remote { tool, .. } => {
                tool.parameters_schema()
            }
            CapabilityKind::Agent(_) => serde_json::json!({
                "type": "object",
                "properties": {
                    "task": { "type": "string", "description": "The task to hand to the agent" }
                },
                "required": ["task"]
            }),
        };
        CapabilityDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            inputs,
            source: self.source().to_string(),
        }
    }

    /// Invoke the capability.
    ///
    /// Agents take `{"task": "..."}` and return their report as a JSON string.
    pub async fn invoke(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        match &self.kind {
            CapabilityKind::Local(tool) => tool.call(arguments).await,
            CapabilityKind::Remote { tool, .. } => tool.call(arguments).await,
            CapabilityKind::Agent(agent) => {
                let task = arguments
                    .get("task")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| {
                        ToolError::InvalidArguments(format!(
                            "agent '{}' expects a string 'task' argument",
                            self.name
                        ))
                    })?;
                let report = agent.delegate(task).await?;
                Ok(serde_json::Value::String(report))
            }
        }
    }
}

/// Serializable view of a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub inputs: serde_json::Value,
    pub source: String,
}

/// The set of capabilities available to an agent's generated code.
///
/// Ordered by name so rendered prompts are stable across runs.
#[derive(Clone, Default)]
pub struct Toolbox {
    capabilities: BTreeMap<String, Capability>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-process tool. Replaces any existing capability with the same name.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        self.insert(
            tool.name().to_string(),
            tool.description().to_string(),
            CapabilityKind::Local(tool),
        );
    }

    /// Register a tool served by `server`.
    pub fn register_remote_tool(&mut self, server: impl Into<String>, tool: Arc<dyn Tool>) {
        let server = server.into();
        self.insert(
            tool.name().to_string(),
            tool.description().to_string(),
            CapabilityKind::Remote { server, tool },
        );
    }

    /// Register a managed sub-agent.
    pub fn register_agent(&mut self, agent: Arc<dyn Delegate>) {
        self.insert(
            agent.name().to_string(),
            agent.description().to_string(),
            CapabilityKind::Agent(agent),
        );
    }

    fn insert(&mut self, name: String, description: String, kind: CapabilityKind) {
        self.capabilities.insert(
            name.clone(),
            Capability {
                name,
                description,
                kind,
            },
        );
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    /// Invoke a capability by name.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        let capability = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        capability.invoke(arguments).await
    }

    /// Descriptors of every non-agent capability.
    pub fn tool_descriptors(&self) -> Vec<CapabilityDescriptor> {
        self.capabilities
            .values()
            .filter(|c| !matches!(c.kind, CapabilityKind::Agent(_)))
            .map(Capability::descriptor)
            .collect()
    }

    /// Descriptors of every managed agent.
    pub fn agent_descriptors(&self) -> Vec<CapabilityDescriptor> {
        self.capabilities
            .values()
            .filter(|c| matches!(c.kind, CapabilityKind::Agent(_)))
            .map(Capability::descriptor)
            .collect()
    }

    /// List all registered capability names.
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }
        async fn call(
            &self,
            arguments: serde_json::Value,
        ) -> std::result::Result<serde_json::Value, ToolError> {
            Ok(arguments["text"].clone())
        }
    }

    struct UpperAgent;

    #[async_trait]
    impl Delegate for UpperAgent {
        fn name(&self) -> &str {
            "shouter"
        }
        fn description(&self) -> &str {
            "Shouts the task back"
        }
        async fn delegate(&self, task: &str) -> std::result::Result<String, ToolError> {
            Ok(task.to_uppercase())
        }
    }

    fn toolbox() -> Toolbox {
        let mut toolbox = Toolbox::new();
        toolbox.register_tool(Arc::new(EchoTool));
        toolbox.register_agent(Arc::new(UpperAgent));
        toolbox
    }

    #[test]
    fn descriptors_split_tools_and_agents() {
        let toolbox = toolbox();
        let tools = toolbox.tool_descriptors();
        let agents = toolbox.agent_descriptors();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
        assert_eq!(tools[0].source, "local");
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "shouter");
        assert_eq!(agents[0].inputs["required"][0], "task");
    }

    #[test]
    fn remote_tool_keeps_server() {
        let mut toolbox = Toolbox::new();
        toolbox.register_remote_tool("http://tools:5011", Arc::new(EchoTool));
        let cap = toolbox.get("echo").unwrap();
        assert_eq!(cap.source(), "remote");
        assert!(matches!(
            &cap.kind,
            CapabilityKind::Remote { server, .. } if server == "http://tools:5011"
        ));
    }

    #[tokio::test]
    async fn invoke_tool_and_agent() {
        let toolbox = toolbox();
        let echoed = toolbox
            .invoke("echo", serde_json::json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(echoed, "hello");

        let report = toolbox
            .invoke("shouter", serde_json::json!({"task": "quiet"}))
            .await
            .unwrap();
        assert_eq!(report, "QUIET");
    }

    #[tokio::test]
    async fn agent_requires_task_argument() {
        let err = toolbox()
            .invoke("shouter", serde_json::json!({"query": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn invoke_missing_capability() {
        let err = Toolbox::new()
            .invoke("nonexistent", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
