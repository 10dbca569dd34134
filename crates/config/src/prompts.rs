//! Prompt templates.
//!
//! Templates use Jinja syntax and are rendered with strict undefined
//! handling by the agent crate. Every template has a built-in default so a
//! config file only needs to override the ones it changes.

use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = r#"You are an expert assistant who can solve any task using code blobs. You will be given a task to solve as best you can.
To do so, you have been given access to a list of tools: these tools are Python functions which you can call with code.
To solve the task, you must plan forward and proceed in a series of steps, in a cycle of 'Thought:', 'Code:', and 'Observation:' sequences.

At each step, in the 'Thought:' sequence, first explain your reasoning towards solving the task and the tools that you want to use.
Then in the 'Code:' sequence, write the code in simple Python. The code must be opened with '```<RUN>' and closed with '```<END_CODE>'.
During each intermediate step, you can use 'print()' to save whatever important information you will need next.
These print outputs will appear in the 'Observation:' field, which will be available as input for the next step.
In the end you have to return a final answer using the `final_answer` tool.
When you show code to the user without running it, open it with '```<DISPLAY:language>' and close it with '```<END_DISPLAY_CODE>'.

You can use the following tools:
{%- for tool in tools %}
- {{ tool.name }}: {{ tool.description }}
{%- endfor %}
{%- if managed_agents %}

You can also give tasks to team members. Call a team member with the argument 'task', a long string explaining your request.
{%- for agent in managed_agents %}
- {{ agent.name }}: {{ agent.description }}
{%- endfor %}
{%- endif %}

You can import from these modules: {{ authorized_imports | join(", ") }}

Now Begin!"#;

const INITIAL_PLAN: &str = r#"You are a world expert at analyzing a situation and planning accordingly towards solving a task.
Below is the task:
```
{{ task }}
```

First list the facts given in the task, the facts you still need to look up, and the facts you need to derive.
Then write a step-by-step high-level plan using the available tools:
{%- for tool in tools %}
- {{ tool.name }}: {{ tool.description }}
{%- endfor %}

After writing the final step of the plan, write '<end_plan>' and stop there."#;

const UPDATE_PLAN_PRE_MESSAGES: &str = r#"You are a world expert at analyzing a situation and planning accordingly towards solving a task.
You have been given the following task:
```
{{ task }}
```

Below you will find a history of attempts made to solve this task. Review it before writing an updated plan."#;

const UPDATE_PLAN_POST_MESSAGES: &str = r#"Now write your updated facts and plan, taking into account the history above.
You have {{ remaining_steps }} steps left.
After writing the final step of the plan, write '<end_plan>' and stop there."#;

const MANAGED_AGENT_TASK: &str = r#"You're a helpful agent named '{{ name }}'.
You have been submitted this task by your manager.
---
Task:
{{ task }}
---
You're helping your manager solve a wider task: do not provide a one-line answer, give as much information as possible so they have a clear understanding of the answer.
Put everything in your final_answer tool; anything you do not pass as an argument to final_answer will be lost."#;

const MANAGED_AGENT_REPORT: &str = r#"Here is the final answer from your managed agent '{{ name }}':
{{ final_answer }}"#;

const FINAL_ANSWER_PRE_MESSAGES: &str = r#"An agent tried to answer a user query but it got stuck and failed to do so. You are tasked with providing an answer instead. Here is the agent's memory:"#;

const FINAL_ANSWER_POST_MESSAGES: &str = r#"Based on the above, please provide an answer to the following user task:
{{ task }}"#;

/// All prompt templates used by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// Rendered once per run with `tools`, `managed_agents`, `authorized_imports`.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default)]
    pub planning: PlanningTemplates,

    #[serde(default)]
    pub managed_agent: ManagedAgentTemplates,

    #[serde(default)]
    pub final_answer: FinalAnswerTemplates,
}

fn default_system_prompt() -> String {
    SYSTEM_PROMPT.into()
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            planning: PlanningTemplates::default(),
            managed_agent: ManagedAgentTemplates::default(),
            final_answer: FinalAnswerTemplates::default(),
        }
    }
}

/// Templates for planning steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningTemplates {
    /// Variables: `task`, `tools`, `managed_agents`.
    #[serde(default = "default_initial_plan")]
    pub initial_plan: String,

    /// Variables: `task`.
    #[serde(default = "default_update_plan_pre")]
    pub update_plan_pre_messages: String,

    /// Variables: `task`, `tools`, `managed_agents`, `remaining_steps`.
    #[serde(default = "default_update_plan_post")]
    pub update_plan_post_messages: String,
}

fn default_initial_plan() -> String {
    INITIAL_PLAN.into()
}
fn default_update_plan_pre() -> String {
    UPDATE_PLAN_PRE_MESSAGES.into()
}
fn default_update_plan_post() -> String {
    UPDATE_PLAN_POST_MESSAGES.into()
}

impl Default for PlanningTemplates {
    fn default() -> Self {
        Self {
            initial_plan: default_initial_plan(),
            update_plan_pre_messages: default_update_plan_pre(),
            update_plan_post_messages: default_update_plan_post(),
        }
    }
}

/// Templates used when the agent runs as somebody else's sub-agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedAgentTemplates {
    /// Variables: `name`, `task`, plus every state variable.
    #[serde(default = "default_managed_task")]
    pub task: String,

    /// Variables: `name`, `final_answer`.
    #[serde(default = "default_managed_report")]
    pub report: String,
}

fn default_managed_task() -> String {
    MANAGED_AGENT_TASK.into()
}
fn default_managed_report() -> String {
    MANAGED_AGENT_REPORT.into()
}

impl Default for ManagedAgentTemplates {
    fn default() -> Self {
        Self {
            task: default_managed_task(),
            report: default_managed_report(),
        }
    }
}

/// Templates used to synthesize an answer once the step budget runs out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswerTemplates {
    #[serde(default = "default_final_pre")]
    pub pre_messages: String,

    /// Variables: `task`.
    #[serde(default = "default_final_post")]
    pub post_messages: String,
}

fn default_final_pre() -> String {
    FINAL_ANSWER_PRE_MESSAGES.into()
}
fn default_final_post() -> String {
    FINAL_ANSWER_POST_MESSAGES.into()
}

impl Default for FinalAnswerTemplates {
    fn default() -> Self {
        Self {
            pre_messages: default_final_pre(),
            post_messages: default_final_post(),
        }
    }
}
