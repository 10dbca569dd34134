//! Strict Jinja rendering for prompt templates.
//!
//! A variable the template references but the context lacks is an error,
//! never an empty string.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::AgentError;

/// Render `template` against `context`.
pub fn render(template: &str, context: impl Serialize) -> Result<String, AgentError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Ok(env.render_str(template, context)?)
}
