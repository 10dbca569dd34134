//! # codeloop core
//!
//! Domain types, collaborator traits, and error definitions for the codeloop
//! agent runtime. This crate has **no runtime dependencies** beyond serde and
//! error plumbing: it defines the boundary the agent loop is written against.
//!
//! ## Collaborators
//!
//! The agent loop never talks to a vendor directly. It consumes:
//! - a [`ModelInvoker`] that turns messages into a completion
//! - an [`ExecutionEngine`] that runs generated code against a [`Namespace`]
//! - an [`Observer`] that buffers progress events for a streaming consumer
//! - a [`StopSignal`] that requests cooperative cancellation

pub mod error;
pub mod event;
pub mod executor;
pub mod message;
pub mod model;
pub mod stop;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ExecutionError, ModelError, Result, ToolError};
pub use event::{AgentEvent, EventKind, Observer};
pub use executor::{ExecutionEngine, ExecutionOutcome, Namespace};
pub use message::{ChatMessage, Role, RunId};
pub use model::{ModelInvoker, ModelResponse, Usage};
pub use stop::StopSignal;
pub use tool::{Capability, CapabilityDescriptor, CapabilityKind, Delegate, Tool, Toolbox};
