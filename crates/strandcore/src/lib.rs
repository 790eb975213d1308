//! Core abstractions for the strand workflow engine
//!
//! This crate provides the fundamental types shared by the runtime and the
//! node library: the per-run [`TaskContext`], the [`Node`] and [`Router`]
//! traits, the declarative [`WorkflowSchema`], the error taxonomy, and the
//! execution event bus.

mod context;
mod error;
pub mod events;
mod node;
mod schema;

pub use context::{NodeRecord, TaskContext, NODE_PLAN_KEY};
pub use error::{NodeError, SchemaError, StrandError};
pub use events::{EventBus, ExecutionEvent, RunId};
pub use node::{Node, NodeName, Router};
pub use schema::{NodeConfig, WorkflowSchema};

/// Result type for orchestrator-level operations
pub type Result<T> = std::result::Result<T, StrandError>;
