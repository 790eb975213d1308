//! Workflow execution runtime
//!
//! Builds execution plans from declarative schemas, validates them against
//! an explicit node registry, and drives sequential node dispatch with
//! tracing spans and execution events.

mod registry;
mod validate;
mod workflow;

pub use registry::{NodeFactory, NodeRegistry};
pub use validate::WorkflowValidator;
pub use workflow::Workflow;
