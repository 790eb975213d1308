use crate::{NodeError, TaskContext};
use async_trait::async_trait;

/// Registry key identifying a node implementation. Replaces the class
/// references a schema would otherwise have to carry.
pub type NodeName = String;

/// One atomic step in a workflow.
///
/// `process` is a state transition: it takes the accumulated context,
/// performs its work (pure computation or I/O), records its outcome under
/// its own name, and returns the context. A node that can fail gracefully
/// should record an error marker and return `Ok` so the run continues;
/// returning `Err` aborts the whole run.
#[async_trait]
pub trait Node<E>: Send + Sync {
    /// Registry key for this node. Fixed per implementation.
    fn name(&self) -> &str;

    async fn process(&self, ctx: TaskContext<E>) -> Result<TaskContext<E>, NodeError>;

    /// Route-capability hook. Routers return `Some(self)`; the validator
    /// uses this to check `is_router` flags against the registry.
    fn as_router(&self) -> Option<&dyn Router<E>> {
        None
    }
}

/// A node that selects the next node dynamically.
#[async_trait]
pub trait Router<E>: Node<E> {
    /// Name of the next node to run, or `None` to terminate the workflow.
    async fn route(&self, ctx: &TaskContext<E>) -> Result<Option<NodeName>, NodeError>;
}
