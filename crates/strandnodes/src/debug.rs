use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use strandcore::{Node, NodeError, TaskContext};
use strandruntime::NodeFactory;

pub const DEBUG_NODE: &str = "debug.log";

/// Logs the context and records a summary of the nodes visited so far.
pub struct DebugNode;

#[async_trait]
impl<E> Node<E> for DebugNode
where
    E: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        DEBUG_NODE
    }

    async fn process(&self, mut ctx: TaskContext<E>) -> Result<TaskContext<E>, NodeError> {
        let visited: Vec<String> = ctx.nodes.keys().cloned().collect();
        tracing::info!(?visited, context = %ctx.snapshot(), "debug checkpoint");
        ctx.record_result(DEBUG_NODE, json!({ "visited": visited }));
        Ok(ctx)
    }
}

pub struct DebugNodeFactory;

impl<E> NodeFactory<E> for DebugNodeFactory
where
    E: Serialize + Send + Sync + 'static,
{
    fn node_name(&self) -> &str {
        DEBUG_NODE
    }

    fn create(&self) -> Box<dyn Node<E>> {
        Box::new(DebugNode)
    }
}
