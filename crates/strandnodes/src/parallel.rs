use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::json;
use strandcore::{Node, NodeError, TaskContext};

pub const FAN_OUT_NODE: &str = "parallel.fan_out";

/// Runs its child nodes concurrently on clones of the context and merges
/// their records back in declared order, after its own entry.
///
/// Children must not depend on each other's records. A child error fails
/// the whole node (hard error).
pub struct FanOutNode<E: 'static> {
    children: Vec<Box<dyn Node<E>>>,
}

impl<E: 'static> FanOutNode<E> {
    pub fn new(children: Vec<Box<dyn Node<E>>>) -> Self {
        Self { children }
    }
}

#[async_trait]
impl<E> Node<E> for FanOutNode<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        FAN_OUT_NODE
    }

    async fn process(&self, mut ctx: TaskContext<E>) -> Result<TaskContext<E>, NodeError> {
        let child_names: Vec<String> = self
            .children
            .iter()
            .map(|child| child.name().to_string())
            .collect();
        tracing::info!(children = ?child_names, "fanning out");
        ctx.record_result(FAN_OUT_NODE, json!({ "children": child_names }));

        let branches =
            try_join_all(self.children.iter().map(|child| child.process(ctx.clone()))).await?;

        for branch in branches {
            for (name, record) in branch.nodes {
                ctx.nodes.entry(name).or_insert(record);
            }
        }
        Ok(ctx)
    }
}
