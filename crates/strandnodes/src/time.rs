use async_trait::async_trait;
use serde_json::json;
use strandcore::{Node, NodeError, TaskContext};
use strandruntime::NodeFactory;
use tokio::time::{sleep, Duration};

pub const DELAY_NODE: &str = "time.delay";

/// Sleeps for a fixed duration, then records how long it slept.
pub struct DelayNode {
    delay: Duration,
}

impl DelayNode {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for DelayNode {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

#[async_trait]
impl<E> Node<E> for DelayNode
where
    E: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        DELAY_NODE
    }

    async fn process(&self, mut ctx: TaskContext<E>) -> Result<TaskContext<E>, NodeError> {
        let delay_ms = self.delay.as_millis() as u64;
        tracing::info!(delay_ms, "delaying");
        sleep(self.delay).await;
        ctx.record_result(DELAY_NODE, json!({ "delayed_ms": delay_ms }));
        Ok(ctx)
    }
}

pub struct DelayNodeFactory;

impl<E> NodeFactory<E> for DelayNodeFactory
where
    E: Send + Sync + 'static,
{
    fn node_name(&self) -> &str {
        DELAY_NODE
    }

    fn create(&self) -> Box<dyn Node<E>> {
        Box::new(DelayNode::default())
    }
}
