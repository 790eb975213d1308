use async_trait::async_trait;
use serde::Serialize;
use strandcore::{Node, NodeError, TaskContext};
use strandruntime::NodeFactory;

pub const EXTRACT_NODE: &str = "transform.extract";

/// Copies a JSON-pointer value out of the context snapshot into this
/// node's own result.
///
/// Pointers address the whole context, so `/event/...` reaches the input
/// payload and `/nodes/<name>/result/...` reaches a prior node's record.
/// A missing pointer is a soft failure by default; `required()` turns it
/// into a hard error that aborts the run.
pub struct ExtractNode {
    pointer: String,
    required: bool,
}

impl ExtractNode {
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[async_trait]
impl<E> Node<E> for ExtractNode
where
    E: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        EXTRACT_NODE
    }

    async fn process(&self, mut ctx: TaskContext<E>) -> Result<TaskContext<E>, NodeError> {
        let extracted = ctx.snapshot().pointer(&self.pointer).cloned();
        match extracted {
            Some(value) => ctx.record_result(EXTRACT_NODE, value),
            None if self.required => {
                return Err(NodeError::MissingField(self.pointer.clone()));
            }
            None => {
                tracing::warn!(pointer = %self.pointer, "extract pointer not found");
                ctx.record_error(EXTRACT_NODE, format!("pointer not found: {}", self.pointer));
            }
        }
        Ok(ctx)
    }
}

pub struct ExtractNodeFactory;

impl<E> NodeFactory<E> for ExtractNodeFactory
where
    E: Serialize + Send + Sync + 'static,
{
    fn node_name(&self) -> &str {
        EXTRACT_NODE
    }

    fn create(&self) -> Box<dyn Node<E>> {
        // Default copies the parsed event itself.
        Box::new(ExtractNode::new("/event"))
    }
}
