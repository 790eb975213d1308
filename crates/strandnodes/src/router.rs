use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use strandcore::{Node, NodeError, NodeName, Router, TaskContext};

pub const FIELD_ROUTER: &str = "router.field";

/// Routes on a JSON-pointer value over the context snapshot via a
/// value → target table, with an optional fallback target.
///
/// ```ignore
/// FieldRouter::new("/event/action")
///     .when("summarize", "SummarizeNode")
///     .when("lookup", "LookupNode")
///     .or_else("UnknownRequestNode")
/// ```
pub struct FieldRouter {
    pointer: String,
    routes: HashMap<String, NodeName>,
    fallback: Option<NodeName>,
}

impl FieldRouter {
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            routes: HashMap::new(),
            fallback: None,
        }
    }

    /// Send the run to `target` when the routed value equals `value`.
    pub fn when(mut self, value: impl Into<String>, target: impl Into<NodeName>) -> Self {
        self.routes.insert(value.into(), target.into());
        self
    }

    /// Target when no table entry matches. Without one, an unmatched value
    /// terminates the run.
    pub fn or_else(mut self, target: impl Into<NodeName>) -> Self {
        self.fallback = Some(target.into());
        self
    }

    fn routed_value<E: Serialize>(&self, ctx: &TaskContext<E>) -> Option<String> {
        let snapshot = ctx.snapshot();
        let value = snapshot.pointer(&self.pointer)?;
        Some(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[async_trait]
impl<E> Node<E> for FieldRouter
where
    E: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        FIELD_ROUTER
    }

    async fn process(&self, mut ctx: TaskContext<E>) -> Result<TaskContext<E>, NodeError> {
        let value = self.routed_value(&ctx);
        ctx.record_result(FIELD_ROUTER, serde_json::json!({ "value": value }));
        Ok(ctx)
    }

    fn as_router(&self) -> Option<&dyn Router<E>> {
        Some(self)
    }
}

#[async_trait]
impl<E> Router<E> for FieldRouter
where
    E: Serialize + Send + Sync + 'static,
{
    async fn route(&self, ctx: &TaskContext<E>) -> Result<Option<NodeName>, NodeError> {
        let target = self
            .routed_value(ctx)
            .and_then(|value| self.routes.get(&value).cloned())
            .or_else(|| self.fallback.clone());
        Ok(target)
    }
}
