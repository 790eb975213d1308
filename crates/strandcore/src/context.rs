use crate::node::NodeName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key under which the orchestrator stashes the serialized node
/// plan for the duration of a run. Removed before the context is returned.
pub const NODE_PLAN_KEY: &str = "nodes";

/// Outcome a node leaves behind in [`TaskContext::nodes`].
///
/// A node that can fail gracefully records `error` and returns normally so
/// the run continues; the caller inspects the marker afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub result: Option<Value>,
    pub error: Option<String>,
    /// Routing decision, recorded on router entries by the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<NodeName>,
}

impl NodeRecord {
    pub fn success(result: impl Into<Value>) -> Self {
        Self {
            result: Some(result.into()),
            error: None,
            next_node: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
            next_node: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Mutable carrier threaded through every node of one workflow run.
///
/// One instance exists per `Workflow::run` invocation; it is never shared
/// across runs. Nodes read prior results from `nodes` and write their own
/// entry before returning.
#[derive(Debug, Clone, Serialize)]
pub struct TaskContext<E> {
    /// Parsed input payload, opaque to the orchestrator.
    pub event: E,
    /// Per-node outcomes, keyed by node name, in visit order.
    pub nodes: IndexMap<NodeName, NodeRecord>,
    /// Workflow-scoped bookkeeping and node-set flags.
    pub metadata: IndexMap<String, Value>,
}

impl<E> TaskContext<E> {
    pub fn new(event: E) -> Self {
        Self {
            event,
            nodes: IndexMap::new(),
            metadata: IndexMap::new(),
        }
    }

    /// Record a successful outcome for `name`.
    pub fn record_result(&mut self, name: impl Into<NodeName>, result: impl Into<Value>) {
        self.nodes.insert(name.into(), NodeRecord::success(result));
    }

    /// Record a soft failure for `name`; the run continues.
    pub fn record_error(&mut self, name: impl Into<NodeName>, error: impl Into<String>) {
        self.nodes.insert(name.into(), NodeRecord::failure(error));
    }

    /// Replace the full record for `name`.
    pub fn update_node(&mut self, name: impl Into<NodeName>, record: NodeRecord) {
        self.nodes.insert(name.into(), record);
    }

    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.get(name)
    }

    /// Set a workflow-level flag for downstream nodes or response assembly.
    pub fn set_flag(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }
}

impl<E: Serialize> TaskContext<E> {
    /// JSON snapshot of the context with the transient node-plan entry
    /// stripped from `metadata`. Attached to tracing spans.
    pub fn snapshot(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(meta) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            meta.remove(NODE_PLAN_KEY);
        }
        value
    }
}
