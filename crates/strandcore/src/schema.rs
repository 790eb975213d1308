use crate::node::NodeName;
use serde::{Deserialize, Serialize};

/// One vertex in the workflow graph: a node's outgoing edges and flags.
///
/// A non-router node may declare at most one connection; a list of length
/// greater than one requires `is_router`, so no edge is silently dead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeName,
    #[serde(default)]
    pub connections: Vec<NodeName>,
    #[serde(default)]
    pub is_router: bool,
    #[serde(default)]
    pub is_end: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeConfig {
    pub fn new(node: impl Into<NodeName>) -> Self {
        Self {
            node: node.into(),
            connections: Vec::new(),
            is_router: false,
            is_end: false,
            description: None,
        }
    }

    pub fn connects_to(mut self, target: impl Into<NodeName>) -> Self {
        self.connections.push(target.into());
        self
    }

    pub fn router(mut self) -> Self {
        self.is_router = true;
        self
    }

    pub fn end(mut self) -> Self {
        self.is_end = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Declarative description of a workflow: identity, start node, vertices.
///
/// Constructed once per workflow and shared read-only across runs. The
/// schema is serde-serializable so workflows can be loaded from JSON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: NodeName,
    pub nodes: Vec<NodeConfig>,
}

impl WorkflowSchema {
    pub fn new(name: impl Into<String>, start: impl Into<NodeName>) -> Self {
        Self {
            name: name.into(),
            description: None,
            start: start.into(),
            nodes: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_node(mut self, config: NodeConfig) -> Self {
        self.nodes.push(config);
        self
    }
}
