use crate::node::NodeName;
use thiserror::Error;

/// Structural schema violations. Raised at `Workflow` construction, before
/// any node executes.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("workflow declares no nodes")]
    EmptyNodes,

    #[error("duplicate node config for '{0}'")]
    DuplicateNode(NodeName),

    #[error("start node '{0}' is not declared in the node list")]
    UnknownStart(NodeName),

    #[error("node '{node}' connects to undeclared node '{target}'")]
    UnknownConnection { node: NodeName, target: NodeName },

    #[error("node '{0}' is not registered")]
    Unregistered(NodeName),

    #[error("node '{0}' is flagged as a router but does not implement routing")]
    NotARouter(NodeName),

    #[error("non-router node '{node}' declares {count} connections; only routers may branch")]
    AmbiguousConnections { node: NodeName, count: usize },

    #[error("connection graph has a cycle through '{0}'")]
    Cycle(NodeName),

    #[error("node '{0}' is unreachable from the start node")]
    Unreachable(NodeName),

    #[error("end node '{0}' declares outgoing connections")]
    ConnectionsAfterEnd(NodeName),
}

/// Errors raised by a node's `process` or `route`. An `Err` from a node
/// aborts the run with no context returned.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("missing field: {0}")]
    MissingField(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Orchestrator-level errors surfaced by `Workflow`.
#[derive(Error, Debug)]
pub enum StrandError {
    #[error("invalid workflow schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("event failed to parse: {0}")]
    EventParse(#[source] serde_json::Error),

    #[error("node '{node}' failed: {source}")]
    Node {
        node: NodeName,
        #[source]
        source: NodeError,
    },

    #[error("router '{router}' selected unknown node '{target}'")]
    UnknownRoute { router: NodeName, target: NodeName },

    #[error("aborted after {steps} steps at node '{node}'; the schema routes in a loop")]
    StepLimitExceeded { node: NodeName, steps: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
