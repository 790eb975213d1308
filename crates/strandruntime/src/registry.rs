use std::collections::HashMap;
use std::sync::Arc;
use strandcore::{Node, NodeName, SchemaError};

/// Factory for node instances.
///
/// The orchestrator creates a fresh instance per visit and the validator
/// creates one per router check, so factories must be cheap and
/// side-effect free. Node dependencies (HTTP clients, DB handles) are
/// captured by the factory, not opened in `create`.
pub trait NodeFactory<E: 'static>: Send + Sync {
    fn node_name(&self) -> &str;

    fn create(&self) -> Box<dyn Node<E>>;
}

struct FnFactory<E: 'static> {
    name: NodeName,
    build: Box<dyn Fn() -> Box<dyn Node<E>> + Send + Sync>,
}

impl<E: 'static> NodeFactory<E> for FnFactory<E> {
    fn node_name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> Box<dyn Node<E>> {
        (self.build)()
    }
}

/// Registry of node implementations, keyed by node name.
///
/// Explicit and dependency-injected: construct one at startup, register
/// factories, and hand it to each `Workflow`. No global state, so tests
/// can build isolated registries.
pub struct NodeRegistry<E: 'static> {
    factories: HashMap<NodeName, Arc<dyn NodeFactory<E>>>,
}

impl<E: 'static> NodeRegistry<E> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, factory: Arc<dyn NodeFactory<E>>) {
        let name = factory.node_name().to_string();
        tracing::debug!(node = %name, "registering node");
        self.factories.insert(name, factory);
    }

    /// Register a closure as a factory under `name`.
    pub fn register_fn<F>(&mut self, name: impl Into<NodeName>, build: F)
    where
        F: Fn() -> Box<dyn Node<E>> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnFactory {
            name: name.into(),
            build: Box::new(build),
        }));
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Node<E>>, SchemaError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SchemaError::Unregistered(name.to_string()))?;
        Ok(factory.create())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn node_names(&self) -> Vec<NodeName> {
        let mut names: Vec<NodeName> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl<E: 'static> Default for NodeRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
