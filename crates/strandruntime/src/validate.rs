use crate::NodeRegistry;
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;
use strandcore::{NodeConfig, NodeName, SchemaError, WorkflowSchema};

/// Structural checks over a schema and its execution plan, run once at
/// `Workflow` construction.
///
/// Rejects anything that could misbehave at run time: duplicate or
/// unregistered nodes, router flags on nodes that cannot route, ambiguous
/// branches on non-routers, static cycles, unreachable nodes, and dead
/// edges on end nodes.
pub struct WorkflowValidator;

impl WorkflowValidator {
    pub fn validate<E: 'static>(
        schema: &WorkflowSchema,
        plan: &IndexMap<NodeName, NodeConfig>,
        registry: &NodeRegistry<E>,
    ) -> Result<(), SchemaError> {
        if schema.nodes.is_empty() {
            return Err(SchemaError::EmptyNodes);
        }
        if !schema.nodes.iter().any(|config| config.node == schema.start) {
            return Err(SchemaError::UnknownStart(schema.start.clone()));
        }

        for config in plan.values() {
            if !registry.contains(&config.node) {
                return Err(SchemaError::Unregistered(config.node.clone()));
            }
            if config.is_router && registry.create(&config.node)?.as_router().is_none() {
                return Err(SchemaError::NotARouter(config.node.clone()));
            }
            if !config.is_router && config.connections.len() > 1 {
                return Err(SchemaError::AmbiguousConnections {
                    node: config.node.clone(),
                    count: config.connections.len(),
                });
            }
            if config.is_end && !config.connections.is_empty() {
                return Err(SchemaError::ConnectionsAfterEnd(config.node.clone()));
            }
        }

        let (graph, indices) = Self::build_graph(plan)?;
        if let Err(cycle) = toposort(&graph, None) {
            return Err(SchemaError::Cycle(graph[cycle.node_id()].clone()));
        }
        Self::check_reachability(&graph, &indices, plan, &schema.start)
    }

    fn build_graph(
        plan: &IndexMap<NodeName, NodeConfig>,
    ) -> Result<(DiGraph<NodeName, ()>, HashMap<NodeName, NodeIndex>), SchemaError> {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();
        for name in plan.keys() {
            let idx = graph.add_node(name.clone());
            indices.insert(name.clone(), idx);
        }
        for (name, config) in plan {
            for target in &config.connections {
                let to = indices.get(target).copied().ok_or_else(|| {
                    SchemaError::UnknownConnection {
                        node: name.clone(),
                        target: target.clone(),
                    }
                })?;
                graph.add_edge(indices[name], to, ());
            }
        }
        Ok((graph, indices))
    }

    fn check_reachability(
        graph: &DiGraph<NodeName, ()>,
        indices: &HashMap<NodeName, NodeIndex>,
        plan: &IndexMap<NodeName, NodeConfig>,
        start: &str,
    ) -> Result<(), SchemaError> {
        let Some(&start_idx) = indices.get(start) else {
            return Err(SchemaError::UnknownStart(start.to_string()));
        };
        let mut visited = vec![false; graph.node_count()];
        let mut dfs = Dfs::new(graph, start_idx);
        while let Some(idx) = dfs.next(graph) {
            visited[idx.index()] = true;
        }
        for name in plan.keys() {
            if let Some(&idx) = indices.get(name) {
                if !visited[idx.index()] {
                    return Err(SchemaError::Unreachable(name.clone()));
                }
            }
        }
        Ok(())
    }
}
