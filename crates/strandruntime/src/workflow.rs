use crate::{NodeRegistry, WorkflowValidator};
use chrono::Utc;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use strandcore::{
    EventBus, ExecutionEvent, Node, NodeConfig, NodeName, NodeRecord, RunId, SchemaError,
    StrandError, TaskContext, WorkflowSchema, NODE_PLAN_KEY,
};
use tracing::Instrument;
use uuid::Uuid;

const EVENT_BUS_CAPACITY: usize = 256;

/// Drives node-by-node execution of one schema against one input event.
///
/// Construction builds the execution plan (auto-registering connection
/// targets that lack an explicit config) and validates it against the
/// registry; `run` then dispatches nodes sequentially from the start node
/// until a terminal node, or a router that declines to continue.
///
/// Runs are independent: the schema, plan, and registry are shared
/// immutably, and each run owns its `TaskContext`.
pub struct Workflow<E: 'static> {
    schema: WorkflowSchema,
    plan: IndexMap<NodeName, NodeConfig>,
    registry: Arc<NodeRegistry<E>>,
    event_bus: EventBus,
}

impl<E> Workflow<E>
where
    E: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        schema: WorkflowSchema,
        registry: Arc<NodeRegistry<E>>,
    ) -> Result<Self, StrandError> {
        let plan = build_plan(&schema)?;
        WorkflowValidator::validate(&schema, &plan, &registry)?;
        Ok(Self {
            schema,
            plan,
            registry,
            event_bus: EventBus::new(EVENT_BUS_CAPACITY),
        })
    }

    pub fn schema(&self) -> &WorkflowSchema {
        &self.schema
    }

    /// The complete node-name → config map this workflow executes against.
    pub fn plan(&self) -> &IndexMap<NodeName, NodeConfig> {
        &self.plan
    }

    /// Subscribe to the execution event side channel.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Execute the workflow for one raw event.
    ///
    /// The event is parsed into `E` before any node runs; parse failure is
    /// a hard error. Any `Err` from a node aborts the run and propagates,
    /// so a returned context always reflects a structurally complete run
    /// (per-node soft errors are in its records).
    pub async fn run(&self, event: serde_json::Value) -> Result<TaskContext<E>, StrandError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let span = tracing::info_span!(
            "workflow_run",
            workflow = %self.schema.name,
            run_id = %run_id,
            output = tracing::field::Empty,
        );

        self.event_bus.emit(ExecutionEvent::RunStarted {
            run_id,
            workflow: self.schema.name.clone(),
            timestamp: Utc::now(),
        });

        let result = self
            .dispatch(run_id, event, &span)
            .instrument(span.clone())
            .await;

        self.event_bus.emit(ExecutionEvent::RunCompleted {
            run_id,
            workflow: self.schema.name.clone(),
            success: result.is_ok(),
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        result
    }

    async fn dispatch(
        &self,
        run_id: RunId,
        event: serde_json::Value,
        run_span: &tracing::Span,
    ) -> Result<TaskContext<E>, StrandError> {
        let parsed: E = serde_json::from_value(event).map_err(StrandError::EventParse)?;
        let mut ctx = TaskContext::new(parsed);
        ctx.metadata
            .insert(NODE_PLAN_KEY.to_string(), serde_json::to_value(&self.plan)?);

        let mut config = self
            .plan
            .get(&self.schema.start)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownStart(self.schema.start.clone()))?;
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps > self.plan.len() {
                return Err(StrandError::StepLimitExceeded {
                    node: config.node,
                    steps,
                });
            }

            let name = config.node.clone();
            let node = self.registry.create(&name)?;
            let node_span = tracing::info_span!(
                "node_run",
                node = %name,
                input = tracing::field::Empty,
                output = tracing::field::Empty,
            );
            node_span.record("input", ctx.snapshot().to_string().as_str());
            tracing::info!(node = %name, "starting node");
            self.event_bus.emit(ExecutionEvent::NodeStarted {
                run_id,
                node: name.clone(),
                timestamp: Utc::now(),
            });
            let node_started = Instant::now();

            ctx = match node.process(ctx).instrument(node_span.clone()).await {
                Ok(ctx) => ctx,
                Err(source) => {
                    tracing::error!(node = %name, error = %source, "node failed");
                    self.event_bus.emit(ExecutionEvent::NodeFailed {
                        run_id,
                        node: name.clone(),
                        error: source.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(StrandError::Node { node: name, source });
                }
            };

            // The node supplies content; the orchestrator guarantees presence.
            if !ctx.nodes.contains_key(&name) {
                ctx.nodes.insert(name.clone(), NodeRecord::default());
            }
            node_span.record("output", ctx.snapshot().to_string().as_str());
            let duration_ms = node_started.elapsed().as_millis() as u64;
            tracing::info!(node = %name, duration_ms, "node finished");
            self.event_bus.emit(ExecutionEvent::NodeCompleted {
                run_id,
                node: name.clone(),
                record: ctx.nodes.get(&name).cloned().unwrap_or_default(),
                duration_ms,
                timestamp: Utc::now(),
            });

            let next = if config.is_end || config.connections.is_empty() {
                None
            } else if config.is_router {
                self.route(run_id, &name, node.as_ref(), &mut ctx).await?
            } else {
                config.connections.first().cloned()
            };

            match next {
                Some(target) => {
                    config = self.plan.get(&target).cloned().ok_or_else(|| {
                        StrandError::UnknownRoute {
                            router: name.clone(),
                            target: target.clone(),
                        }
                    })?;
                }
                None => break,
            }
        }

        ctx.metadata.shift_remove(NODE_PLAN_KEY);
        run_span.record("output", ctx.snapshot().to_string().as_str());
        Ok(ctx)
    }

    async fn route(
        &self,
        run_id: RunId,
        name: &str,
        node: &dyn Node<E>,
        ctx: &mut TaskContext<E>,
    ) -> Result<Option<NodeName>, StrandError> {
        let router = node
            .as_router()
            .ok_or_else(|| SchemaError::NotARouter(name.to_string()))?;
        let target = match router.route(ctx).await {
            Ok(target) => target,
            Err(source) => {
                tracing::error!(node = %name, error = %source, "router failed");
                self.event_bus.emit(ExecutionEvent::NodeFailed {
                    run_id,
                    node: name.to_string(),
                    error: source.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(StrandError::Node {
                    node: name.to_string(),
                    source,
                });
            }
        };

        if let Some(target) = &target {
            if !self.plan.contains_key(target) {
                return Err(StrandError::UnknownRoute {
                    router: name.to_string(),
                    target: target.clone(),
                });
            }
        }
        if let Some(record) = ctx.nodes.get_mut(name) {
            record.next_node = target.clone();
        }
        tracing::info!(node = %name, target = ?target, "route selected");
        self.event_bus.emit(ExecutionEvent::RouteSelected {
            run_id,
            router: name.to_string(),
            target: target.clone(),
            timestamp: Utc::now(),
        });
        Ok(target)
    }
}

/// Collapse a schema's node list into the executable plan, inserting a
/// default config for every connection target that lacks an explicit
/// entry. Terminal nodes need no boilerplate entries.
fn build_plan(schema: &WorkflowSchema) -> Result<IndexMap<NodeName, NodeConfig>, SchemaError> {
    let mut plan: IndexMap<NodeName, NodeConfig> = IndexMap::new();
    for config in &schema.nodes {
        if plan.insert(config.node.clone(), config.clone()).is_some() {
            return Err(SchemaError::DuplicateNode(config.node.clone()));
        }
    }
    let declared: Vec<NodeConfig> = plan.values().cloned().collect();
    for config in declared {
        for target in config.connections {
            plan.entry(target.clone())
                .or_insert_with(|| NodeConfig::new(target));
        }
    }
    Ok(plan)
}
