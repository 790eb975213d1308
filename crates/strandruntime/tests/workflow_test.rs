use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use strandcore::{
    ExecutionEvent, Node, NodeConfig, NodeError, NodeName, Router, StrandError, TaskContext,
    WorkflowSchema, NODE_PLAN_KEY,
};
use strandruntime::{NodeRegistry, Workflow};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Records a fixed value under its own name.
struct Emit {
    name: &'static str,
    value: i64,
}

#[async_trait]
impl Node<Value> for Emit {
    fn name(&self) -> &str {
        self.name
    }

    async fn process(&self, mut ctx: TaskContext<Value>) -> Result<TaskContext<Value>, NodeError> {
        ctx.record_result(self.name, json!(self.value));
        Ok(ctx)
    }
}

/// Routes on the boolean `flag` field of the event; no flag ends the run.
struct FlagRouter;

#[async_trait]
impl Node<Value> for FlagRouter {
    fn name(&self) -> &str {
        "FlagRouter"
    }

    async fn process(&self, mut ctx: TaskContext<Value>) -> Result<TaskContext<Value>, NodeError> {
        ctx.record_result("FlagRouter", json!("routed"));
        Ok(ctx)
    }

    fn as_router(&self) -> Option<&dyn Router<Value>> {
        Some(self)
    }
}

#[async_trait]
impl Router<Value> for FlagRouter {
    async fn route(&self, ctx: &TaskContext<Value>) -> Result<Option<NodeName>, NodeError> {
        match ctx.event.get("flag").and_then(Value::as_bool) {
            Some(true) => Ok(Some("B".to_string())),
            Some(false) => Ok(Some("C".to_string())),
            None => Ok(None),
        }
    }
}

fn base_registry() -> NodeRegistry<Value> {
    let mut registry = NodeRegistry::new();
    registry.register_fn("A", || Box::new(Emit { name: "A", value: 1 }));
    registry.register_fn("B", || Box::new(Emit { name: "B", value: 2 }));
    registry.register_fn("C", || Box::new(Emit { name: "C", value: 3 }));
    registry
}

fn workflow(schema: WorkflowSchema, registry: NodeRegistry<Value>) -> Workflow<Value> {
    Workflow::new(schema, Arc::new(registry)).expect("schema should validate")
}

#[tokio::test]
async fn linear_chain_accumulates_one_record_per_node() {
    init_tracing();
    let schema = WorkflowSchema::new("linear", "A")
        .with_node(NodeConfig::new("A").connects_to("B"))
        .with_node(NodeConfig::new("B"));
    let workflow = workflow(schema, base_registry());

    let result = workflow.run(json!({})).await.unwrap();

    let names: Vec<&str> = result.nodes.keys().map(String::as_str).collect();
    assert_eq!(names, ["A", "B"]);
    assert_eq!(result.node("A").unwrap().result, Some(json!(1)));
    assert_eq!(result.node("B").unwrap().result, Some(json!(2)));
    assert!(
        !result.metadata.contains_key(NODE_PLAN_KEY),
        "transient plan entry must be removed before returning"
    );
}

#[tokio::test]
async fn single_connection_is_taken_across_payloads() {
    init_tracing();
    let schema = WorkflowSchema::new("deterministic", "A")
        .with_node(NodeConfig::new("A").connects_to("B"));

    for event in [json!({}), json!({"x": 1}), json!({"flag": false})] {
        let workflow = workflow(schema.clone(), base_registry());
        let result = workflow.run(event).await.unwrap();
        let names: Vec<&str> = result.nodes.keys().map(String::as_str).collect();
        assert_eq!(names, ["A", "B"]);
    }
}

#[tokio::test]
async fn connection_targets_are_auto_registered_as_terminals() {
    init_tracing();
    // Only A has an explicit config; B is picked up from the edge.
    let schema =
        WorkflowSchema::new("auto", "A").with_node(NodeConfig::new("A").connects_to("B"));
    let workflow = workflow(schema, base_registry());

    assert!(workflow.plan().contains_key("B"));
    let result = workflow.run(json!({})).await.unwrap();
    assert!(result.node("A").is_some());
    assert_eq!(result.node("B").unwrap().result, Some(json!(2)));
}

#[tokio::test]
async fn router_selects_branch_from_event() {
    init_tracing();
    let schema = WorkflowSchema::new("branch", "FlagRouter").with_node(
        NodeConfig::new("FlagRouter")
            .router()
            .connects_to("B")
            .connects_to("C"),
    );

    let mut registry = base_registry();
    registry.register_fn("FlagRouter", || Box::new(FlagRouter));
    let workflow = workflow(schema, registry);

    let result = workflow.run(json!({"flag": true})).await.unwrap();
    let names: Vec<&str> = result.nodes.keys().map(String::as_str).collect();
    assert_eq!(names, ["FlagRouter", "B"]);
    assert_eq!(
        result.node("FlagRouter").unwrap().next_node,
        Some("B".to_string())
    );

    let result = workflow.run(json!({"flag": false})).await.unwrap();
    let names: Vec<&str> = result.nodes.keys().map(String::as_str).collect();
    assert_eq!(names, ["FlagRouter", "C"]);
    assert_eq!(
        result.node("FlagRouter").unwrap().next_node,
        Some("C".to_string())
    );
}

#[tokio::test]
async fn router_returning_none_terminates_the_run() {
    init_tracing();
    let schema = WorkflowSchema::new("terminal-route", "FlagRouter").with_node(
        NodeConfig::new("FlagRouter")
            .router()
            .connects_to("B")
            .connects_to("C"),
    );

    let mut registry = base_registry();
    registry.register_fn("FlagRouter", || Box::new(FlagRouter));
    let workflow = workflow(schema, registry);

    let result = workflow.run(json!({})).await.unwrap();
    let names: Vec<&str> = result.nodes.keys().map(String::as_str).collect();
    assert_eq!(names, ["FlagRouter"], "router is the last entry");
    assert_eq!(result.node("FlagRouter").unwrap().next_node, None);
    assert!(!result.metadata.contains_key(NODE_PLAN_KEY));
}

#[tokio::test]
async fn node_reported_error_continues_the_chain() {
    init_tracing();
    struct SoftFail;

    #[async_trait]
    impl Node<Value> for SoftFail {
        fn name(&self) -> &str {
            "SoftFail"
        }

        async fn process(
            &self,
            mut ctx: TaskContext<Value>,
        ) -> Result<TaskContext<Value>, NodeError> {
            ctx.record_error("SoftFail", "boom");
            Ok(ctx)
        }
    }

    let schema = WorkflowSchema::new("soft", "SoftFail")
        .with_node(NodeConfig::new("SoftFail").connects_to("B"));
    let mut registry = base_registry();
    registry.register_fn("SoftFail", || Box::new(SoftFail));
    let workflow = workflow(schema, registry);

    let result = workflow.run(json!({})).await.unwrap();
    assert_eq!(
        result.node("SoftFail").unwrap().error,
        Some("boom".to_string())
    );
    assert_eq!(result.node("B").unwrap().result, Some(json!(2)));
}

#[tokio::test]
async fn uncaught_node_error_aborts_the_run() {
    init_tracing();
    struct HardFail;

    #[async_trait]
    impl Node<Value> for HardFail {
        fn name(&self) -> &str {
            "HardFail"
        }

        async fn process(
            &self,
            _ctx: TaskContext<Value>,
        ) -> Result<TaskContext<Value>, NodeError> {
            Err(NodeError::ExecutionFailed("x".to_string()))
        }
    }

    let schema = WorkflowSchema::new("hard", "HardFail")
        .with_node(NodeConfig::new("HardFail").connects_to("B"));
    let mut registry = base_registry();
    registry.register_fn("HardFail", || Box::new(HardFail));
    let workflow = workflow(schema, registry);

    let err = workflow.run(json!({})).await.unwrap_err();
    match err {
        StrandError::Node { node, source } => {
            assert_eq!(node, "HardFail");
            assert!(matches!(source, NodeError::ExecutionFailed(_)));
        }
        other => panic!("expected node error, got {:?}", other),
    }
}

#[tokio::test]
async fn event_parse_failure_is_a_hard_error() {
    init_tracing();

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ticket {
        flag: bool,
    }

    struct Inspect;

    #[async_trait]
    impl Node<Ticket> for Inspect {
        fn name(&self) -> &str {
            "Inspect"
        }

        async fn process(
            &self,
            mut ctx: TaskContext<Ticket>,
        ) -> Result<TaskContext<Ticket>, NodeError> {
            ctx.record_result("Inspect", json!(ctx.event.flag));
            Ok(ctx)
        }
    }

    let schema = WorkflowSchema::new("typed", "Inspect").with_node(NodeConfig::new("Inspect"));
    let mut registry: NodeRegistry<Ticket> = NodeRegistry::new();
    registry.register_fn("Inspect", || Box::new(Inspect));
    let workflow = Workflow::new(schema, Arc::new(registry)).unwrap();

    let err = workflow.run(json!({"wrong": 1})).await.unwrap_err();
    assert!(matches!(err, StrandError::EventParse(_)));

    let result = workflow.run(json!({"flag": true})).await.unwrap();
    assert_eq!(result.node("Inspect").unwrap().result, Some(json!(true)));
}

#[tokio::test]
async fn router_induced_revisits_hit_the_step_limit() {
    init_tracing();
    struct LoopRouter;

    #[async_trait]
    impl Node<Value> for LoopRouter {
        fn name(&self) -> &str {
            "Loop"
        }

        async fn process(
            &self,
            mut ctx: TaskContext<Value>,
        ) -> Result<TaskContext<Value>, NodeError> {
            ctx.record_result("Loop", json!("again"));
            Ok(ctx)
        }

        fn as_router(&self) -> Option<&dyn Router<Value>> {
            Some(self)
        }
    }

    #[async_trait]
    impl Router<Value> for LoopRouter {
        async fn route(&self, _ctx: &TaskContext<Value>) -> Result<Option<NodeName>, NodeError> {
            // Always routes back to itself; only the step guard stops this.
            Ok(Some("Loop".to_string()))
        }
    }

    let schema = WorkflowSchema::new("looping", "Loop")
        .with_node(NodeConfig::new("Loop").router().connects_to("B"));
    let mut registry = base_registry();
    registry.register_fn("Loop", || Box::new(LoopRouter));
    let workflow = workflow(schema, registry);

    let err = workflow.run(json!({})).await.unwrap_err();
    assert!(matches!(err, StrandError::StepLimitExceeded { .. }));
}

#[tokio::test]
async fn router_selecting_an_unplanned_node_is_an_error() {
    init_tracing();
    struct WildRouter;

    #[async_trait]
    impl Node<Value> for WildRouter {
        fn name(&self) -> &str {
            "Wild"
        }

        async fn process(
            &self,
            mut ctx: TaskContext<Value>,
        ) -> Result<TaskContext<Value>, NodeError> {
            ctx.record_result("Wild", json!("?"));
            Ok(ctx)
        }

        fn as_router(&self) -> Option<&dyn Router<Value>> {
            Some(self)
        }
    }

    #[async_trait]
    impl Router<Value> for WildRouter {
        async fn route(&self, _ctx: &TaskContext<Value>) -> Result<Option<NodeName>, NodeError> {
            Ok(Some("Z".to_string()))
        }
    }

    let schema = WorkflowSchema::new("wild", "Wild")
        .with_node(NodeConfig::new("Wild").router().connects_to("B"));
    let mut registry = base_registry();
    registry.register_fn("Wild", || Box::new(WildRouter));
    let workflow = workflow(schema, registry);

    let err = workflow.run(json!({})).await.unwrap_err();
    match err {
        StrandError::UnknownRoute { router, target } => {
            assert_eq!(router, "Wild");
            assert_eq!(target, "Z");
        }
        other => panic!("expected unknown route, got {:?}", other),
    }
}

#[tokio::test]
async fn silent_node_still_gets_a_record() {
    init_tracing();
    struct Silent;

    #[async_trait]
    impl Node<Value> for Silent {
        fn name(&self) -> &str {
            "Silent"
        }

        async fn process(&self, ctx: TaskContext<Value>) -> Result<TaskContext<Value>, NodeError> {
            Ok(ctx)
        }
    }

    let schema = WorkflowSchema::new("silent", "Silent").with_node(NodeConfig::new("Silent"));
    let mut registry = base_registry();
    registry.register_fn("Silent", || Box::new(Silent));
    let workflow = workflow(schema, registry);

    let result = workflow.run(json!({})).await.unwrap();
    let record = result.node("Silent").unwrap();
    assert_eq!(record.result, None);
    assert_eq!(record.error, None);
}

#[tokio::test]
async fn plan_is_visible_to_nodes_during_the_run() {
    init_tracing();
    struct PlanReader;

    #[async_trait]
    impl Node<Value> for PlanReader {
        fn name(&self) -> &str {
            "PlanReader"
        }

        async fn process(
            &self,
            mut ctx: TaskContext<Value>,
        ) -> Result<TaskContext<Value>, NodeError> {
            let visible = ctx.metadata.contains_key(NODE_PLAN_KEY);
            ctx.record_result("PlanReader", json!(visible));
            Ok(ctx)
        }
    }

    let schema =
        WorkflowSchema::new("plan-read", "PlanReader").with_node(NodeConfig::new("PlanReader"));
    let mut registry = base_registry();
    registry.register_fn("PlanReader", || Box::new(PlanReader));
    let workflow = workflow(schema, registry);

    let result = workflow.run(json!({})).await.unwrap();
    assert_eq!(result.node("PlanReader").unwrap().result, Some(json!(true)));
    assert!(!result.metadata.contains_key(NODE_PLAN_KEY));
}

#[tokio::test]
async fn execution_events_follow_the_dispatch_order() {
    init_tracing();
    let schema = WorkflowSchema::new("events", "A")
        .with_node(NodeConfig::new("A").connects_to("B"))
        .with_node(NodeConfig::new("B"));
    let workflow = workflow(schema, base_registry());

    let mut rx = workflow.subscribe();
    workflow.run(json!({})).await.unwrap();

    let mut seen = Vec::new();
    loop {
        match rx.recv().await.unwrap() {
            ExecutionEvent::RunStarted { .. } => seen.push("run_started".to_string()),
            ExecutionEvent::NodeStarted { node, .. } => seen.push(format!("start:{}", node)),
            ExecutionEvent::NodeCompleted { node, .. } => seen.push(format!("done:{}", node)),
            ExecutionEvent::NodeFailed { node, .. } => seen.push(format!("failed:{}", node)),
            ExecutionEvent::RouteSelected { router, .. } => seen.push(format!("route:{}", router)),
            ExecutionEvent::RunCompleted { success, .. } => {
                seen.push(format!("run_completed:{}", success));
                break;
            }
        }
    }
    assert_eq!(
        seen,
        [
            "run_started",
            "start:A",
            "done:A",
            "start:B",
            "done:B",
            "run_completed:true"
        ]
    );
}
