use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use weftbridge::{
    MemoryCredentialStore, RegisteredTool, ToolCallGateway, ToolRegistry, ToolStatus,
};
use weftbridge::credentials::CredentialStore;
use weftcore::schema::{ParameterSchema, PortSchema};
use weftcore::{
    Action, BridgeError, Component, ComponentRegistry, ExecutionContext, ExecutionError,
    MemoryTraceSink, PortSpec, TraceKind, WorkflowConfig, WorkflowDefinition,
};
use weftruntime::{DurableSubstrate, LocalSubstrate};

struct SearchTool;

#[async_trait]
impl Component for SearchTool {
    fn id(&self) -> &str {
        "tool.search"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        let query = ctx
            .param("query")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let authed = ctx.param("credentials").is_some();
        Ok(json!({"results": format!("results for {query}"), "authed": authed}))
    }
}

struct BrokenTool;

#[async_trait]
impl Component for BrokenTool {
    fn id(&self) -> &str {
        "tool.broken"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        Err(ExecutionError::Failed("upstream 503".into()))
    }
}

struct StalledTool;

#[async_trait]
impl Component for StalledTool {
    fn id(&self) -> &str {
        "tool.stalled"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        ctx.cancellation.cancelled().await;
        Err(ExecutionError::Cancelled)
    }
}

/// Long-running host action keeping the workflow open for signals.
struct HostComponent;

#[async_trait]
impl Component for HostComponent {
    fn id(&self) -> &str {
        "test.host"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        ctx.cancellation.cancelled().await;
        Err(ExecutionError::Cancelled)
    }
}

struct Harness {
    substrate: Arc<LocalSubstrate>,
    tools: Arc<ToolRegistry>,
    credentials: Arc<MemoryCredentialStore>,
    gateway: ToolCallGateway,
    run_id: weftcore::RunId,
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

async fn harness() -> Harness {
    init_tracing();
    let mut components = ComponentRegistry::new();
    components.register(Arc::new(SearchTool));
    components.register(Arc::new(BrokenTool));
    components.register(Arc::new(StalledTool));
    components.register(Arc::new(HostComponent));
    let substrate = Arc::new(LocalSubstrate::new(
        Arc::new(components),
        Arc::new(MemoryTraceSink::new()),
    ));

    let definition = WorkflowDefinition {
        title: "host".into(),
        entrypoint_ref: None,
        nodes: HashMap::new(),
        actions: vec![Action {
            node_ref: "host".into(),
            component: "test.host".into(),
            params: json!({}),
            input_overrides: json!({}),
            depends_on: vec![],
            input_mappings: HashMap::new(),
            retry_policy: None,
        }],
        edges: vec![],
        dependency_counts: HashMap::new(),
        config: WorkflowConfig::default(),
    };
    let run_id = substrate.start_run(&definition, json!({})).await.unwrap();

    let tools = Arc::new(ToolRegistry::new());
    let credentials = Arc::new(MemoryCredentialStore::new());
    let gateway = ToolCallGateway::new(
        substrate.clone(),
        tools.clone(),
        credentials.clone(),
    )
    .with_poll_interval(Duration::from_millis(5))
    .with_timeout(Duration::from_secs(2));

    Harness {
        substrate,
        tools,
        credentials,
        gateway,
        run_id,
    }
}

impl Harness {
    async fn close(&self) {
        let _ = self.substrate.cancel_workflow(self.run_id).await;
        let _ = self
            .substrate
            .wait_for_close(self.run_id, Duration::from_secs(5))
            .await;
    }
}

#[tokio::test]
async fn call_resolves_tool_and_returns_its_output() {
    let h = harness().await;
    let handle = h
        .credentials
        .seal(json!({"api_key": "k-123"}))
        .await
        .unwrap();
    h.tools
        .register(
            h.run_id,
            RegisteredTool::component("search-node", "tool.search").with_credentials(handle),
        )
        .await;

    let output = h
        .gateway
        .call(h.run_id, "search-node", json!({"query": "weather in oslo"}))
        .await
        .unwrap();
    assert_eq!(output["results"], "results for weather in oslo");
    assert_eq!(output["authed"], true);

    // The completion acknowledgement lands in the run's trace.
    let events = h.substrate.trace().list_after_sequence(h.run_id, 0);
    let ack = events
        .iter()
        .find(|e| e.kind == TraceKind::Progress && e.node_ref == "search-node")
        .expect("completion ack missing from trace");
    assert!(ack.message.as_deref().unwrap_or("").contains("completed"));

    h.close().await;
}

#[tokio::test]
async fn call_without_credentials_is_unauthenticated() {
    let h = harness().await;
    h.tools
        .register(
            h.run_id,
            RegisteredTool::component("search-node", "tool.search"),
        )
        .await;

    let output = h
        .gateway
        .call(h.run_id, "search-node", json!({"query": "q"}))
        .await
        .unwrap();
    assert_eq!(output["authed"], false);

    h.close().await;
}

#[tokio::test]
async fn concurrent_calls_to_one_node_get_their_own_results() {
    let h = harness().await;
    h.tools
        .register(
            h.run_id,
            RegisteredTool::component("search-node", "tool.search"),
        )
        .await;

    // Same node, same instant: each caller must get the result of its
    // own arguments, which requires distinct call ids.
    let (a, b) = tokio::join!(
        h.gateway
            .call(h.run_id, "search-node", json!({"query": "alpha"})),
        h.gateway
            .call(h.run_id, "search-node", json!({"query": "beta"})),
    );
    assert_eq!(a.unwrap()["results"], "results for alpha");
    assert_eq!(b.unwrap()["results"], "results for beta");

    h.close().await;
}

#[tokio::test]
async fn unregistered_node_is_tool_not_found() {
    let h = harness().await;
    let err = h
        .gateway
        .call(h.run_id, "missing-node", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::ToolNotFound(_)));
    h.close().await;
}

#[tokio::test]
async fn pending_tool_is_not_ready() {
    let h = harness().await;
    h.tools
        .register(
            h.run_id,
            RegisteredTool::component("slow-node", "tool.search")
                .with_status(ToolStatus::Pending),
        )
        .await;

    let err = h
        .gateway
        .call(h.run_id, "slow-node", json!({}))
        .await
        .unwrap_err();
    match err {
        BridgeError::ToolNotReady { node, status } => {
            assert_eq!(node, "slow-node");
            assert_eq!(status, "pending");
        }
        other => panic!("unexpected error: {other}"),
    }
    h.close().await;
}

#[tokio::test]
async fn expired_registry_scope_is_tool_not_found() {
    let mut h = harness().await;
    h.tools = Arc::new(ToolRegistry::with_ttl(Duration::from_millis(10)));
    let gateway = ToolCallGateway::new(
        h.substrate.clone(),
        h.tools.clone(),
        h.credentials.clone(),
    )
    .with_poll_interval(Duration::from_millis(5))
    .with_timeout(Duration::from_secs(2));

    h.tools
        .register(
            h.run_id,
            RegisteredTool::component("search-node", "tool.search"),
        )
        .await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = gateway
        .call(h.run_id, "search-node", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::ToolNotFound(_)));
    h.close().await;
}

#[tokio::test]
async fn failing_tool_surfaces_call_failed() {
    let h = harness().await;
    h.tools
        .register(
            h.run_id,
            RegisteredTool::component("broken-node", "tool.broken"),
        )
        .await;

    let err = h
        .gateway
        .call(h.run_id, "broken-node", json!({}))
        .await
        .unwrap_err();
    match err {
        BridgeError::CallFailed { call_id, message } => {
            assert!(call_id.starts_with(&format!("{}:broken-node:", h.run_id)));
            assert!(message.contains("upstream 503"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Failure is still acknowledged to the workflow.
    let events = h.substrate.trace().list_after_sequence(h.run_id, 0);
    let ack = events
        .iter()
        .find(|e| e.kind == TraceKind::Progress && e.node_ref == "broken-node")
        .expect("failure ack missing from trace");
    assert!(ack.message.as_deref().unwrap_or("").contains("failed"));

    h.close().await;
}

#[tokio::test]
async fn stalled_tool_times_out_with_the_minted_call_id() {
    let h = harness().await;
    h.tools
        .register(
            h.run_id,
            RegisteredTool::component("stalled-node", "tool.stalled"),
        )
        .await;

    let gateway = ToolCallGateway::new(
        h.substrate.clone(),
        h.tools.clone(),
        h.credentials.clone(),
    )
    .with_poll_interval(Duration::from_millis(5))
    .with_timeout(Duration::from_millis(60));

    let started = tokio::time::Instant::now();
    let err = gateway
        .call(h.run_id, "stalled-node", json!({}))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(60),
        "timed out early: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(150),
        "timed out late: {elapsed:?}"
    );
    match err {
        BridgeError::Timeout {
            call_id,
            timeout_ms,
        } => {
            assert!(call_id.starts_with(&format!("{}:stalled-node:", h.run_id)));
            assert_eq!(timeout_ms, 60);
        }
        other => panic!("unexpected error: {other}"),
    }
    h.close().await;
}
