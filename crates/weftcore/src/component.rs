use crate::error::ExecutionError;
use crate::schema::{ParameterSchema, PortSchema};
use crate::trace::{RunId, TraceEvent, TraceRecorder};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Well-known component id of the entry-point action. The action bound
/// to this id receives the run's external runtime inputs, regardless of
/// its topological position.
pub const ENTRYPOINT_COMPONENT: &str = "core.entrypoint";

/// Core trait implemented by every executable component.
#[async_trait]
pub trait Component: Send + Sync {
    /// Stable component id (e.g. "http.request", "agent.step").
    fn id(&self) -> &str;

    fn parameter_schema(&self) -> ParameterSchema;

    /// Port declaration: static, or resolved from params.
    fn ports(&self) -> PortSpec;

    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutionError>;
}

/// Resolved input and output ports of a component.
#[derive(Debug, Clone, Default)]
pub struct StaticPorts {
    pub inputs: PortSchema,
    pub outputs: PortSchema,
}

type PortResolver = Arc<dyn Fn(&Value) -> StaticPorts + Send + Sync>;

/// Port declaration variants. Components whose ports depend on their
/// params carry a resolver; dispatch is explicit, never probed.
#[derive(Clone)]
pub enum PortSpec {
    Static(StaticPorts),
    Dynamic(PortResolver),
}

impl PortSpec {
    pub fn fixed(inputs: PortSchema, outputs: PortSchema) -> Self {
        PortSpec::Static(StaticPorts { inputs, outputs })
    }

    pub fn dynamic(resolver: impl Fn(&Value) -> StaticPorts + Send + Sync + 'static) -> Self {
        PortSpec::Dynamic(Arc::new(resolver))
    }

    /// Resolve the port snapshot for the given params.
    pub fn resolve(&self, params: &Value) -> StaticPorts {
        match self {
            PortSpec::Static(ports) => ports.clone(),
            PortSpec::Dynamic(resolver) => resolver(params),
        }
    }
}

/// Execution context handed to a component for one action invocation.
#[derive(Clone)]
pub struct ExecutionContext {
    pub run_id: RunId,
    pub node_ref: String,
    /// Effective parameters: static params, with runtime inputs merged
    /// in when this action is the entry point.
    pub params: Value,
    /// Input-port values resolved from upstream outputs and overrides.
    pub inputs: HashMap<String, Value>,
    pub recorder: TraceRecorder,
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl ExecutionContext {
    pub fn require_input(&self, port: &str) -> Result<&Value, ExecutionError> {
        self.inputs
            .get(port)
            .ok_or_else(|| ExecutionError::MissingInput(port.to_string()))
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn require_param(&self, key: &str) -> Result<&Value, ExecutionError> {
        self.params
            .get(key)
            .ok_or_else(|| ExecutionError::InvalidParams(format!("missing param '{key}'")))
    }

    /// Emit a Progress trace event attributed to this action.
    pub fn progress(&self, message: impl Into<String>) -> TraceEvent {
        self.recorder.progress(&self.node_ref, message)
    }
}

/// Explicit registry of available components. Constructed once at
/// process start and passed by reference into the compiler, validator
/// and orchestrator; never ambient global state.
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: Arc<dyn Component>) {
        let id = component.id().to_string();
        tracing::info!(component = %id, "registering component");
        self.components.insert(id, component);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Component>> {
        self.components.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    /// Registered component ids, sorted for stable suggestion lists.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.components.keys().cloned().collect();
        ids.sort();
        ids
    }
}
