#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use weftcore::schema::{ParameterSchema, PortSchema};
use weftcore::{
    Action, Component, ComponentRegistry, ExecutionContext, ExecutionError, InputMapping,
    MemoryTraceSink, PortSpec, WorkflowConfig, WorkflowDefinition, ENTRYPOINT_COMPONENT,
};
use weftruntime::LocalSubstrate;

/// Echoes its effective params and resolved inputs as its output.
pub struct EchoComponent;

#[async_trait]
impl Component for EchoComponent {
    fn id(&self) -> &str {
        "test.echo"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        let inputs: serde_json::Map<String, Value> =
            ctx.inputs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Ok(json!({"params": ctx.params, "inputs": inputs}))
    }
}

/// Fails every invocation with a typed error.
pub struct FailingComponent;

#[async_trait]
impl Component for FailingComponent {
    fn id(&self) -> &str {
        "test.failing"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        Err(ExecutionError::Typed {
            error_type: "upstream_unavailable".into(),
            message: "connection refused".into(),
        })
    }
}

/// Sleeps until cancelled or until its `sleep_ms` param elapses.
pub struct SleepComponent;

#[async_trait]
impl Component for SleepComponent {
    fn id(&self) -> &str {
        "test.sleep"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        let ms = ctx.param("sleep_ms").and_then(Value::as_u64).unwrap_or(5_000);
        tokio::select! {
            _ = ctx.cancellation.cancelled() => Err(ExecutionError::Cancelled),
            _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(json!({"slept_ms": ms})),
        }
    }
}

/// Entry point: surfaces its effective params (static plus merged
/// runtime inputs) as its output.
pub struct EntrypointComponent;

#[async_trait]
impl Component for EntrypointComponent {
    fn id(&self) -> &str {
        ENTRYPOINT_COMPONENT
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        Ok(ctx.params)
    }
}

pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn registry() -> Arc<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    registry.register(Arc::new(EchoComponent));
    registry.register(Arc::new(FailingComponent));
    registry.register(Arc::new(SleepComponent));
    registry.register(Arc::new(EntrypointComponent));
    Arc::new(registry)
}

pub fn substrate() -> Arc<LocalSubstrate> {
    init_tracing();
    Arc::new(LocalSubstrate::new(
        registry(),
        Arc::new(MemoryTraceSink::new()),
    ))
}

pub fn action(node_ref: &str, component: &str) -> Action {
    Action {
        node_ref: node_ref.to_string(),
        component: component.to_string(),
        params: json!({}),
        input_overrides: json!({}),
        depends_on: vec![],
        input_mappings: HashMap::new(),
        retry_policy: None,
    }
}

pub fn mapped(mut action: Action, port: &str, source_ref: &str, source_handle: &str) -> Action {
    action.input_mappings.insert(
        port.to_string(),
        InputMapping {
            source_ref: source_ref.to_string(),
            source_handle: source_handle.to_string(),
        },
    );
    action
}

/// Hand-built definition in already-topological order, the shape the
/// compiler produces.
pub fn definition(title: &str, actions: Vec<Action>) -> WorkflowDefinition {
    let entrypoint_ref = actions
        .iter()
        .find(|a| a.component == ENTRYPOINT_COMPONENT)
        .map(|a| a.node_ref.clone());
    WorkflowDefinition {
        title: title.to_string(),
        entrypoint_ref,
        nodes: HashMap::new(),
        actions,
        edges: vec![],
        dependency_counts: HashMap::new(),
        config: WorkflowConfig::default(),
    }
}
