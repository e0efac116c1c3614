//! Shared mock components for compiler and validator tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use weftcore::schema::{ParamField, ParamKind, Port, PortSchema};
use weftcore::{
    Component, ComponentRegistry, ConnectionType, ExecutionContext, ExecutionError, GraphNode,
    ParameterSchema, PortSpec, StaticPorts, WorkflowGraph, ENTRYPOINT_COMPONENT,
};

/// Pass-through step: optional text input `in`, text output `out`.
pub struct StepComponent;

#[async_trait]
impl Component for StepComponent {
    fn id(&self) -> &str {
        "test.step"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![ParamField::new("label", "Label", ParamKind::string())])
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(
            PortSchema::new(vec![Port::new("in", ConnectionType::Text)]),
            PortSchema::new(vec![Port::new("out", ConnectionType::Text)]),
        )
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        Ok(json!({"out": "done"}))
    }
}

/// Entry point; runtime inputs are declared through params.
pub struct EntrypointComponent;

#[async_trait]
impl Component for EntrypointComponent {
    fn id(&self) -> &str {
        ENTRYPOINT_COMPONENT
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![ParamField::new(
            "runtime_inputs",
            "Runtime inputs",
            ParamKind::Json,
        )])
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(
            PortSchema::default(),
            PortSchema::new(vec![Port::new("out", ConnectionType::Json)]),
        )
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        Ok(ctx.params.clone())
    }
}

/// Component with a required secret parameter.
pub struct SecureComponent;

#[async_trait]
impl Component for SecureComponent {
    fn id(&self) -> &str {
        "test.secure"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParamField::new("api_key", "API key", ParamKind::Secret).required(),
            ParamField::new("endpoint", "Endpoint", ParamKind::string()),
        ])
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(PortSchema::default(), PortSchema::default())
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        Ok(Value::Null)
    }
}

/// Strongly typed ports for compatibility tests: required boolean
/// input `flag`, json input `data`; number output `count`, text
/// output `text`.
pub struct TypedComponent;

#[async_trait]
impl Component for TypedComponent {
    fn id(&self) -> &str {
        "test.typed"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    fn ports(&self) -> PortSpec {
        PortSpec::fixed(
            PortSchema::new(vec![
                Port::new("flag", ConnectionType::Boolean).required(),
                Port::new("data", ConnectionType::Json),
            ]),
            PortSchema::new(vec![
                Port::new("count", ConnectionType::Number),
                Port::new("text", ConnectionType::Text),
            ]),
        )
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        Ok(json!({"count": 1, "text": "typed"}))
    }
}

/// Ports resolved from the `input_ports` param: each named port becomes
/// a required text input.
pub struct DynamicComponent;

#[async_trait]
impl Component for DynamicComponent {
    fn id(&self) -> &str {
        "test.dynamic"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![ParamField::new(
            "input_ports",
            "Input ports",
            ParamKind::Json,
        )])
    }

    fn ports(&self) -> PortSpec {
        PortSpec::dynamic(|params| {
            let names = params["input_ports"]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            StaticPorts {
                inputs: PortSchema::new(
                    names
                        .iter()
                        .map(|n| Port::new(n.clone(), ConnectionType::Text).required())
                        .collect(),
                ),
                outputs: PortSchema::new(vec![Port::new("out", ConnectionType::Json)]),
            }
        })
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<Value, ExecutionError> {
        Ok(json!({"out": {}}))
    }
}

pub fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register(Arc::new(StepComponent));
    registry.register(Arc::new(EntrypointComponent));
    registry.register(Arc::new(SecureComponent));
    registry.register(Arc::new(TypedComponent));
    registry.register(Arc::new(DynamicComponent));
    registry
}

/// Graph with one `test.step` node per id, no edges.
pub fn step_graph(ids: &[&str]) -> WorkflowGraph {
    let mut graph = WorkflowGraph::new("test");
    for id in ids {
        graph.add_node(GraphNode::new(*id, "test.step"));
    }
    graph
}
