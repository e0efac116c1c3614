use crate::definition::{EdgeKind, RetryPolicy, WorkflowConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Authoring-time workflow graph. Edited by authoring surfaces, never
/// executed directly: execution always goes through a compiled
/// [`WorkflowDefinition`](crate::definition::WorkflowDefinition).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub config: WorkflowConfig,
}

impl WorkflowGraph {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            config: WorkflowConfig::default(),
        }
    }

    pub fn add_node(&mut self, node: GraphNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Add a control edge (ordering only, no data transfer).
    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) -> &mut Self {
        let id = format!("e{}", self.edges.len() + 1);
        self.edges.push(GraphEdge {
            id,
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            kind: EdgeKind::Success,
        });
        self
    }

    /// Add a data edge between an output port and an input port.
    pub fn connect_ports(
        &mut self,
        source: impl Into<String>,
        source_handle: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> &mut Self {
        let id = format!("e{}", self.edges.len() + 1);
        self.edges.push(GraphEdge {
            id,
            source: source.into(),
            target: target.into(),
            source_handle: Some(source_handle.into()),
            target_handle: Some(target_handle.into()),
            kind: EdgeKind::Success,
        });
        self
    }

    pub fn add_edge(&mut self, edge: GraphEdge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// One authored node: a placed instance of a registered component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub component: String,
    #[serde(default)]
    pub position: Option<Position>,
    /// Static parameter values, validated against the component's
    /// parameter schema.
    #[serde(default = "empty_object")]
    pub params: Value,
    /// Static values for input ports, validated against the component's
    /// input-port schema. Ports fed by data edges may omit these.
    #[serde(default = "empty_object")]
    pub input_overrides: Value,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

fn empty_object() -> Value {
    json!({})
}

impl GraphNode {
    pub fn new(id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            position: None,
            params: json!({}),
            input_overrides: json!({}),
            retry_policy: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.params {
            map.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_override(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.input_overrides {
            map.insert(port.into(), value.into());
        }
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }
}

/// One authored edge. Both handles present means a data edge, neither
/// means a control edge. Exactly one is malformed; the compiler passes
/// it through and the validator flags it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub kind: EdgeKind,
}

/// Node position in the visual editor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}
