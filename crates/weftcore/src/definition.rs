use crate::graph::Position;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Compiled, execution-ready workflow plan. Immutable once produced and
/// re-derivable from its [`WorkflowGraph`](crate::graph::WorkflowGraph):
/// compiling the same graph twice yields an identical definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub title: String,
    /// Ref of the entry-point action, when exactly one exists. The
    /// validator rejects definitions where this is ambiguous or absent.
    pub entrypoint_ref: Option<String>,
    pub nodes: HashMap<String, NodeMetadata>,
    /// Topologically ordered: every ref in an action's `depends_on`
    /// appears strictly earlier in this list.
    pub actions: Vec<Action>,
    pub edges: Vec<CompiledEdge>,
    /// Number of distinct source nodes with an edge into each ref.
    pub dependency_counts: HashMap<String, usize>,
    pub config: WorkflowConfig,
}

impl WorkflowDefinition {
    pub fn action(&self, node_ref: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.node_ref == node_ref)
    }

    pub fn entrypoint(&self) -> Option<&Action> {
        self.entrypoint_ref.as_deref().and_then(|r| self.action(r))
    }
}

/// Metadata kept per node for inspection surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub component: String,
    #[serde(default)]
    pub position: Option<Position>,
}

/// One compiled unit of work bound to a component id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub node_ref: String,
    pub component: String,
    pub params: Value,
    pub input_overrides: Value,
    /// Derived from edges, never authored. Distinct source refs of all
    /// edges terminating at this action.
    pub depends_on: Vec<String>,
    /// Data-edge wiring: input port id to the upstream output it reads.
    #[serde(default)]
    pub input_mappings: HashMap<String, InputMapping>,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputMapping {
    pub source_ref: String,
    pub source_handle: String,
}

/// Compiled edge. Invariant: handles are both present (data edge) or
/// both absent (control edge). A single-handle edge survives compilation
/// so the validator can report it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledEdge {
    pub id: String,
    pub source_ref: String,
    pub target_ref: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub kind: EdgeKind,
}

impl CompiledEdge {
    pub fn is_data(&self) -> bool {
        self.source_handle.is_some() && self.target_handle.is_some()
    }

    pub fn is_control(&self) -> bool {
        self.source_handle.is_none() && self.target_handle.is_none()
    }

    pub fn is_malformed(&self) -> bool {
        self.source_handle.is_some() != self.target_handle.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Success,
    Error,
}

/// Retry configuration for one action. Evaluated entirely by the
/// durable substrate's activity-invocation layer: the orchestrator
/// never loop-retries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub backoff_coefficient: f64,
    /// Error types (see `ExecutionError::error_type`) that fail
    /// immediately without further attempts.
    #[serde(default)]
    pub non_retryable: Vec<String>,
    /// Per-error-type overrides applied on top of the base policy.
    #[serde(default)]
    pub overrides: HashMap<String, RetryOverride>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval_ms: 1000,
            max_interval_ms: 30_000,
            backoff_coefficient: 2.0,
            non_retryable: Vec::new(),
            overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RetryOverride {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub initial_interval_ms: Option<u64>,
}

impl RetryPolicy {
    /// Effective attempt budget for a given error type.
    pub fn attempts_for(&self, error_type: &str) -> u32 {
        if self.non_retryable.iter().any(|t| t == error_type) {
            return 1;
        }
        self.overrides
            .get(error_type)
            .and_then(|o| o.max_attempts)
            .unwrap_or(self.max_attempts)
    }

    /// Backoff delay before the given retry attempt (1-based, so the
    /// first retry waits the initial interval).
    pub fn delay_for(&self, error_type: &str, retry: u32) -> u64 {
        let initial = self
            .overrides
            .get(error_type)
            .and_then(|o| o.initial_interval_ms)
            .unwrap_or(self.initial_interval_ms);
        let factor = self.backoff_coefficient.powi(retry.saturating_sub(1) as i32);
        ((initial as f64) * factor).min(self.max_interval_ms as f64) as u64
    }
}

/// Run-level settings carried from the authored graph into the
/// definition unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub max_run_time_ms: Option<u64>,
}
