//! Run-scoped tool registry.
//!
//! Tools are registered per run while its workflow is being prepared,
//! looked up by the gateway at call time, and swept when the run ends.
//! Every run scope carries a TTL so abandoned runs cannot leak
//! registrations or their encrypted credential blobs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use weftcore::RunId;

pub const DEFAULT_REGISTRY_TTL: Duration = Duration::from_secs(60 * 60);

/// How a registered tool executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Backed by a registered in-process component.
    Component,
    /// Backed by a remote MCP endpoint.
    RemoteMcp,
    /// Backed by a locally provisioned MCP container.
    LocalMcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Registered but still provisioning.
    Pending,
    Ready,
    Error,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStatus::Pending => write!(f, "pending"),
            ToolStatus::Ready => write!(f, "ready"),
            ToolStatus::Error => write!(f, "error"),
        }
    }
}

/// One tool bound to a node of a run. Credentials are stored encrypted
/// and only decrypted by the gateway at the moment of a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredTool {
    pub node_id: String,
    pub tool_name: String,
    pub kind: ToolKind,
    pub status: ToolStatus,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

impl RegisteredTool {
    pub fn component(node_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            tool_name: tool_name.into(),
            kind: ToolKind::Component,
            status: ToolStatus::Ready,
            input_schema: Value::Null,
            encrypted_credentials: None,
            endpoint: None,
            container_id: None,
        }
    }

    pub fn with_status(mut self, status: ToolStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_credentials(mut self, encrypted: impl Into<String>) -> Self {
        self.encrypted_credentials = Some(encrypted.into());
        self
    }
}

struct RunScope {
    tools: HashMap<String, RegisteredTool>,
    expires_at: Instant,
}

/// Registry of tools keyed by run, then by node id within the run.
pub struct ToolRegistry {
    ttl: Duration,
    runs: RwLock<HashMap<RunId, RunScope>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_REGISTRY_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            runs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool under a run, creating the run scope on first
    /// registration. Registering refreshes the scope's TTL.
    pub async fn register(&self, run_id: RunId, tool: RegisteredTool) {
        let mut runs = self.runs.write().await;
        let scope = runs.entry(run_id).or_insert_with(|| RunScope {
            tools: HashMap::new(),
            expires_at: Instant::now() + self.ttl,
        });
        scope.expires_at = Instant::now() + self.ttl;
        tracing::debug!(
            run_id = %run_id,
            node_id = %tool.node_id,
            tool = %tool.tool_name,
            kind = ?tool.kind,
            "registering tool"
        );
        scope.tools.insert(tool.node_id.clone(), tool);
    }

    /// Look up the tool bound to a node. An expired run scope behaves
    /// exactly like an absent one.
    pub async fn get(&self, run_id: RunId, node_id: &str) -> Option<RegisteredTool> {
        let runs = self.runs.read().await;
        let scope = runs.get(&run_id)?;
        if scope.expires_at <= Instant::now() {
            return None;
        }
        scope.tools.get(node_id).cloned()
    }

    /// Update the provisioning status of a registered tool. Returns
    /// false when the run scope or tool is absent or expired.
    pub async fn set_status(&self, run_id: RunId, node_id: &str, status: ToolStatus) -> bool {
        let mut runs = self.runs.write().await;
        let Some(scope) = runs.get_mut(&run_id) else {
            return false;
        };
        if scope.expires_at <= Instant::now() {
            return false;
        }
        match scope.tools.get_mut(node_id) {
            Some(tool) => {
                tool.status = status;
                true
            }
            None => false,
        }
    }

    /// True when every listed node has a Ready tool in this run.
    pub async fn all_ready(&self, run_id: RunId, node_ids: &[&str]) -> bool {
        let runs = self.runs.read().await;
        let Some(scope) = runs.get(&run_id) else {
            return false;
        };
        if scope.expires_at <= Instant::now() {
            return false;
        }
        node_ids.iter().all(|id| {
            scope
                .tools
                .get(*id)
                .map(|t| t.status == ToolStatus::Ready)
                .unwrap_or(false)
        })
    }

    /// Drop the run scope and return the container ids of its locally
    /// provisioned tools so the caller can tear them down.
    pub async fn cleanup(&self, run_id: RunId) -> Vec<String> {
        let mut runs = self.runs.write().await;
        let Some(scope) = runs.remove(&run_id) else {
            return Vec::new();
        };
        let containers: Vec<String> = scope
            .tools
            .into_values()
            .filter(|t| t.kind == ToolKind::LocalMcp)
            .filter_map(|t| t.container_id)
            .collect();
        tracing::debug!(run_id = %run_id, containers = containers.len(), "cleaned up tool registry scope");
        containers
    }
}
