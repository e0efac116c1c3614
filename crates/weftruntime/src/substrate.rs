use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use weftcore::{ExecutionError, RunId};

/// Terminal and in-flight states of a durable workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::Running)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub status: WorkflowStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub close_time: Option<DateTime<Utc>>,
    pub history_length: u64,
}

/// Contract of the durable-workflow substrate: a crash-resumable
/// execution context that can receive asynchronous signals and answer
/// synchronous queries while long-running.
///
/// The orchestrator runs *inside* a workflow hosted by an
/// implementation of this trait; the tool-call gateway talks to it
/// from the outside.
#[async_trait]
pub trait DurableSubstrate: Send + Sync {
    /// Start a workflow of the given type. `args` carries the
    /// workflow-type-specific start payload.
    async fn start_workflow(
        &self,
        workflow_type: &str,
        run_id: RunId,
        args: Value,
    ) -> Result<(), ExecutionError>;

    /// Deliver a signal to a running workflow. Asynchronous relative to
    /// the workflow's own control loop.
    async fn signal_workflow(
        &self,
        run_id: RunId,
        signal: &str,
        payload: Value,
    ) -> Result<(), ExecutionError>;

    /// Synchronous query against workflow state. `None` means the
    /// queried value does not (yet) exist.
    async fn query_workflow(
        &self,
        run_id: RunId,
        query: &str,
        args: Value,
    ) -> Result<Option<Value>, ExecutionError>;

    /// Request cancellation: remaining actions are skipped, in-flight
    /// work is not forcibly interrupted.
    async fn cancel_workflow(&self, run_id: RunId) -> Result<(), ExecutionError>;

    async fn describe_workflow(&self, run_id: RunId) -> Result<WorkflowInfo, ExecutionError>;
}
