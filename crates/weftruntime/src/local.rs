//! In-process durable substrate.
//!
//! Hosts each run as a tokio task over shared, queryable state. This
//! backs local execution and tests; a production deployment plugs a
//! real durable-workflow service into the same [`DurableSubstrate`]
//! contract.

use crate::orchestrator::{Orchestrator, RunContext};
use crate::substrate::{DurableSubstrate, WorkflowInfo, WorkflowStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use weftcore::toolcall::{
    ToolCallCompletion, ToolCallRecord, ToolCallRequest, QUERY_ACTION_OUTPUT, QUERY_RUN_STATUS,
    QUERY_TOOL_CALL_RESULT, SIGNAL_TOOL_CALL, SIGNAL_TOOL_CALL_COMPLETED,
};
use weftcore::{
    ComponentRegistry, ExecutionContext, ExecutionError, RunId, TraceDraft, TraceRecorder,
    TraceSink, WorkflowDefinition,
};

/// Workflow type hosting a compiled pipeline definition.
pub const WORKFLOW_TYPE_PIPELINE: &str = "pipeline-run";

#[derive(Deserialize)]
struct StartArgs {
    definition: WorkflowDefinition,
    #[serde(default)]
    runtime_inputs: Value,
}

struct LocalRun {
    context: Arc<RunContext>,
    status: Mutex<WorkflowStatus>,
    start_time: DateTime<Utc>,
    close_time: Mutex<Option<DateTime<Utc>>>,
    signals: AtomicU64,
    tool_results: Mutex<HashMap<String, ToolCallRecord>>,
    pending_calls: Mutex<HashSet<String>>,
}

impl LocalRun {
    fn status(&self) -> WorkflowStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn close(&self, status: WorkflowStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
        *self.close_time.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
    }

    fn tool_result(&self, call_id: &str) -> Option<ToolCallRecord> {
        self.tool_results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(call_id)
            .cloned()
    }

    fn record_tool_result(&self, record: ToolCallRecord) {
        let mut results = self.tool_results.lock().unwrap_or_else(|e| e.into_inner());
        // At most one result per call id, ever.
        results.entry(record.call_id.clone()).or_insert(record);
    }
}

pub struct LocalSubstrate {
    registry: Arc<ComponentRegistry>,
    sink: Arc<dyn TraceSink>,
    runs: RwLock<HashMap<RunId, Arc<LocalRun>>>,
}

impl LocalSubstrate {
    pub fn new(registry: Arc<ComponentRegistry>, sink: Arc<dyn TraceSink>) -> Self {
        Self {
            registry,
            sink,
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub fn trace(&self) -> Arc<dyn TraceSink> {
        self.sink.clone()
    }

    /// Convenience wrapper over [`DurableSubstrate::start_workflow`]
    /// for pipeline runs: mints the run id and packs the start args.
    pub async fn start_run(
        &self,
        definition: &WorkflowDefinition,
        runtime_inputs: Value,
    ) -> Result<RunId, ExecutionError> {
        let run_id = RunId::new_v4();
        let args = json!({
            "definition": definition,
            "runtime_inputs": runtime_inputs,
        });
        self.start_workflow(WORKFLOW_TYPE_PIPELINE, run_id, args)
            .await?;
        Ok(run_id)
    }

    /// Poll until the run reaches a terminal status or the timeout
    /// elapses.
    pub async fn wait_for_close(
        &self,
        run_id: RunId,
        timeout: Duration,
    ) -> Result<WorkflowInfo, ExecutionError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let info = self.describe_workflow(run_id).await?;
            if info.status.is_terminal() {
                return Ok(info);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ExecutionError::Failed(format!(
                    "run {run_id} still open after {timeout:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn run(&self, run_id: RunId) -> Result<Arc<LocalRun>, ExecutionError> {
        self.runs
            .read()
            .await
            .get(&run_id)
            .cloned()
            .ok_or_else(|| ExecutionError::RunNotFound(run_id.to_string()))
    }

    fn handle_tool_call(&self, run: Arc<LocalRun>, payload: Value) -> Result<(), ExecutionError> {
        let request: ToolCallRequest =
            serde_json::from_value(payload).map_err(|e| ExecutionError::InvalidParams(e.to_string()))?;

        {
            let results = run.tool_results.lock().unwrap_or_else(|e| e.into_inner());
            let mut pending = run.pending_calls.lock().unwrap_or_else(|e| e.into_inner());
            if results.contains_key(&request.call_id) || !pending.insert(request.call_id.clone()) {
                // Duplicate signal for an already known call id.
                tracing::debug!(call_id = %request.call_id, "ignoring duplicate tool-call signal");
                return Ok(());
            }
        }

        let registry = self.registry.clone();
        let run_for_task = run.clone();
        tokio::spawn(async move {
            let record = execute_tool_call(&registry, &run_for_task, &request).await;
            run_for_task.record_tool_result(record);
            run_for_task
                .pending_calls
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&request.call_id);
        });
        Ok(())
    }

    fn handle_tool_call_completed(
        &self,
        run: &LocalRun,
        payload: Value,
    ) -> Result<(), ExecutionError> {
        let completion: ToolCallCompletion =
            serde_json::from_value(payload).map_err(|e| ExecutionError::InvalidParams(e.to_string()))?;

        // Call ids are "{run}:{node}:{millis}"; attribute the event to
        // the node when the id carries one.
        let node_ref = completion
            .call_id
            .split(':')
            .nth(1)
            .unwrap_or("tool-call")
            .to_string();
        run.context.recorder.append(
            TraceDraft::progress(
                node_ref,
                format!("tool call {} {}", completion.call_id, completion.status),
            )
            .with_data(json!({
                "call_id": completion.call_id,
                "status": completion.status,
            })),
        );
        Ok(())
    }
}

/// Execute the signaled component with the request's arguments and
/// decrypted credentials, inside the run's context.
async fn execute_tool_call(
    registry: &ComponentRegistry,
    run: &LocalRun,
    request: &ToolCallRequest,
) -> ToolCallRecord {
    let component = match registry.get(&request.component) {
        Some(c) => c,
        None => {
            return ToolCallRecord::failure(
                &request.call_id,
                format!("unknown component: {}", request.component),
            )
        }
    };

    let mut params = request.arguments.clone();
    if let Some(credentials) = &request.credentials {
        if let Value::Object(map) = &mut params {
            map.insert("credentials".to_string(), credentials.clone());
        }
    }

    let ctx = ExecutionContext {
        run_id: run.context.run_id,
        node_ref: request.node_id.clone(),
        params,
        inputs: HashMap::new(),
        recorder: run.context.recorder.clone(),
        cancellation: run.context.cancellation.child_token(),
    };

    match component.execute(ctx).await {
        Ok(output) => ToolCallRecord::success(&request.call_id, output),
        Err(err) => ToolCallRecord::failure(&request.call_id, err.to_string()),
    }
}

#[async_trait]
impl DurableSubstrate for LocalSubstrate {
    async fn start_workflow(
        &self,
        workflow_type: &str,
        run_id: RunId,
        args: Value,
    ) -> Result<(), ExecutionError> {
        if workflow_type != WORKFLOW_TYPE_PIPELINE {
            return Err(ExecutionError::InvalidParams(format!(
                "unknown workflow type: {workflow_type}"
            )));
        }
        let StartArgs {
            definition,
            runtime_inputs,
        } = serde_json::from_value(args).map_err(|e| ExecutionError::InvalidParams(e.to_string()))?;

        let mut runs = self.runs.write().await;
        if runs.contains_key(&run_id) {
            return Err(ExecutionError::InvalidParams(format!(
                "run {run_id} already exists"
            )));
        }

        let recorder = TraceRecorder::new(run_id, self.sink.clone());
        let context = Arc::new(RunContext::new(
            run_id,
            recorder,
            CancellationToken::new(),
        ));
        let run = Arc::new(LocalRun {
            context: context.clone(),
            status: Mutex::new(WorkflowStatus::Running),
            start_time: Utc::now(),
            close_time: Mutex::new(None),
            signals: AtomicU64::new(0),
            tool_results: Mutex::new(HashMap::new()),
            pending_calls: Mutex::new(HashSet::new()),
        });
        runs.insert(run_id, run.clone());
        drop(runs);

        let orchestrator = Orchestrator::new(self.registry.clone());
        tokio::spawn(async move {
            let result = orchestrator.run(&definition, &runtime_inputs, &context).await;
            let status = match result {
                Ok(()) => WorkflowStatus::Completed,
                Err(ExecutionError::Cancelled) => WorkflowStatus::Cancelled,
                Err(_) => WorkflowStatus::Failed,
            };
            run.close(status);
        });
        Ok(())
    }

    async fn signal_workflow(
        &self,
        run_id: RunId,
        signal: &str,
        payload: Value,
    ) -> Result<(), ExecutionError> {
        let run = self.run(run_id).await?;
        run.signals.fetch_add(1, Ordering::Relaxed);
        match signal {
            SIGNAL_TOOL_CALL => self.handle_tool_call(run, payload),
            SIGNAL_TOOL_CALL_COMPLETED => self.handle_tool_call_completed(&run, payload),
            other => Err(ExecutionError::InvalidParams(format!(
                "unknown signal: {other}"
            ))),
        }
    }

    async fn query_workflow(
        &self,
        run_id: RunId,
        query: &str,
        args: Value,
    ) -> Result<Option<Value>, ExecutionError> {
        let run = self.run(run_id).await?;
        match query {
            QUERY_TOOL_CALL_RESULT => {
                let call_id = args
                    .get("call_id")
                    .and_then(Value::as_str)
                    .or_else(|| args.as_str())
                    .ok_or_else(|| {
                        ExecutionError::InvalidParams("tool-call-result needs a call_id".into())
                    })?;
                Ok(run
                    .tool_result(call_id)
                    .map(|r| serde_json::to_value(r).unwrap_or(Value::Null)))
            }
            QUERY_RUN_STATUS => Ok(Some(
                serde_json::to_value(run.status()).unwrap_or(Value::Null),
            )),
            QUERY_ACTION_OUTPUT => {
                let node_ref = args
                    .get("node_ref")
                    .and_then(Value::as_str)
                    .or_else(|| args.as_str())
                    .ok_or_else(|| {
                        ExecutionError::InvalidParams("action-output needs a node_ref".into())
                    })?;
                Ok(run.context.output(node_ref))
            }
            other => Err(ExecutionError::InvalidParams(format!(
                "unknown query: {other}"
            ))),
        }
    }

    async fn cancel_workflow(&self, run_id: RunId) -> Result<(), ExecutionError> {
        let run = self.run(run_id).await?;
        tracing::info!(run_id = %run_id, "cancel requested");
        run.context.cancellation.cancel();
        Ok(())
    }

    async fn describe_workflow(&self, run_id: RunId) -> Result<WorkflowInfo, ExecutionError> {
        let run = self.run(run_id).await?;
        let trace_len = self.sink.list_after_sequence(run_id, 0).len() as u64;
        let close_time = *run.close_time.lock().unwrap_or_else(|e| e.into_inner());
        Ok(WorkflowInfo {
            status: run.status(),
            start_time: run.start_time,
            close_time,
            history_length: trace_len + run.signals.load(Ordering::Relaxed),
        })
    }
}
