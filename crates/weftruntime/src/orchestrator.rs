use crate::activity::ActivityInvoker;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use weftcore::{
    Action, ComponentRegistry, ExecutionContext, ExecutionError, RunId, TraceRecorder,
    WorkflowDefinition,
};

/// Per-action lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Shared mutable state of one run: action statuses and recorded
/// outputs, queryable while the run progresses and after it ends.
pub struct RunContext {
    pub run_id: RunId,
    pub recorder: TraceRecorder,
    pub cancellation: CancellationToken,
    statuses: Mutex<HashMap<String, ActionStatus>>,
    outputs: Mutex<HashMap<String, Value>>,
}

impl RunContext {
    pub fn new(run_id: RunId, recorder: TraceRecorder, cancellation: CancellationToken) -> Self {
        Self {
            run_id,
            recorder,
            cancellation,
            statuses: Mutex::new(HashMap::new()),
            outputs: Mutex::new(HashMap::new()),
        }
    }

    pub fn status(&self, node_ref: &str) -> Option<ActionStatus> {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(node_ref)
            .copied()
    }

    /// Output recorded for a completed action. Outputs of completed
    /// actions remain queryable even after a later action fails.
    pub fn output(&self, node_ref: &str) -> Option<Value> {
        self.outputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(node_ref)
            .cloned()
    }

    fn set_status(&self, node_ref: &str, status: ActionStatus) {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(node_ref.to_string(), status);
    }

    fn record_output(&self, node_ref: &str, output: Value) {
        self.outputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(node_ref.to_string(), output);
    }
}

/// Walks a compiled definition inside a durable workflow, strictly in
/// action-list order (which already satisfies the dependency
/// invariant), emitting one trace event per lifecycle transition.
pub struct Orchestrator {
    registry: Arc<ComponentRegistry>,
    invoker: ActivityInvoker,
}

impl Orchestrator {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            invoker: ActivityInvoker::new(),
        }
    }

    /// Execute every action in order. Fail-fast: the first failure
    /// aborts the remainder of the run.
    pub async fn run(
        &self,
        definition: &WorkflowDefinition,
        runtime_inputs: &Value,
        run: &RunContext,
    ) -> Result<(), ExecutionError> {
        for action in &definition.actions {
            run.set_status(&action.node_ref, ActionStatus::Pending);
        }

        tracing::info!(
            run_id = %run.run_id,
            title = %definition.title,
            actions = definition.actions.len(),
            "starting run"
        );

        for action in &definition.actions {
            if run.cancellation.is_cancelled() {
                tracing::info!(run_id = %run.run_id, node = %action.node_ref, "run cancelled, skipping remaining actions");
                return Err(ExecutionError::Cancelled);
            }
            self.execute_action(definition, action, runtime_inputs, run)
                .await?;
        }

        tracing::info!(run_id = %run.run_id, "run completed");
        Ok(())
    }

    async fn execute_action(
        &self,
        definition: &WorkflowDefinition,
        action: &Action,
        runtime_inputs: &Value,
        run: &RunContext,
    ) -> Result<(), ExecutionError> {
        let component = match self.registry.get(&action.component) {
            Some(c) => c,
            None => {
                let err = ExecutionError::UnknownComponent(action.component.clone());
                run.set_status(&action.node_ref, ActionStatus::Failed);
                run.recorder.failed(&action.node_ref, &err.to_string());
                return Err(err);
            }
        };

        let is_entrypoint = definition.entrypoint_ref.as_deref() == Some(action.node_ref.as_str());
        let params = if is_entrypoint {
            merge_params(&action.params, runtime_inputs)
        } else {
            action.params.clone()
        };
        let inputs = resolve_inputs(action, run);

        run.set_status(&action.node_ref, ActionStatus::Running);
        run.recorder.started(&action.node_ref);

        let ctx = ExecutionContext {
            run_id: run.run_id,
            node_ref: action.node_ref.clone(),
            params,
            inputs,
            recorder: run.recorder.clone(),
            cancellation: run.cancellation.clone(),
        };

        match self
            .invoker
            .invoke(component, ctx, action.retry_policy.as_ref())
            .await
        {
            Ok(output) => {
                run.set_status(&action.node_ref, ActionStatus::Completed);
                run.recorder.completed(&action.node_ref, Some(&output));
                run.record_output(&action.node_ref, output);
                Ok(())
            }
            Err(err) => {
                tracing::error!(run_id = %run.run_id, node = %action.node_ref, error = %err, "action failed");
                run.set_status(&action.node_ref, ActionStatus::Failed);
                run.recorder.failed(&action.node_ref, &err.to_string());
                Err(err)
            }
        }
    }
}

/// Merge entry-point runtime inputs over static params. Runtime values
/// win on key collisions.
fn merge_params(params: &Value, runtime_inputs: &Value) -> Value {
    let mut merged = params.clone();
    if let (Value::Object(base), Some(extra)) = (&mut merged, runtime_inputs.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Resolve input-port values for an action: mapped values from
/// upstream outputs first, static overrides for the rest.
fn resolve_inputs(action: &Action, run: &RunContext) -> HashMap<String, Value> {
    let mut inputs = HashMap::new();

    if let Some(overrides) = action.input_overrides.as_object() {
        for (port, value) in overrides {
            if !value.is_null() {
                inputs.insert(port.clone(), value.clone());
            }
        }
    }

    for (port, mapping) in &action.input_mappings {
        if let Some(output) = run.output(&mapping.source_ref) {
            // An object output keyed by port names is unwrapped to the
            // mapped handle; any other shape flows through whole.
            let value = match output.get(&mapping.source_handle) {
                Some(field) => field.clone(),
                None => output,
            };
            inputs.insert(port.clone(), value);
        }
    }

    inputs
}
