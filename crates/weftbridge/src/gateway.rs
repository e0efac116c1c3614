//! Synchronous tool-call gateway.
//!
//! Bridges a blocking caller onto an asynchronous workflow: resolve the
//! tool, decrypt its credentials at the point of use, signal the run
//! with the call, then poll the run's query surface until a result with
//! the minted call id appears or the timeout budget is spent.

use crate::credentials::CredentialStore;
use crate::registry::{ToolRegistry, ToolStatus};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weftcore::toolcall::{
    ToolCallCompletion, ToolCallRecord, ToolCallRequest, QUERY_TOOL_CALL_RESULT, SIGNAL_TOOL_CALL,
    SIGNAL_TOOL_CALL_COMPLETED,
};
use weftcore::{BridgeError, RunId};
use weftruntime::DurableSubstrate;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ToolCallGateway {
    substrate: Arc<dyn DurableSubstrate>,
    tools: Arc<ToolRegistry>,
    credentials: Arc<dyn CredentialStore>,
    poll_interval: Duration,
    timeout: Duration,
    call_seq: AtomicU64,
}

impl ToolCallGateway {
    pub fn new(
        substrate: Arc<dyn DurableSubstrate>,
        tools: Arc<ToolRegistry>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            substrate,
            tools,
            credentials,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_CALL_TIMEOUT,
            call_seq: AtomicU64::new(0),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute one tool call against a running workflow and wait for
    /// its result.
    pub async fn call(
        &self,
        run_id: RunId,
        node_id: &str,
        arguments: Value,
    ) -> Result<Value, BridgeError> {
        let tool = self
            .tools
            .get(run_id, node_id)
            .await
            .ok_or_else(|| BridgeError::ToolNotFound(node_id.to_string()))?;
        if tool.status != ToolStatus::Ready {
            return Err(BridgeError::ToolNotReady {
                node: node_id.to_string(),
                status: tool.status.to_string(),
            });
        }

        // Decrypt only here, directly into the signal payload.
        let credentials = match &tool.encrypted_credentials {
            Some(handle) => Some(self.credentials.open(handle).await?),
            None => None,
        };

        // Timestamp for traceability, counter for uniqueness: concurrent
        // calls to the same node within one millisecond must never share
        // a call id.
        let seq = self.call_seq.fetch_add(1, Ordering::Relaxed);
        let call_id = format!(
            "{run_id}:{node_id}:{}-{seq}",
            Utc::now().timestamp_millis()
        );
        tracing::info!(
            run_id = %run_id,
            node_id = %node_id,
            call_id = %call_id,
            tool = %tool.tool_name,
            "dispatching tool call"
        );

        let request = ToolCallRequest {
            call_id: call_id.clone(),
            node_id: node_id.to_string(),
            component: tool.tool_name.clone(),
            arguments,
            credentials,
            requested_at: Utc::now(),
        };
        let payload =
            serde_json::to_value(&request).map_err(|e| BridgeError::Substrate(e.to_string()))?;
        self.substrate
            .signal_workflow(run_id, SIGNAL_TOOL_CALL, payload)
            .await
            .map_err(|e| BridgeError::Substrate(e.to_string()))?;

        let record = self.poll_result(run_id, &call_id).await?;
        let status = if record.success { "completed" } else { "failed" };
        let completion = ToolCallCompletion {
            call_id: call_id.clone(),
            status: status.to_string(),
            output: record.output.clone(),
        };
        // Best-effort acknowledgement; the result is already final.
        if let Ok(payload) = serde_json::to_value(&completion) {
            if let Err(err) = self
                .substrate
                .signal_workflow(run_id, SIGNAL_TOOL_CALL_COMPLETED, payload)
                .await
            {
                tracing::warn!(call_id = %call_id, error = %err, "completion acknowledgement failed");
            }
        }

        if record.success {
            Ok(record.output.unwrap_or(Value::Null))
        } else {
            Err(BridgeError::CallFailed {
                call_id,
                message: record.error.unwrap_or_else(|| "tool call failed".into()),
            })
        }
    }

    async fn poll_result(
        &self,
        run_id: RunId,
        call_id: &str,
    ) -> Result<ToolCallRecord, BridgeError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            let result = self
                .substrate
                .query_workflow(run_id, QUERY_TOOL_CALL_RESULT, json!({"call_id": call_id}))
                .await
                .map_err(|e| BridgeError::Substrate(e.to_string()))?;
            if let Some(value) = result {
                return serde_json::from_value(value)
                    .map_err(|e| BridgeError::Substrate(e.to_string()));
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(BridgeError::Timeout {
                    call_id: call_id.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
