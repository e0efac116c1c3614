use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signal asking a running workflow to execute a tool call.
pub const SIGNAL_TOOL_CALL: &str = "tool-call";
/// Signal from the gateway acknowledging a delivered tool result, so
/// the run's trace can reflect tool usage.
pub const SIGNAL_TOOL_CALL_COMPLETED: &str = "tool-call-completed";

/// Query for the result of a tool call by call id.
pub const QUERY_TOOL_CALL_RESULT: &str = "tool-call-result";
/// Query for a run's current status.
pub const QUERY_RUN_STATUS: &str = "run-status";
/// Query for a completed action's recorded output by ref.
pub const QUERY_ACTION_OUTPUT: &str = "action-output";

/// Tool-call request injected into a running workflow via signal. The
/// credentials field holds decrypted material resolved at the point of
/// use; it must never be logged or persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub node_id: String,
    pub component: String,
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Value>,
    pub requested_at: DateTime<Utc>,
}

/// Recorded outcome of a tool call, queryable by call id within the
/// owning run. At most one record ever exists per call id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallRecord {
    pub fn success(call_id: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failure(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Completion acknowledgement sent back to the workflow after the
/// gateway has returned a result to the synchronous caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallCompletion {
    pub call_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serde_skips_absent_credentials() {
        let request = ToolCallRequest {
            call_id: "r:n:1".into(),
            node_id: "n".into(),
            component: "tool.search".into(),
            arguments: json!({"q": "weather"}),
            credentials: None,
            requested_at: Utc::now(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("credentials").is_none());

        let back: ToolCallRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back.call_id, "r:n:1");
    }

    #[test]
    fn record_constructors() {
        let ok = ToolCallRecord::success("c1", json!({"answer": 42}));
        assert!(ok.success && ok.error.is_none());

        let bad = ToolCallRecord::failure("c2", "boom");
        assert!(!bad.success);
        assert_eq!(bad.error.as_deref(), Some("boom"));
    }
}
