use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub type RunId = Uuid;

/// One lifecycle transition within a run. Append-only: never mutated
/// after creation. `sequence` is per-run, monotonic and gap-free; it is
/// the cursor contract for streaming consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub run_id: RunId,
    pub node_ref: String,
    pub sequence: u64,
    pub kind: TraceKind,
    pub timestamp: DateTime<Utc>,
    pub level: TraceLevel,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub output_summary: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceKind {
    Started,
    Progress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Info,
    Warn,
    Error,
}

/// Event payload before the sink assigns its sequence number.
#[derive(Debug, Clone)]
pub struct TraceDraft {
    pub node_ref: String,
    pub kind: TraceKind,
    pub level: TraceLevel,
    pub message: Option<String>,
    pub error: Option<String>,
    pub output_summary: Option<String>,
    pub data: Option<Value>,
}

impl TraceDraft {
    pub fn started(node_ref: impl Into<String>) -> Self {
        Self::new(node_ref, TraceKind::Started, TraceLevel::Info)
    }

    pub fn progress(node_ref: impl Into<String>, message: impl Into<String>) -> Self {
        let mut draft = Self::new(node_ref, TraceKind::Progress, TraceLevel::Info);
        draft.message = Some(message.into());
        draft
    }

    pub fn completed(node_ref: impl Into<String>, output_summary: Option<String>) -> Self {
        let mut draft = Self::new(node_ref, TraceKind::Completed, TraceLevel::Info);
        draft.output_summary = output_summary;
        draft
    }

    pub fn failed(node_ref: impl Into<String>, error: impl Into<String>) -> Self {
        let mut draft = Self::new(node_ref, TraceKind::Failed, TraceLevel::Error);
        draft.error = Some(error.into());
        draft
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    fn new(node_ref: impl Into<String>, kind: TraceKind, level: TraceLevel) -> Self {
        Self {
            node_ref: node_ref.into(),
            kind,
            level,
            message: None,
            error: None,
            output_summary: None,
            data: None,
        }
    }
}

/// Append-only trace log. Implementations assign sequence numbers at
/// append time, under whatever synchronization they use, so that
/// readers never observe a gap or an out-of-order event.
pub trait TraceSink: Send + Sync {
    fn append(&self, run_id: RunId, draft: TraceDraft) -> TraceEvent;

    /// Events with `sequence > after`, in sequence order. `after = 0`
    /// streams from the beginning.
    fn list_after_sequence(&self, run_id: RunId, after: u64) -> Vec<TraceEvent>;
}

/// In-memory trace sink. Sequences start at 1 per run.
#[derive(Default)]
pub struct MemoryTraceSink {
    runs: Mutex<HashMap<RunId, Vec<TraceEvent>>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceSink for MemoryTraceSink {
    fn append(&self, run_id: RunId, draft: TraceDraft) -> TraceEvent {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        let log = runs.entry(run_id).or_default();
        let event = TraceEvent {
            run_id,
            node_ref: draft.node_ref,
            sequence: log.len() as u64 + 1,
            kind: draft.kind,
            timestamp: Utc::now(),
            level: draft.level,
            message: draft.message,
            error: draft.error,
            output_summary: draft.output_summary,
            data: draft.data,
        };
        log.push(event.clone());
        event
    }

    fn list_after_sequence(&self, run_id: RunId, after: u64) -> Vec<TraceEvent> {
        let runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        runs.get(&run_id)
            .map(|log| {
                log.iter()
                    .filter(|e| e.sequence > after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Run-scoped handle for emitting trace events. Cloned into execution
/// contexts so components can report progress on their own node.
#[derive(Clone)]
pub struct TraceRecorder {
    run_id: RunId,
    sink: Arc<dyn TraceSink>,
}

impl TraceRecorder {
    pub fn new(run_id: RunId, sink: Arc<dyn TraceSink>) -> Self {
        Self { run_id, sink }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn started(&self, node_ref: &str) -> TraceEvent {
        self.sink.append(self.run_id, TraceDraft::started(node_ref))
    }

    pub fn progress(&self, node_ref: &str, message: impl Into<String>) -> TraceEvent {
        self.sink
            .append(self.run_id, TraceDraft::progress(node_ref, message))
    }

    pub fn completed(&self, node_ref: &str, output: Option<&Value>) -> TraceEvent {
        self.sink.append(
            self.run_id,
            TraceDraft::completed(node_ref, output.map(summarize_output)),
        )
    }

    pub fn failed(&self, node_ref: &str, error: &str) -> TraceEvent {
        self.sink
            .append(self.run_id, TraceDraft::failed(node_ref, error))
    }

    pub fn append(&self, draft: TraceDraft) -> TraceEvent {
        self.sink.append(self.run_id, draft)
    }
}

const SUMMARY_MAX_CHARS: usize = 200;

/// Compact, human-readable rendering of an action output for trace
/// events. Full outputs stay in run state; the trace carries a preview.
pub fn summarize_output(output: &Value) -> String {
    let rendered = match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.chars().count() <= SUMMARY_MAX_CHARS {
        rendered
    } else {
        let truncated: String = rendered.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequences_are_gap_free_and_per_run() {
        let sink = MemoryTraceSink::new();
        let run_a = Uuid::new_v4();
        let run_b = Uuid::new_v4();

        sink.append(run_a, TraceDraft::started("n1"));
        sink.append(run_b, TraceDraft::started("n1"));
        sink.append(run_a, TraceDraft::completed("n1", None));

        let events_a = sink.list_after_sequence(run_a, 0);
        assert_eq!(
            events_a.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![1, 2]
        );
        let events_b = sink.list_after_sequence(run_b, 0);
        assert_eq!(events_b[0].sequence, 1);
    }

    #[test]
    fn cursor_resumes_after_any_sequence() {
        let sink = MemoryTraceSink::new();
        let run = Uuid::new_v4();
        for i in 0..5 {
            sink.append(run, TraceDraft::progress("n", format!("step {i}")));
        }

        let tail = sink.list_after_sequence(run, 3);
        assert_eq!(
            tail.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            vec![4, 5]
        );
        assert!(sink.list_after_sequence(run, 5).is_empty());
    }

    #[test]
    fn summarize_truncates_long_output() {
        let long = "x".repeat(500);
        let summary = summarize_output(&json!(long));
        assert!(summary.chars().count() <= SUMMARY_MAX_CHARS + 1);
        assert!(summary.ends_with('…'));
        assert_eq!(summarize_output(&json!("short")), "short");
    }

    #[test]
    fn trace_event_serializes_with_screaming_kind() {
        let sink = MemoryTraceSink::new();
        let event = sink.append(Uuid::new_v4(), TraceDraft::started("n1"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "STARTED");
        assert_eq!(json["level"], "info");
    }
}
