//! Core abstractions for the weft pipeline engine.
//!
//! This crate provides the data model and traits that the compiler,
//! validator, orchestrator and tool-call bridge depend on: the
//! authoring graph, the compiled definition, the component contract,
//! the trace model and the shared error taxonomy.

pub mod component;
pub mod definition;
mod error;
pub mod graph;
pub mod schema;
pub mod toolcall;
pub mod trace;

pub use component::{
    Component, ComponentRegistry, ExecutionContext, PortSpec, StaticPorts, ENTRYPOINT_COMPONENT,
};
pub use definition::{
    Action, CompiledEdge, EdgeKind, InputMapping, NodeMetadata, RetryOverride, RetryPolicy,
    WorkflowConfig, WorkflowDefinition,
};
pub use error::{BridgeError, CompileError, ExecutionError, WeftError};
pub use graph::{GraphEdge, GraphNode, Position, WorkflowGraph};
pub use schema::{
    ConnectionType, FindingKind, ParamField, ParamKind, ParameterSchema, Port, PortSchema,
    RuntimeInputDef, SchemaFinding,
};
pub use toolcall::{ToolCallCompletion, ToolCallRecord, ToolCallRequest};
pub use trace::{
    summarize_output, MemoryTraceSink, RunId, TraceDraft, TraceEvent, TraceKind, TraceLevel,
    TraceRecorder, TraceSink,
};

/// Result type for weft operations.
pub type Result<T> = std::result::Result<T, WeftError>;
