use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeftError {
    #[error("Compilation error: {0}")]
    Compile(#[from] CompileError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while turning an authored graph into a definition.
/// Always fatal and never partially applied: a failed compile produces
/// no definition at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Workflow graph contains a cycle")]
    Cycle,

    #[error("Unknown component '{component}'. Known components: {}", suggestions.join(", "))]
    UnknownComponent {
        component: String,
        suggestions: Vec<String>,
    },

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Edge '{edge}' references missing node '{node}'")]
    MissingNode { edge: String, node: String },
}

#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{message}")]
    Typed { error_type: String, message: String },

    #[error("{0}")]
    Failed(String),
}

impl ExecutionError {
    /// Stable error-type tag used by retry policies to match
    /// non-retryable lists and per-error overrides.
    pub fn error_type(&self) -> &str {
        match self {
            ExecutionError::UnknownComponent(_) => "unknown_component",
            ExecutionError::MissingInput(_) => "missing_input",
            ExecutionError::InvalidParams(_) => "invalid_params",
            ExecutionError::RunNotFound(_) => "run_not_found",
            ExecutionError::Cancelled => "cancelled",
            ExecutionError::Typed { error_type, .. } => error_type,
            ExecutionError::Failed(_) => "failed",
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("No tool registered for node '{0}'")]
    ToolNotFound(String),

    #[error("Tool for node '{node}' is not ready (status: {status})")]
    ToolNotReady { node: String, status: String },

    #[error("Tool registry for run '{0}' has expired")]
    RegistryExpired(String),

    #[error("Tool call '{call_id}' timed out after {timeout_ms}ms")]
    Timeout { call_id: String, timeout_ms: u64 },

    #[error("Tool call '{call_id}' failed: {message}")]
    CallFailed { call_id: String, message: String },

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Substrate error: {0}")]
    Substrate(String),
}
