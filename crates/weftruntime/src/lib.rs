//! Execution runtime: walks compiled definitions inside a durable
//! workflow, with declarative retry at the activity boundary and an
//! in-process substrate for local runs and tests.

pub mod activity;
pub mod local;
pub mod orchestrator;
pub mod substrate;

pub use activity::ActivityInvoker;
pub use local::{LocalSubstrate, WORKFLOW_TYPE_PIPELINE};
pub use orchestrator::{ActionStatus, Orchestrator, RunContext};
pub use substrate::{DurableSubstrate, WorkflowInfo, WorkflowStatus};
