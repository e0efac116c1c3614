//! Graph compilation and validation.
//!
//! [`compile`] turns an authored [`WorkflowGraph`](weftcore::WorkflowGraph)
//! into a deterministic, topologically ordered
//! [`WorkflowDefinition`](weftcore::WorkflowDefinition); [`validate`]
//! gatekeeps execution with accumulated, severity-tagged findings.

mod compiler;
pub mod validate;

pub use compiler::compile;
pub use validate::{validate, Severity, ValidationIssue, ValidationOutcome};
