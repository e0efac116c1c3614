//! Workflow validation.
//!
//! Runs a fixed sequence of checks over the authored graph and its
//! compiled definition, accumulating every finding instead of stopping
//! at the first. Only error-severity findings block execution.

mod edges;
mod entrypoint;
mod params;
mod secrets;

use serde::{Deserialize, Serialize};
use weftcore::{ComponentRegistry, WorkflowDefinition, WorkflowGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding, addressed to a node and field where that
/// is meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn error(node: Option<&str>, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            node: node.map(str::to_string),
            field: field.map(str::to_string),
            message: message.into(),
            severity: Severity::Error,
            suggestion: None,
        }
    }

    pub fn warning(node: Option<&str>, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(node, field, message)
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Aggregated validation outcome. `is_valid` is true exactly when no
/// error-severity issue accumulated; warnings never block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|i| i.severity == Severity::Error);
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Validate a graph and its compiled definition against a registry
/// snapshot. Check order follows the authoring pipeline: existence,
/// schemas, secrets, mapping completeness, entry-point shape, edge
/// type compatibility.
pub fn validate(
    graph: &WorkflowGraph,
    definition: &WorkflowDefinition,
    registry: &ComponentRegistry,
) -> ValidationOutcome {
    let mut issues = Vec::new();

    check_existence(graph, registry, &mut issues);
    params::check_schemas(definition, registry, &mut issues);
    secrets::check_secret_params(definition, registry, &mut issues);
    params::check_mapping_completeness(definition, registry, &mut issues);
    entrypoint::check_entrypoint(definition, &mut issues);
    edges::check_edges(definition, registry, &mut issues);

    let outcome = ValidationOutcome::from_issues(issues);
    tracing::debug!(
        errors = outcome.errors.len(),
        warnings = outcome.warnings.len(),
        "validated workflow"
    );
    outcome
}

/// Every authored node's component must resolve in the registry.
fn check_existence(
    graph: &WorkflowGraph,
    registry: &ComponentRegistry,
    issues: &mut Vec<ValidationIssue>,
) {
    for node in &graph.nodes {
        if !registry.contains(&node.component) {
            issues.push(
                ValidationIssue::error(
                    Some(&node.id),
                    Some("component"),
                    format!("unknown component '{}'", node.component),
                )
                .with_suggestion(format!(
                    "known components: {}",
                    registry.list().join(", ")
                )),
            );
        }
    }
}
