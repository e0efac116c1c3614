//! Entry-point shape checks.

use super::ValidationIssue;
use serde_json::Value;
use weftcore::{WorkflowDefinition, ENTRYPOINT_COMPONENT};

const RUNTIME_INPUTS: &str = "runtime_inputs";

/// Exactly one entry-point action must exist, and it must declare the
/// runtime inputs the run will receive.
pub(super) fn check_entrypoint(definition: &WorkflowDefinition, issues: &mut Vec<ValidationIssue>) {
    let entrypoints: Vec<_> = definition
        .actions
        .iter()
        .filter(|a| a.component == ENTRYPOINT_COMPONENT)
        .collect();

    match entrypoints.as_slice() {
        [] => {
            issues.push(ValidationIssue::error(
                None,
                None,
                format!("workflow has no entry point (component '{ENTRYPOINT_COMPONENT}')"),
            ));
        }
        [single] => check_runtime_inputs(&single.node_ref, &single.params, issues),
        many => {
            let refs: Vec<&str> = many.iter().map(|a| a.node_ref.as_str()).collect();
            issues.push(ValidationIssue::error(
                None,
                None,
                format!(
                    "workflow has {} entry points ({}); exactly one is allowed",
                    many.len(),
                    refs.join(", ")
                ),
            ));
        }
    }
}

fn check_runtime_inputs(node_ref: &str, params: &Value, issues: &mut Vec<ValidationIssue>) {
    let declared = match params.get(RUNTIME_INPUTS) {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::error(
                Some(node_ref),
                Some(RUNTIME_INPUTS),
                "entry point must declare a runtime_inputs array",
            ));
            return;
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            issues.push(ValidationIssue::error(
                Some(node_ref),
                Some(RUNTIME_INPUTS),
                format!(
                    "runtime_inputs must be an array, got {}",
                    weftcore::schema::json_type_name(other)
                ),
            ));
            return;
        }
    };

    if declared.is_empty() {
        issues.push(ValidationIssue::warning(
            Some(node_ref),
            Some(RUNTIME_INPUTS),
            "entry point declares no runtime inputs",
        ));
        return;
    }

    for (i, item) in declared.iter().enumerate() {
        for key in ["id", "label", "type"] {
            let present = item
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !present {
                issues.push(ValidationIssue::error(
                    Some(node_ref),
                    Some(&format!("{RUNTIME_INPUTS}[{i}].{key}")),
                    format!("runtime input {i} is missing '{key}'"),
                ));
            }
        }
    }
}
