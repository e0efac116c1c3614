//! Edge shape and type-compatibility checks.

use super::ValidationIssue;
use std::collections::HashMap;
use weftcore::{CompiledEdge, ComponentRegistry, ConnectionType, StaticPorts, WorkflowDefinition};

pub(super) fn check_edges(
    definition: &WorkflowDefinition,
    registry: &ComponentRegistry,
    issues: &mut Vec<ValidationIssue>,
) {
    check_duplicate_targets(definition, issues);

    // Resolve each node's port snapshot once.
    let mut ports_by_ref: HashMap<&str, StaticPorts> = HashMap::new();
    for action in &definition.actions {
        if let Some(component) = registry.get(&action.component) {
            ports_by_ref.insert(
                action.node_ref.as_str(),
                component.ports().resolve(&action.params),
            );
        }
    }

    for edge in &definition.edges {
        if edge.is_control() {
            // Ordering only; nothing to type-check.
            continue;
        }
        if edge.is_malformed() {
            report_asymmetric(edge, issues);
            continue;
        }
        check_compatibility(edge, &ports_by_ref, issues);
    }
}

/// More than one edge feeding the same input port is always an error,
/// regardless of where the edges come from.
fn check_duplicate_targets(definition: &WorkflowDefinition, issues: &mut Vec<ValidationIssue>) {
    let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
    for edge in &definition.edges {
        if let Some(handle) = &edge.target_handle {
            *seen
                .entry((edge.target_ref.as_str(), handle.as_str()))
                .or_default() += 1;
        }
    }
    for ((target, handle), count) in seen {
        if count > 1 {
            issues.push(ValidationIssue::error(
                Some(target),
                Some(handle),
                format!("input '{handle}' has {count} incoming connections; only one is allowed"),
            ));
        }
    }
}

fn report_asymmetric(edge: &CompiledEdge, issues: &mut Vec<ValidationIssue>) {
    let message = if edge.source_handle.is_none() {
        format!(
            "edge '{}' has a target handle but no source handle",
            edge.id
        )
    } else {
        format!(
            "edge '{}' has a source handle but no target handle",
            edge.id
        )
    };
    issues.push(ValidationIssue::error(
        Some(&edge.target_ref),
        Some("edges"),
        message,
    ));
}

fn check_compatibility(
    edge: &CompiledEdge,
    ports_by_ref: &HashMap<&str, StaticPorts>,
    issues: &mut Vec<ValidationIssue>,
) {
    // Unwraps are safe: the caller only passes data edges here.
    let source_handle = edge.source_handle.as_deref().unwrap_or_default();
    let target_handle = edge.target_handle.as_deref().unwrap_or_default();

    let source_type = ports_by_ref
        .get(edge.source_ref.as_str())
        .and_then(|p| p.outputs.port(source_handle))
        .map(|p| p.connection_type);
    let target_type = ports_by_ref
        .get(edge.target_ref.as_str())
        .and_then(|p| p.inputs.port(target_handle))
        .map(|p| p.connection_type);

    let (source_type, target_type) = match (source_type, target_type) {
        (Some(s), Some(t)) => (s, t),
        (None, _) => {
            issues.push(ValidationIssue::error(
                Some(&edge.source_ref),
                Some(source_handle),
                format!(
                    "edge '{}' reads unresolved output port '{source_handle}' on '{}'",
                    edge.id, edge.source_ref
                ),
            ));
            return;
        }
        (_, None) => {
            issues.push(ValidationIssue::error(
                Some(&edge.target_ref),
                Some(target_handle),
                format!(
                    "edge '{}' feeds unresolved input port '{target_handle}' on '{}'",
                    edge.id, edge.target_ref
                ),
            ));
            return;
        }
    };

    if !ConnectionType::is_compatible(source_type, target_type) {
        issues.push(ValidationIssue::error(
            Some(&edge.target_ref),
            Some(target_handle),
            format!(
                "output '{source_handle}' ({source_type}) of '{}' cannot feed input '{target_handle}' ({target_type}) of '{}'",
                edge.source_ref, edge.target_ref
            ),
        ));
    }
}
