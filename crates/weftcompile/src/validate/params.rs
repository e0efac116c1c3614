//! Parameter and input-port schema checks.

use super::ValidationIssue;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use weftcore::schema::{json_type_name, ConnectionType, ParamKind, SchemaFinding};
use weftcore::{Action, ComponentRegistry, StaticPorts, WorkflowDefinition};

/// Validate each action's params against its component's parameter
/// schema and its input overrides against the resolved input-port
/// schema.
///
/// Inputs that are mapped (fed by a data edge) but carry no static
/// override are given a type-appropriate placeholder before checking,
/// and any finding solely attributable to that placeholder is filtered
/// out: the real value only arrives at runtime.
pub(super) fn check_schemas(
    definition: &WorkflowDefinition,
    registry: &ComponentRegistry,
    issues: &mut Vec<ValidationIssue>,
) {
    for action in &definition.actions {
        let component = match registry.get(&action.component) {
            Some(c) => c,
            // Existence check already reported this node.
            None => continue,
        };

        let schema = component.parameter_schema();
        for finding in schema.validate_object(&action.params) {
            // Secret params get dedicated treatment in the secrets pass.
            if matches!(
                schema.field(&finding.field).map(|f| &f.kind),
                Some(ParamKind::Secret)
            ) {
                continue;
            }
            issues.push(finding_to_issue(&action.node_ref, "params", finding));
        }

        let ports = component.ports().resolve(&action.params);
        check_input_overrides(action, &ports, issues);
    }
}

fn check_input_overrides(
    action: &Action,
    ports: &StaticPorts,
    issues: &mut Vec<ValidationIssue>,
) {
    let overrides = match action.input_overrides.as_object() {
        Some(map) => map.clone(),
        None => {
            issues.push(ValidationIssue::error(
                Some(&action.node_ref),
                Some("input_overrides"),
                format!(
                    "input overrides must be an object, got {}",
                    json_type_name(&action.input_overrides)
                ),
            ));
            return;
        }
    };

    for port_id in overrides.keys() {
        if ports.inputs.port(port_id).is_none() {
            issues.push(ValidationIssue::warning(
                Some(&action.node_ref),
                Some(port_id),
                format!("override targets unknown input port '{port_id}'"),
            ));
        }
    }

    // Substitute placeholders for mapped-but-unset inputs, remembering
    // which ports were synthesized so their findings can be filtered.
    let mut effective: HashMap<String, Value> = HashMap::new();
    let mut synthesized: HashSet<&str> = HashSet::new();
    for port in &ports.inputs.ports {
        match overrides.get(&port.id) {
            Some(value) if !value.is_null() => {
                effective.insert(port.id.clone(), value.clone());
            }
            _ => {
                if action.input_mappings.contains_key(&port.id) {
                    effective.insert(port.id.clone(), port.connection_type.placeholder());
                    synthesized.insert(port.id.as_str());
                }
            }
        }
    }

    for port in &ports.inputs.ports {
        let value = match effective.get(&port.id) {
            Some(v) => v,
            None => continue,
        };
        if let Some(finding) = check_connection_value(&port.id, port.connection_type, value) {
            if synthesized.contains(port.id.as_str()) && finding.kind.placeholder_attributable() {
                continue;
            }
            issues.push(finding_to_issue(&action.node_ref, "input_overrides", finding));
        }
    }
}

/// Type check one input value against its port's connection type.
fn check_connection_value(
    port: &str,
    connection_type: ConnectionType,
    value: &Value,
) -> Option<SchemaFinding> {
    use weftcore::FindingKind;
    let ok = match connection_type {
        ConnectionType::Text | ConnectionType::Binary => value.is_string(),
        ConnectionType::Number => value.is_number(),
        ConnectionType::Boolean => value.is_boolean(),
        ConnectionType::Json | ConnectionType::Any => true,
    };
    if ok {
        None
    } else {
        Some(SchemaFinding {
            field: port.to_string(),
            kind: FindingKind::Type,
            message: format!(
                "input '{port}' expects {connection_type}, got {}",
                json_type_name(value)
            ),
        })
    }
}

/// Every required input port must be satisfied by a static override or
/// a data-edge mapping.
pub(super) fn check_mapping_completeness(
    definition: &WorkflowDefinition,
    registry: &ComponentRegistry,
    issues: &mut Vec<ValidationIssue>,
) {
    for action in &definition.actions {
        let component = match registry.get(&action.component) {
            Some(c) => c,
            None => continue,
        };
        let ports = component.ports().resolve(&action.params);

        for port in ports.inputs.ports.iter().filter(|p| p.required) {
            let has_override = action
                .input_overrides
                .get(&port.id)
                .is_some_and(|v| !v.is_null());
            let has_mapping = action.input_mappings.contains_key(&port.id);
            if !has_override && !has_mapping {
                issues.push(ValidationIssue::error(
                    Some(&action.node_ref),
                    Some(&port.id),
                    format!(
                        "required input '{}' has neither a static value nor an incoming connection",
                        port.label
                    ),
                ));
            }
        }
    }
}

fn finding_to_issue(node_ref: &str, scope: &str, finding: SchemaFinding) -> ValidationIssue {
    let field = if finding.field.is_empty() {
        scope.to_string()
    } else {
        format!("{scope}.{}", finding.field)
    };
    ValidationIssue::error(Some(node_ref), Some(&field), finding.message)
}
