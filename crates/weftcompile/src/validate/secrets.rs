//! Secret-parameter hygiene checks.
//!
//! Secret params hold a *reference* to stored credential material, not
//! the credential itself. A value that looks like a vendor API key is
//! flagged as an error so raw secrets never end up in authored graphs.

use super::ValidationIssue;
use uuid::Uuid;
use weftcore::schema::ParamKind;
use weftcore::{ComponentRegistry, WorkflowDefinition};

/// Common vendor credential prefixes. Matching one of these in a
/// sufficiently long value is treated as a pasted raw key.
const RAW_KEY_PREFIXES: &[&str] = &[
    "sk-", "sk_live_", "sk_test_", "pk_live_", "rk_live_", "ghp_", "gho_", "github_pat_",
    "xoxb-", "xoxp-", "xapp-", "AKIA", "ASIA", "AIza", "ya29.", "glpat-",
];

const MAX_REFERENCE_LEN: usize = 100;

pub(super) fn check_secret_params(
    definition: &WorkflowDefinition,
    registry: &ComponentRegistry,
    issues: &mut Vec<ValidationIssue>,
) {
    for action in &definition.actions {
        let component = match registry.get(&action.component) {
            Some(c) => c,
            None => continue,
        };

        for field in component
            .parameter_schema()
            .fields
            .iter()
            .filter(|f| matches!(f.kind, ParamKind::Secret))
        {
            let value = action.params.get(&field.id);
            match value {
                None | Some(serde_json::Value::Null) => {
                    if field.required {
                        issues.push(ValidationIssue::error(
                            Some(&action.node_ref),
                            Some(&field.id),
                            format!("secret parameter '{}' is required", field.label),
                        ));
                    }
                }
                Some(serde_json::Value::String(s)) => {
                    check_secret_value(&action.node_ref, &field.id, s, issues)
                }
                Some(other) => {
                    issues.push(ValidationIssue::error(
                        Some(&action.node_ref),
                        Some(&field.id),
                        format!(
                            "secret parameter '{}' must be a string reference, got {}",
                            field.label,
                            weftcore::schema::json_type_name(other)
                        ),
                    ));
                }
            }
        }
    }
}

fn check_secret_value(node_ref: &str, field: &str, value: &str, issues: &mut Vec<ValidationIssue>) {
    // A UUID is the canonical shape of a stored-secret reference.
    if Uuid::parse_str(value).is_ok() {
        return;
    }

    if looks_like_raw_key(value) {
        issues.push(
            ValidationIssue::error(
                Some(node_ref),
                Some(field),
                format!("value of '{field}' looks like a raw key, not a secret reference"),
            )
            .with_suggestion(
                "store the credential in the secret store and reference it by id".to_string(),
            ),
        );
        return;
    }

    let len = value.chars().count();
    if len == 0 || len > MAX_REFERENCE_LEN {
        issues.push(ValidationIssue::warning(
            Some(node_ref),
            Some(field),
            format!("value of '{field}' does not look like a secret reference"),
        ));
    }
}

/// Heuristic for pasted vendor credentials: a known provider prefix on
/// a long value, or a long opaque alphanumeric blob.
fn looks_like_raw_key(value: &str) -> bool {
    let len = value.chars().count();
    if len > 20 && RAW_KEY_PREFIXES.iter().any(|p| value.starts_with(p)) {
        return true;
    }
    len >= 32
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && value.chars().any(|c| c.is_ascii_alphabetic())
        && value.chars().any(|c| c.is_ascii_digit())
}
