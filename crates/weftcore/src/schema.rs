use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Parameter schema declared by a component.
#[derive(Debug, Clone, Default)]
pub struct ParameterSchema {
    pub fields: Vec<ParamField>,
}

impl ParameterSchema {
    pub fn new(fields: Vec<ParamField>) -> Self {
        Self { fields }
    }

    pub fn field(&self, id: &str) -> Option<&ParamField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Validate a params object against this schema, accumulating
    /// categorized findings rather than stopping at the first failure.
    pub fn validate_object(&self, value: &Value) -> Vec<SchemaFinding> {
        let mut findings = Vec::new();
        let map = match value.as_object() {
            Some(map) => map,
            None => {
                findings.push(SchemaFinding {
                    field: String::new(),
                    kind: FindingKind::Type,
                    message: format!("expected an object, got {}", json_type_name(value)),
                });
                return findings;
            }
        };

        for field in &self.fields {
            match map.get(&field.id) {
                None | Some(Value::Null) => {
                    if field.required {
                        findings.push(SchemaFinding {
                            field: field.id.clone(),
                            kind: FindingKind::Missing,
                            message: format!("required value '{}' is missing", field.id),
                        });
                    }
                }
                Some(present) => findings.extend(field.kind.check(&field.id, present)),
            }
        }
        findings
    }
}

#[derive(Debug, Clone)]
pub struct ParamField {
    pub id: String,
    pub label: String,
    pub required: bool,
    pub kind: ParamKind,
}

impl ParamField {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            required: false,
            kind,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone)]
pub enum ParamKind {
    String {
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    Number,
    Boolean,
    /// A reference to a stored secret, never a raw credential value.
    /// Structural checks happen here; the raw-key heuristics live in
    /// the validator.
    Secret,
    Json,
    Enum(Vec<String>),
}

impl ParamKind {
    pub fn string() -> Self {
        ParamKind::String {
            min_len: None,
            max_len: None,
        }
    }

    fn check(&self, field: &str, value: &Value) -> Vec<SchemaFinding> {
        let mut findings = Vec::new();
        match self {
            ParamKind::String { min_len, max_len } => match value.as_str() {
                Some(s) => {
                    if let Some(min) = min_len {
                        if s.chars().count() < *min {
                            findings.push(SchemaFinding {
                                field: field.to_string(),
                                kind: FindingKind::Size,
                                message: format!("'{field}' must be at least {min} characters"),
                            });
                        }
                    }
                    if let Some(max) = max_len {
                        if s.chars().count() > *max {
                            findings.push(SchemaFinding {
                                field: field.to_string(),
                                kind: FindingKind::Size,
                                message: format!("'{field}' must be at most {max} characters"),
                            });
                        }
                    }
                }
                None => findings.push(type_mismatch(field, "string", value)),
            },
            ParamKind::Number => {
                if !value.is_number() {
                    findings.push(type_mismatch(field, "number", value));
                }
            }
            ParamKind::Boolean => {
                if !value.is_boolean() {
                    findings.push(type_mismatch(field, "boolean", value));
                }
            }
            ParamKind::Secret => {
                if !value.is_string() {
                    findings.push(type_mismatch(field, "secret reference", value));
                }
            }
            ParamKind::Json => {
                // Any JSON value is acceptable.
            }
            ParamKind::Enum(options) => match value.as_str() {
                Some(s) if options.iter().any(|o| o == s) => {}
                Some(s) => findings.push(SchemaFinding {
                    field: field.to_string(),
                    kind: FindingKind::Enum,
                    message: format!("'{s}' is not one of [{}]", options.join(", ")),
                }),
                None => findings.push(type_mismatch(field, "string", value)),
            },
        }
        findings
    }
}

fn type_mismatch(field: &str, expected: &str, value: &Value) -> SchemaFinding {
    SchemaFinding {
        field: field.to_string(),
        kind: FindingKind::Type,
        message: format!(
            "'{field}' expected {expected}, got {}",
            json_type_name(value)
        ),
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One schema-check finding, categorized so callers can filter the
/// classes of failure a synthesized placeholder can cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFinding {
    pub field: String,
    pub kind: FindingKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    Missing,
    Type,
    Size,
    Enum,
}

impl FindingKind {
    /// Whether a finding of this kind can be caused purely by a
    /// type-appropriate placeholder standing in for a runtime value.
    pub fn placeholder_attributable(&self) -> bool {
        matches!(self, FindingKind::Type | FindingKind::Size | FindingKind::Enum)
    }
}

/// Input/output port schema declared by a component.
#[derive(Debug, Clone, Default)]
pub struct PortSchema {
    pub ports: Vec<Port>,
}

impl PortSchema {
    pub fn new(ports: Vec<Port>) -> Self {
        Self { ports }
    }

    pub fn port(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    pub id: String,
    pub label: String,
    pub required: bool,
    pub connection_type: ConnectionType,
}

impl Port {
    pub fn new(id: impl Into<String>, connection_type: ConnectionType) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            required: false,
            connection_type,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Connection type of a port; governs data-edge compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Text,
    Number,
    Boolean,
    Json,
    Binary,
    Any,
}

impl ConnectionType {
    /// Compatibility relation for a data edge `from -> to`. `Any` on
    /// either side matches everything; `Json` inputs accept any
    /// structured value; `Text` inputs accept scalars that stringify.
    pub fn is_compatible(from: ConnectionType, to: ConnectionType) -> bool {
        use ConnectionType::*;
        if from == to || from == Any || to == Any {
            return true;
        }
        match to {
            Json => matches!(from, Text | Number | Boolean | Json),
            Text => matches!(from, Number | Boolean),
            _ => false,
        }
    }

    /// Type-appropriate placeholder for a value that will only arrive
    /// at runtime over a data edge.
    pub fn placeholder(&self) -> Value {
        match self {
            ConnectionType::Text => Value::String("__mapped__".to_string()),
            ConnectionType::Number => serde_json::json!(0),
            ConnectionType::Boolean => Value::Bool(false),
            ConnectionType::Json | ConnectionType::Any => serde_json::json!({}),
            ConnectionType::Binary => Value::String(String::new()),
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionType::Text => "text",
            ConnectionType::Number => "number",
            ConnectionType::Boolean => "boolean",
            ConnectionType::Json => "json",
            ConnectionType::Binary => "binary",
            ConnectionType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Runtime input declared by the entry-point action's `runtime_inputs`
/// param. The validator checks the raw JSON shape; this typed form is
/// what the orchestrator consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeInputDef {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub input_type: String,
}
