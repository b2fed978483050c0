//! Argument validation against declared input schemas
//!
//! Supports the subset of JSON Schema used by capability definitions:
//! `type` (single or list), `properties`, `required`, `additionalProperties`
//! and `items`. Every problem is collected, not just the first.

use {
    crate::error::{McpError, McpResult},
    serde::Serialize,
    serde_json::{Map, Value},
    tracing::debug,
};

/// What went wrong with one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    TypeMismatch,
    UnexpectedField,
}

/// A single validation failure, reported to the peer under `data.errors`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field, `$` for the argument map itself
    pub path: String,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn missing(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            message: format!("missing required field '{path}'"),
            path,
            kind: IssueKind::Missing,
        }
    }

    pub fn type_mismatch(path: impl Into<String>, expected: &str, actual: &str) -> Self {
        let path = path.into();
        Self {
            message: format!("field '{path}' expected {expected}, got {actual}"),
            path,
            kind: IssueKind::TypeMismatch,
        }
    }

    pub fn unexpected(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            message: format!("unexpected field '{path}'"),
            path,
            kind: IssueKind::UnexpectedField,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Canonical form of a required-field declaration.
///
/// Symbolic spellings (`":msg"`) and plain ones (`"msg"`) name the same field.
pub fn canonical_field_name(raw: &str) -> String {
    raw.trim().trim_start_matches(':').to_string()
}

pub struct SchemaValidator;

impl SchemaValidator {
    /// Reject schemas the validator cannot evaluate on its own.
    ///
    /// Called at registration time so a bad schema never reaches dispatch.
    pub fn check_schema(name: &str, schema: &Value) -> McpResult<()> {
        if !schema.is_object() {
            return Err(McpError::InvalidSchema {
                name: name.to_string(),
                reason: "schema must be a JSON object".to_string(),
            });
        }
        if contains_ref(schema) {
            return Err(McpError::DisallowedSchemaRef(name.to_string()));
        }
        if let Some(required) = schema.get("required") {
            let all_strings = required
                .as_array()
                .is_some_and(|names| names.iter().all(Value::is_string));
            if !all_strings {
                return Err(McpError::InvalidSchema {
                    name: name.to_string(),
                    reason: "'required' must be a list of field names".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validate an argument map. Pure: depends only on its inputs.
    pub fn validate(arguments: &Value, schema: &Value) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        validate_value(arguments, schema, "$", &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            debug!(issue_count = issues.len(), "Argument validation failed");
            Err(issues)
        }
    }
}

/// Whether `$ref` appears as a keyword anywhere in the schema.
///
/// Property names and literal values are data, so a field called `$ref` or
/// an `enum` containing that string does not count.
fn contains_ref(schema: &Value) -> bool {
    let Value::Object(map) = schema else {
        return false;
    };
    if map.contains_key("$ref") {
        return true;
    }
    map.iter().any(|(keyword, value)| match keyword.as_str() {
        "properties" | "patternProperties" | "$defs" | "definitions" | "dependentSchemas" => value
            .as_object()
            .is_some_and(|named| named.values().any(contains_ref)),
        "enum" | "const" | "default" | "examples" | "required" => false,
        _ => match value {
            Value::Array(items) => items.iter().any(contains_ref),
            other => contains_ref(other),
        },
    })
}

fn child_path(parent: &str, field: &str) -> String {
    if parent == "$" {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        // Unknown type names constrain nothing
        _ => true,
    }
}

/// Declared types of a schema node. `type` defaults to object at the root only
/// when the node describes properties; a bare `{}` accepts anything.
fn declared_types(schema: &Map<String, Value>, is_root: bool) -> Vec<String> {
    match schema.get("type") {
        Some(Value::String(name)) => vec![name.clone()],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ if is_root || schema.contains_key("properties") || schema.contains_key("required") => {
            vec!["object".to_string()]
        }
        _ => Vec::new(),
    }
}

fn validate_value(value: &Value, schema: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    let types = declared_types(schema, path == "$");
    if !types.is_empty() && !types.iter().any(|t| matches_type(value, t)) {
        issues.push(ValidationIssue::type_mismatch(
            path,
            &types.join(" | "),
            json_type_name(value),
        ));
        return;
    }

    match value {
        Value::Object(fields) => validate_object(fields, schema, path, issues),
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (index, item) in items.iter().enumerate() {
                    validate_value(item, item_schema, &format!("{path}[{index}]"), issues);
                }
            }
        }
        _ => {}
    }
}

fn validate_object(
    fields: &Map<String, Value>,
    schema: &Map<String, Value>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            let name = canonical_field_name(name);
            if !fields.contains_key(&name) {
                issues.push(ValidationIssue::missing(child_path(path, &name)));
            }
        }
    }

    let closed = matches!(schema.get("additionalProperties"), Some(Value::Bool(false)));
    for (name, field_value) in fields {
        match properties.get(name) {
            Some(property_schema) => {
                validate_value(field_value, property_schema, &child_path(path, name), issues)
            }
            None if closed => issues.push(ValidationIssue::unexpected(child_path(path, name))),
            None => {}
        }
    }
}
