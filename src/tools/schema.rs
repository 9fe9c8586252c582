//! Explicit input descriptors for the tool surface.
//!
//! A tool's fields are declared once as a `&'static [FieldSpec]` table. The same
//! table renders the JSON schema advertised by `tools/list` and validates the
//! argument bag of `tools/call`, filling in defaults before the arguments are
//! deserialized into the tool's typed struct.

use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` must be {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("field `{field}` must be one of {allowed}, got `{value}`")]
    NotInEnum {
        field: String,
        value: String,
        allowed: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Non-negative whole number
    Integer,
    Object(&'static [FieldSpec]),
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Integer => "a non-negative integer",
            FieldKind::Object(_) => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Str(&'static str),
    Int(u64),
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            DefaultValue::Str(s) => Value::from(s),
            DefaultValue::Int(n) => Value::from(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub enum_values: &'static [&'static str],
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            enum_values: &[],
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    /// Optional field filled with `default` when absent.
    pub const fn with_default(self, default: DefaultValue) -> Self {
        Self {
            required: false,
            default: Some(default),
            ..self
        }
    }

    pub const fn with_enum(self, values: &'static [&'static str]) -> Self {
        Self {
            enum_values: values,
            ..self
        }
    }

    fn json_schema(&self) -> Value {
        let mut schema = match self.kind {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::Integer => json!({ "type": "integer", "minimum": 0 }),
            FieldKind::Object(fields) => object_schema(fields),
        };
        if !self.description.is_empty() {
            schema["description"] = Value::from(self.description);
        }
        if !self.enum_values.is_empty() {
            schema["enum"] = Value::from(self.enum_values.to_vec());
        }
        if let Some(default) = self.default {
            schema["default"] = default.to_value();
        }
        schema
    }
}

/// JSON schema for an object with the given fields.
pub fn object_schema(fields: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| (f.name.to_string(), f.json_schema()))
        .collect();
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();

    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = Value::from(required);
    }
    schema
}

/// Check `args` against `fields` and return a normalized copy with defaults applied.
///
/// Unknown fields are dropped. `null` counts as absent.
pub fn validate(fields: &[FieldSpec], args: &Map<String, Value>) -> Result<Map<String, Value>, SchemaError> {
    validate_at("", fields, args)
}

fn validate_at(
    prefix: &str,
    fields: &[FieldSpec],
    args: &Map<String, Value>,
) -> Result<Map<String, Value>, SchemaError> {
    let mut normalized = Map::new();
    for field in fields {
        let name = format!("{}{}", prefix, field.name);
        match args.get(field.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let value = check_value(&name, field, value)?;
                normalized.insert(field.name.to_string(), value);
            }
            None => {
                if let Some(default) = field.default {
                    normalized.insert(field.name.to_string(), default.to_value());
                } else if field.required {
                    return Err(SchemaError::MissingField(name));
                }
            }
        }
    }
    Ok(normalized)
}

fn check_value(name: &str, field: &FieldSpec, value: &Value) -> Result<Value, SchemaError> {
    let wrong_type = || SchemaError::WrongType {
        field: name.to_string(),
        expected: field.kind.describe(),
    };

    let checked = match field.kind {
        FieldKind::String => {
            let s = value.as_str().ok_or_else(wrong_type)?;
            if !field.enum_values.is_empty() && !field.enum_values.contains(&s) {
                return Err(SchemaError::NotInEnum {
                    field: name.to_string(),
                    value: s.to_string(),
                    allowed: field.enum_values.join(", "),
                });
            }
            value.clone()
        }
        FieldKind::Integer => Value::from(as_whole_number(value).ok_or_else(wrong_type)?),
        FieldKind::Object(fields) => {
            let map = value.as_object().ok_or_else(wrong_type)?;
            Value::Object(validate_at(&format!("{}.", name), fields, map)?)
        }
    };
    Ok(checked)
}

/// Accepts `42` and `42.0`, rejects negatives and fractions.
fn as_whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INLINE: &[FieldSpec] = &[
        FieldSpec::required("path", FieldKind::String, "File path"),
        FieldSpec::required("line", FieldKind::Integer, "Line number"),
    ];

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::optional("workspace", FieldKind::String, "Workspace slug"),
        FieldSpec::required("repo_slug", FieldKind::String, "Repository slug"),
        FieldSpec::optional("state", FieldKind::String, "PR state filter")
            .with_enum(&["OPEN", "MERGED"])
            .with_default(DefaultValue::Str("OPEN")),
        FieldSpec::optional("limit", FieldKind::Integer, "").with_default(DefaultValue::Int(25)),
        FieldSpec::optional("inline", FieldKind::Object(INLINE), "Inline anchor"),
    ];

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_schema_rendering() {
        let schema = object_schema(FIELDS);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["repo_slug"]));
        assert_eq!(schema["properties"]["state"]["enum"], json!(["OPEN", "MERGED"]));
        assert_eq!(schema["properties"]["state"]["default"], "OPEN");
        assert_eq!(schema["properties"]["limit"]["default"], 25);
        assert!(schema["properties"]["limit"].get("description").is_none());
        assert_eq!(schema["properties"]["inline"]["required"], json!(["path", "line"]));
    }

    #[test]
    fn test_validate_applies_defaults() {
        let normalized = validate(FIELDS, &args(json!({ "repo_slug": "widgets", "extra": true }))).unwrap();
        assert_eq!(normalized["state"], "OPEN");
        assert_eq!(normalized["limit"], 25);
        assert!(!normalized.contains_key("workspace"));
        assert!(!normalized.contains_key("extra"));
    }

    #[test]
    fn test_validate_reports_missing_and_wrong_types() {
        assert_eq!(
            validate(FIELDS, &args(json!({ "repo_slug": null }))).unwrap_err(),
            SchemaError::MissingField("repo_slug".to_string())
        );
        assert!(matches!(
            validate(FIELDS, &args(json!({ "repo_slug": "w", "limit": -1 }))),
            Err(SchemaError::WrongType { .. })
        ));
        assert!(matches!(
            validate(FIELDS, &args(json!({ "repo_slug": "w", "limit": 2.5 }))),
            Err(SchemaError::WrongType { .. })
        ));
        assert!(matches!(
            validate(FIELDS, &args(json!({ "repo_slug": "w", "state": "CLOSED" }))),
            Err(SchemaError::NotInEnum { .. })
        ));
    }

    #[test]
    fn test_validate_nested_object() {
        let normalized = validate(
            FIELDS,
            &args(json!({ "repo_slug": "w", "limit": 10.0, "inline": { "path": "a.rs", "line": 3 } })),
        )
        .unwrap();
        assert_eq!(normalized["limit"], 10);
        assert_eq!(normalized["inline"]["line"], 3);

        let err = validate(FIELDS, &args(json!({ "repo_slug": "w", "inline": { "path": "a.rs" } }))).unwrap_err();
        assert_eq!(err, SchemaError::MissingField("inline.line".to_string()));
    }
}
