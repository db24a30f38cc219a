//! Lenient parameter coercion.
//!
//! Tool callers are often non-strict; each tool declares a schema and the
//! coercer deterministically bends loose inputs into it:
//! integer-looking strings parse, boolean words coerce, a lone or
//! comma-separated string becomes an array, and a JSON string fills an
//! object slot. Unknown fields are rejected by name.

use serde_json::{Map, Value};

use crate::domain::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ToolSpec {
    /// JSON-schema fragment advertised by `tools/list`.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in self.params {
            properties.insert(
                param.name.to_string(),
                serde_json::json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(Value::String(param.name.to_string()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Coerce raw arguments against a tool schema. Deterministic: the same
/// input always produces the same output or the same error.
pub fn coerce_arguments(spec: &ToolSpec, arguments: Value) -> DomainResult<Map<String, Value>> {
    let args = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(DomainError::Validation(format!(
                "arguments must be an object, got {}",
                type_name(&other)
            )))
        }
    };

    // Unknown fields are rejected with the allowed names listed.
    let allowed: Vec<&str> = spec.params.iter().map(|p| p.name).collect();
    for key in args.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(DomainError::Validation(format!(
                "unknown field '{}' for tool '{}'; allowed fields: {}",
                key,
                spec.name,
                allowed.join(", ")
            )));
        }
    }

    let mut coerced = Map::new();
    for param in spec.params {
        match args.get(param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(DomainError::missing_field(param.name));
                }
            }
            Some(value) => {
                coerced.insert(param.name.to_string(), coerce_value(param, value)?);
            }
        }
    }

    Ok(coerced)
}

fn coerce_value(param: &ParamSpec, value: &Value) -> DomainResult<Value> {
    match param.param_type {
        ParamType::String => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            other => Err(type_error(param, other)),
        },
        ParamType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| type_error(param, value)),
            other => Err(type_error(param, other)),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(type_error(param, value)),
            },
            other => Err(type_error(param, other)),
        },
        ParamType::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            // A lone string is a one-element array; a comma-separated
            // string splits with whitespace trimmed.
            Value::String(s) => {
                let items: Vec<Value> = if s.contains(',') {
                    s.split(',')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(|part| Value::String(part.to_string()))
                        .collect()
                } else {
                    vec![Value::String(s.trim().to_string())]
                };
                Ok(Value::Array(items))
            }
            other => Err(type_error(param, other)),
        },
        ParamType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Ok(Value::Object(map)),
                Ok(other) => Err(DomainError::Validation(format!(
                    "field '{}' must be a JSON object, parsed a {}",
                    param.name,
                    type_name(&other)
                ))),
                Err(e) => Err(DomainError::Validation(format!(
                    "field '{}' contains invalid JSON: {e}",
                    param.name
                ))),
            },
            other => Err(type_error(param, other)),
        },
    }
}

fn type_error(param: &ParamSpec, value: &Value) -> DomainError {
    DomainError::Validation(format!(
        "field '{}' expects {}, got {}",
        param.name,
        param.param_type.as_str(),
        type_name(value)
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
