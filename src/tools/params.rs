//! Tool parameter descriptors and the shared argument validator.
//!
//! Each tool declares its parameters as a static list of `ParamDescriptor`s.
//! The same list drives both the advertised `inputSchema` and validation of
//! incoming `arguments` before the handler runs.

use crate::error::{ServerError, ServerResult};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    /// JSON Schema type name.
    pub fn schema_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// Strings only: trimmed before the handler sees them, and must not be empty.
    pub non_empty: bool,
}

impl ParamDescriptor {
    pub const fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
            non_empty: false,
        }
    }

    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }
}

/// Arguments that passed validation. Only declared fields are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
}

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Fetch a required string. Validation already guarantees presence for
    /// required descriptors, so a miss here means the handler and its
    /// descriptor list disagree.
    pub fn require_str(&self, name: &str) -> ServerResult<&str> {
        self.get_str(name)
            .ok_or_else(|| ServerError::validation(name, "is required"))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Check `arguments` against `params`.
///
/// Absent or `null` arguments are treated as `{}`. Unknown fields are ignored.
pub fn validate(params: &[ParamDescriptor], arguments: Option<&Value>) -> ServerResult<ValidatedArgs> {
    let empty = Map::new();
    let object = match arguments {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ServerError::validation("arguments", "must be an object")),
    };

    let mut values = Map::new();
    for param in params {
        match object.get(param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(ServerError::validation(param.name, "is required"));
                }
            }
            Some(value) if !param.kind.matches(value) => {
                return Err(ServerError::validation(
                    param.name,
                    format!("must be a {}", param.kind.schema_type()),
                ));
            }
            Some(Value::String(s)) if param.non_empty => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ServerError::validation(param.name, "must not be empty"));
                }
                values.insert(param.name.to_string(), Value::String(trimmed.to_string()));
            }
            Some(value) => {
                values.insert(param.name.to_string(), value.clone());
            }
        }
    }

    Ok(ValidatedArgs { values })
}

/// JSON Schema object for a parameter list, as advertised in `tools/list`.
pub fn input_schema(params: &[ParamDescriptor]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        let mut property = json!({
            "type": param.kind.schema_type(),
            "description": param.description,
        });
        if param.non_empty {
            property["minLength"] = json!(1);
        }
        properties.insert(param.name.to_string(), property);
        if param.required {
            required.push(Value::String(param.name.to_string()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
