//! Parameter validation and return-value cleaning.
//!
//! Both walk a [`Description`] over a JSON value. They differ in two ways:
//! input validation rejects undeclared keys while output cleaning drops them,
//! and failures surface as `InvalidParameter`/`MissingParameter` for input but
//! `InvalidResponse` for output.

use serde_json::{Map, Number, Value};

use crate::error::{ExternalError, Result};
use crate::function::ValidatedArgs;
use crate::schema::{Description, ParamType, Presence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Input,
    Output,
}

impl Mode {
    fn invalid(self, path: &str, reason: impl Into<String>) -> ExternalError {
        match self {
            Mode::Input => ExternalError::invalid_parameter(path, reason),
            Mode::Output => ExternalError::invalid_response(path, reason),
        }
    }

    fn missing(self, path: &str) -> ExternalError {
        match self {
            Mode::Input => ExternalError::MissingParameter {
                path: path.to_string(),
            },
            Mode::Output => ExternalError::invalid_response(path, "required value is missing"),
        }
    }
}

/// Validate caller arguments against a single-structure description.
pub fn validate_parameters(description: &Description, params: &Value) -> Result<ValidatedArgs> {
    if !matches!(description, Description::Single { .. }) {
        return Err(ExternalError::Internal(
            "parameter descriptions must be single structures".to_string(),
        ));
    }
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    match walk(description, Some(&params), "", Mode::Input)? {
        Some(Value::Object(map)) => Ok(ValidatedArgs::new(map)),
        _ => Err(ExternalError::invalid_parameter("", "expected an object")),
    }
}

/// Filter a function result down to what `description` declares.
pub fn clean_return_value(description: &Description, value: &Value) -> Result<Value> {
    Ok(walk(description, Some(value), "", Mode::Output)?.unwrap_or(Value::Null))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn absent(presence: &Presence, path: &str, mode: Mode) -> Result<Option<Value>> {
    match presence {
        Presence::Required => Err(mode.missing(path)),
        Presence::Optional => Ok(None),
        Presence::Default(default) => Ok(Some(default.clone())),
    }
}

fn walk(
    description: &Description,
    value: Option<&Value>,
    path: &str,
    mode: Mode,
) -> Result<Option<Value>> {
    let value = match value {
        None | Some(Value::Null) => return absent(description.presence(), path, mode),
        Some(v) => v,
    };

    match description {
        Description::Value { param_type, .. } => coerce(*param_type, value)
            .map(Some)
            .map_err(|reason| mode.invalid(path, reason)),

        Description::Single { fields, .. } => {
            let Value::Object(map) = value else {
                return Err(mode.invalid(path, "expected an object"));
            };
            if mode == Mode::Input
                && let Some(unknown) = map
                    .keys()
                    .find(|key| !fields.iter().any(|f| &f.name == *key))
            {
                return Err(mode.invalid(&join(path, unknown), "unexpected parameter"));
            }
            let mut out = Map::new();
            for field in fields {
                let child = join(path, &field.name);
                if let Some(v) = walk(&field.description, map.get(&field.name), &child, mode)? {
                    out.insert(field.name.clone(), v);
                }
            }
            Ok(Some(Value::Object(out)))
        }

        Description::Multiple { content, .. } => {
            let Value::Array(items) = value else {
                return Err(mode.invalid(path, "expected a list"));
            };
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                let child = format!("{path}[{idx}]");
                if let Some(v) = walk(content, Some(item), &child, mode)? {
                    out.push(v);
                }
            }
            Ok(Some(Value::Array(out)))
        }
    }
}

/// Coerce a primitive value, returning the rejection reason on failure.
fn coerce(param_type: ParamType, value: &Value) -> std::result::Result<Value, String> {
    match param_type {
        ParamType::Int => match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(Value::from(f as i64))
                }
                _ => Err(format!("{n} is not an integer")),
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{s}' is not an integer")),
            other => Err(format!("{} is not an integer", kind(other))),
        },

        ParamType::Float => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{s}' is not a number")),
            other => Err(format!("{} is not a number", kind(other))),
        },

        ParamType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(format!("{n} is not a boolean")),
            },
            Value::String(s) => match s.as_str() {
                "0" | "false" => Ok(Value::Bool(false)),
                "1" | "true" => Ok(Value::Bool(true)),
                _ => Err(format!("'{s}' is not a boolean")),
            },
            other => Err(format!("{} is not a boolean", kind(other))),
        },

        ParamType::Alphanum => {
            let s = stringify(value)?;
            if s.chars().all(|c| c.is_ascii_alphanumeric()) {
                Ok(Value::String(s))
            } else {
                Err(format!("'{s}' contains characters other than letters and digits"))
            }
        }

        ParamType::Text | ParamType::Raw => stringify(value).map(Value::String),

        ParamType::Url => {
            let s = stringify(value)?;
            if s.is_empty() {
                return Ok(Value::String(s));
            }
            match url::Url::parse(&s) {
                Ok(parsed) if parsed.has_host() => Ok(Value::String(s)),
                Ok(_) => Err(format!("'{s}' has no host")),
                Err(e) => Err(format!("'{s}' is not a valid URL: {e}")),
            }
        }

        ParamType::Email => {
            let s = stringify(value)?;
            if s.is_empty() || is_email(&s) {
                Ok(Value::String(s))
            } else {
                Err(format!("'{s}' is not a valid email address"))
            }
        }
    }
}

fn stringify(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(if *b { "1".to_string() } else { "0".to_string() }),
        other => Err(format!("{} is not a scalar", kind(other))),
    }
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
