//! Scalar values carried by filters, parameters and result rows.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declared type of an attribute's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Id,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::Id => "id",
        };
        f.write_str(name)
    }
}

/// An opaque scalar handed to (and read back from) the store.
///
/// Deserialization never produces [`Value::Id`]; identifiers arrive as text
/// and are converted by [`Value::coerce`] once the attribute type is known.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    #[serde(skip_deserializing)]
    Id(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert this value to `target`.
    ///
    /// Only lossless conversions are allowed: integer to float, 0/1 to
    /// boolean, text to id. NULL coerces to every type.
    pub fn coerce(self, target: ValueType) -> Result<Value, String> {
        match (self, target) {
            (Value::Null, _) => Ok(Value::Null),
            (v @ Value::Text(_), ValueType::String) => Ok(v),
            (Value::Id(id), ValueType::String) => Ok(Value::Text(id.to_string())),
            (v @ Value::Int(_), ValueType::Integer) => Ok(v),
            (v @ Value::Float(_), ValueType::Float) => Ok(v),
            (Value::Int(i), ValueType::Float) => Ok(Value::Float(i as f64)),
            (v @ Value::Bool(_), ValueType::Boolean) => Ok(v),
            (Value::Int(0), ValueType::Boolean) => Ok(Value::Bool(false)),
            (Value::Int(1), ValueType::Boolean) => Ok(Value::Bool(true)),
            (v @ Value::Id(_), ValueType::Id) => Ok(v),
            (Value::Text(s), ValueType::Id) => Uuid::parse_str(&s)
                .map(Value::Id)
                .map_err(|e| format!("'{}' is not a valid id: {}", s, e)),
            (v, target) => Err(format!("cannot convert {} to {}", v, target)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Id(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Id(id)
    }
}
