//! Canonical scalar values shared by field names and field values.
//!
//! Every scalar that enters the dictionary is first reduced to one of the
//! variants below, and each variant has exactly one canonical text form (its
//! JSON encoding).  Equality of canonical text is equality of dictionary
//! entries, so the string `"1"` and the integer `1` never collide.

use serde_json::Value;

use crate::error::{Result, TokmineError};

/// A scalar value in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// Integer that fits in `i64`.
    Int(i64),
    /// Any other JSON number.
    Float(f64),
    /// JSON string.
    Str(String),
}

impl CanonicalValue {
    /// Converts a decoded JSON value into canonical form.
    ///
    /// Arrays and objects are rejected; records are required to be flat
    /// mappings of field name to scalar.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(TokmineError::parse(0, format!("unrepresentable number {n}")))
                }
            }
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Array(_) => Err(TokmineError::parse(0, "nested array is not a scalar")),
            Value::Object(_) => Err(TokmineError::parse(0, "nested object is not a scalar")),
        }
    }

    /// Returns the canonical text form: the JSON encoding of the scalar.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        // serde_json's scalar encodings are already canonical: shortest float
        // representation, lowercase literals, escaped quoted strings.
        serde_json::to_string(&self.to_json()).unwrap_or_else(|_| "null".to_string())
    }

    /// Parses a canonical text form back into a value.
    ///
    /// This is the inverse of [`CanonicalValue::canonical_text`] and is used
    /// when decoding dictionary entries during detokenization.
    pub fn parse_canonical(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| TokmineError::parse(0, format!("bad canonical text {text:?}: {err}")))?;
        Self::from_json(&value)
    }

    /// Converts the canonical value back into a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    /// Returns the value rendered as a field name.
    ///
    /// String values yield their contents; any other variant falls back to
    /// the canonical text, since field names share the token namespace with
    /// ordinary values.
    #[must_use]
    pub fn field_name(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            other => other.canonical_text(),
        }
    }

    /// Returns the string contents when the value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}
