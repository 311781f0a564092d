//! Payload types for tag values and decoded response bodies.
//!
//! # Design
//! FluidDB distinguishes primitive tag values (JSON scalars and lists of
//! strings, sent as `application/vnd.fluiddb.value+json`) from everything
//! else. `Value` makes that distinction a closed set of variants decided once
//! when the value is constructed, so the request pipeline never has to sniff
//! types at runtime.

use serde::Serialize;

use crate::error::ApiError;

/// A request payload or a decoded primitive tag value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
    /// A homogeneous list of strings, FluidDB's only primitive collection.
    TextList(Vec<String>),
    /// Any other JSON: mappings, mixed lists, nested structures.
    Json(serde_json::Value),
    /// Bytes with no JSON interpretation. Must be sent with a MIME type.
    #[serde(skip)]
    Opaque(Vec<u8>),
}

impl Value {
    pub fn opaque(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Opaque(bytes.into())
    }

    /// True for values FluidDB stores as primitives.
    pub fn is_primitive(&self) -> bool {
        match self {
            Value::Integer(_)
            | Value::Float(_)
            | Value::Text(_)
            | Value::Bool(_)
            | Value::Null
            | Value::TextList(_) => true,
            Value::Json(json) => is_primitive(json),
            Value::Opaque(_) => false,
        }
    }

    /// True for JSON objects.
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Json(json) if is_mapping(json))
    }

    /// Encode as a JSON document.
    ///
    /// NaN and the infinities have no JSON form and are rejected rather than
    /// written as `null`.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ApiError> {
        self.check_finite()?;
        serde_json::to_vec(self).map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    /// The bytes sent when the caller supplies an explicit MIME type.
    ///
    /// Text and opaque payloads go out unchanged. Scalars are written in
    /// their plain textual form; lists and JSON fall back to JSON.
    pub fn to_raw_bytes(&self) -> Result<Vec<u8>, ApiError> {
        self.check_finite()?;
        Ok(match self {
            Value::Text(text) => text.clone().into_bytes(),
            Value::Opaque(bytes) => bytes.clone(),
            Value::Integer(n) => n.to_string().into_bytes(),
            Value::Float(f) => f.to_string().into_bytes(),
            Value::Bool(b) => b.to_string().into_bytes(),
            Value::Null => Vec::new(),
            Value::TextList(_) | Value::Json(_) => self.to_json_bytes()?,
        })
    }

    fn check_finite(&self) -> Result<(), ApiError> {
        let finite = match self {
            Value::Float(f) => f.is_finite(),
            Value::Json(json) => finite_numbers(json),
            _ => true,
        };
        if finite {
            Ok(())
        } else {
            Err(ApiError::SerializationError(format!(
                "non-finite number in {self:?}"
            )))
        }
    }
}

fn finite_numbers(json: &serde_json::Value) -> bool {
    match json {
        serde_json::Value::Number(n) => n.as_f64().map_or(true, f64::is_finite),
        serde_json::Value::Array(items) => items.iter().all(finite_numbers),
        serde_json::Value::Object(map) => map.values().all(finite_numbers),
        _ => true,
    }
}

/// Classify a raw JSON value: scalars and all-string arrays are primitive.
pub fn is_primitive(json: &serde_json::Value) -> bool {
    match json {
        serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Number(_)
        | serde_json::Value::String(_) => true,
        serde_json::Value::Array(items) => items.iter().all(serde_json::Value::is_string),
        serde_json::Value::Object(_) => false,
    }
}

pub fn is_mapping(json: &serde_json::Value) -> bool {
    json.is_object()
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.is_u64(), n.as_f64()) {
                (Some(i), _, _) => Value::Integer(i),
                // Above i64::MAX: a float would lose precision.
                (None, true, _) | (None, false, None) => Value::Json(serde_json::Value::Number(n)),
                (None, false, Some(f)) => Value::Float(f),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) if items.iter().all(serde_json::Value::is_string) => {
                Value::TextList(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            serde_json::Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => Value::Json(other),
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Value {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Value::Json(serde_json::Value::Object(map))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
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

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::TextList(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::TextList(items.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A response body decoded according to its content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No body: HEAD responses, 204s, and zero-length payloads.
    Empty,
    /// `application/vnd.fluiddb.value+json`.
    Value(Value),
    /// `application/json`.
    Json(serde_json::Value),
    /// Any other content type, returned unchanged.
    Raw(Vec<u8>),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Body::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Body::Json(json) => Some(json),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Field lookup on a JSON mapping body.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.as_json().and_then(|json| json.get(key))
    }
}
