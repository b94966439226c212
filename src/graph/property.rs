//! Free-form attribute values carried by family members
//!
//! Attributes are schemaless: the core never validates them, it only stores
//! them, matches them against search patterns and hands them back.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Attribute value supporting the shapes a JSON document can carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<PropertyValue>),
    Map(HashMap<String, PropertyValue>),
    Null,
}

impl PropertyValue {
    pub fn as_map(&self) -> Option<&HashMap<String, PropertyValue>> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Text used when matching this value against a search pattern.
    ///
    /// Only scalars have a textual form; containers and null never match.
    pub fn match_text(&self) -> Option<String> {
        match self {
            PropertyValue::String(s) => Some(s.clone()),
            PropertyValue::Integer(i) => Some(i.to_string()),
            PropertyValue::Float(f) => Some(f.to_string()),
            PropertyValue::Boolean(b) => Some(b.to_string()),
            PropertyValue::Array(_) | PropertyValue::Map(_) | PropertyValue::Null => None,
        }
    }

    /// Convert into a plain JSON value for the service boundary
    pub fn to_json(&self) -> JsonValue {
        match self {
            PropertyValue::String(s) => JsonValue::String(s.clone()),
            PropertyValue::Integer(i) => JsonValue::from(*i),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            PropertyValue::Boolean(b) => JsonValue::Bool(*b),
            PropertyValue::Array(arr) => JsonValue::Array(arr.iter().map(|v| v.to_json()).collect()),
            PropertyValue::Map(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            PropertyValue::Null => JsonValue::Null,
        }
    }

    /// Build from a plain JSON value. Numbers that fit `i64` become integers.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => PropertyValue::Null,
            JsonValue::Bool(b) => PropertyValue::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => PropertyValue::String(s.clone()),
            JsonValue::Array(arr) => PropertyValue::Array(arr.iter().map(Self::from_json).collect()),
            JsonValue::Object(obj) => PropertyValue::Map(
                obj.iter().map(|(k, v)| (k.clone(), Self::from_json(v))).collect(),
            ),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Attribute map of a person
pub type PropertyMap = HashMap<String, PropertyValue>;

/// Resolve a `.`-separated path through nested maps
pub fn lookup_path<'a>(properties: &'a PropertyMap, path: &str) -> Option<&'a PropertyValue> {
    let mut segments = path.split('.');
    let mut current = properties.get(segments.next()?)?;
    for segment in segments {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}
