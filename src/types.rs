//! Core data types for filtergraph-rs
//!
//! This module contains the value representations that flow through a
//! filter graph and the typed parameters attached to each node.
//!
//! # Main Types
//!
//! - [`Value`] - A result produced by a filter or supplied as a root binding
//! - [`ParamValue`] - A single typed node parameter
//! - [`ParamMap`] - Name-ordered parameter map of a node
//!
//! The engine itself never looks inside a [`Value`]; only the filters do.
//! Scalars broadcast against arrays in the built-in arithmetic filters, and
//! a composition of scalars collapses to an array so that a composed value
//! looks the same whether it came from a root or from a `compose` node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A value flowing along graph edges.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Value {
    /// No value (produced by filters without an output)
    #[default]
    Null,
    /// A single scalar
    Float(f64),
    /// A flat numeric array
    Array(Vec<f64>),
    /// A multi-component value whose components are themselves values
    Composite(Vec<Value>),
    /// Free-form text (file names, command output, ...)
    Text(String),
}

impl Value {
    /// Build a multi-component value. All-scalar components collapse to an array.
    pub fn compose(components: Vec<Value>) -> Self {
        if components.iter().all(|c| matches!(c, Value::Float(_))) {
            Value::Array(components.iter().filter_map(Value::as_float).collect())
        } else {
            Value::Composite(components)
        }
    }

    /// Extract component `index` of an array or composite value.
    pub fn component(&self, index: usize) -> Option<Value> {
        match self {
            Value::Array(items) => items.get(index).copied().map(Value::Float),
            Value::Composite(items) => items.get(index).cloned(),
            _ => None,
        }
    }

    /// Number of components (1 for scalars and text, 0 for null).
    pub fn component_count(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Float(_) | Value::Text(_) => 1,
            Value::Array(items) => items.len(),
            Value::Composite(items) => items.len(),
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
            Value::Composite(_) => "composite",
            Value::Text(_) => "text",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Array(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Composite(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            Value::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A typed node parameter.
///
/// Serialized untagged so graph dictionaries stay compact; variant order
/// matters for deserialization (integers must be tried before floats).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "text",
        }
    }

    /// Float view; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert `self` to the type of `declared`, if compatible.
    ///
    /// Only same-type assignments and int-to-float widening are accepted.
    pub fn coerce_to(&self, declared: &ParamValue) -> Option<ParamValue> {
        match (declared, self) {
            (ParamValue::Float(_), ParamValue::Int(v)) => Some(ParamValue::Float(*v as f64)),
            (ParamValue::Float(_), ParamValue::Float(_))
            | (ParamValue::Int(_), ParamValue::Int(_))
            | (ParamValue::Bool(_), ParamValue::Bool(_))
            | (ParamValue::Text(_), ParamValue::Text(_)) => Some(self.clone()),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Parameters of a node, ordered by name.
pub type ParamMap = BTreeMap<String, ParamValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_scalars_collapses_to_array() {
        let v = Value::compose(vec![Value::Float(1.0), Value::Float(2.0)]);
        assert_eq!(v, Value::Array(vec![1.0, 2.0]));
        assert_eq!(v.component(1), Some(Value::Float(2.0)));
    }

    #[test]
    fn test_compose_mixed_stays_composite() {
        let v = Value::compose(vec![Value::Float(1.0), Value::Array(vec![2.0, 3.0])]);
        assert_eq!(v.component_count(), 2);
        assert_eq!(v.component(1), Some(Value::Array(vec![2.0, 3.0])));
        assert_eq!(v.component(2), None);
    }

    #[test]
    fn test_param_coercion() {
        let declared = ParamValue::Float(0.0);
        assert_eq!(
            ParamValue::Int(3).coerce_to(&declared),
            Some(ParamValue::Float(3.0))
        );
        assert_eq!(ParamValue::Bool(true).coerce_to(&declared), None);
        assert_eq!(
            ParamValue::Float(1.5).coerce_to(&ParamValue::Int(0)),
            None
        );
    }

    #[test]
    fn test_param_untagged_json() {
        let json = serde_json::to_string(&vec![
            ParamValue::Int(3),
            ParamValue::Float(3.0),
            ParamValue::Bool(true),
        ])
        .unwrap();
        let parsed: Vec<ParamValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0], ParamValue::Int(3));
        assert_eq!(parsed[1], ParamValue::Float(3.0));
        assert_eq!(parsed[2], ParamValue::Bool(true));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Array(vec![1.0, 2.5]).to_string(), "[1, 2.5]");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
