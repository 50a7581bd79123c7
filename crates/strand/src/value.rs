//! Host values carried across the attribute boundary.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::child::Uid;

/// A value computed by the host.
///
/// `Value::None` is a present null value; an absent attribute is represented
/// by `Option::None` at the call site instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Arc<str>),
    /// Handle to a node of the scene
    Node { node: Uid },
    None,
}

/// Owned, cheaply clonable reference to a host value.
pub type ValueRef = Arc<Value>;

impl Value {
    pub fn text(v: impl Into<String>) -> Self {
        Value::Text(v.into().into())
    }

    pub fn into_ref(self) -> ValueRef {
        Arc::new(self)
    }

    /// Numeric view, widening ints to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Equality for change detection. Floats compare by bit pattern, so a
    /// NaN equals itself and `0.0` differs from `-0.0`.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Node { .. } => "node",
            Value::None => "none",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Node { node } => write!(f, "<node {node}>"),
            Value::None => f.write_str("None"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_distinct_from_absent() {
        let present: Option<ValueRef> = Some(Value::None.into_ref());
        let absent: Option<ValueRef> = None;
        assert_ne!(present, absent);
        assert!(present.unwrap().is_none());
    }

    #[test]
    fn numeric_widening() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::text("x").as_f64(), None);
    }

    #[test]
    fn same_as_is_reflexive_for_nan() {
        let nan = Value::Float(f64::NAN);
        assert_ne!(nan, nan.clone());
        assert!(nan.same_as(&nan.clone()));
        assert!(!Value::Float(0.0).same_as(&Value::Float(-0.0)));
        assert!(Value::Int(1).same_as(&Value::Int(1)));
        assert!(!Value::Int(1).same_as(&Value::Float(1.0)));
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_string(&vec![
            Value::Float(1.5),
            Value::text("hi"),
            Value::Node { node: 2 },
            Value::None,
        ])
        .unwrap();
        assert_eq!(json, r#"[1.5,"hi",{"node":2},null]"#);
    }
}
