//! # Value Type System
//!
//! The tagged value union flowing through iterators, expressions, and
//! results: scalars (bool, int, float, string, date, datetime), containers
//! (list, set, map, dataset), and graph values (vertex, edge, path).
//!
//! Arithmetic, comparison, and logical helpers propagate "bad nulls"
//! (`BadType`, `OutOfRange`, ...) through every operation, so a single
//! mistyped column poisons the expression result instead of aborting the
//! query.

pub mod data;
pub mod graph;

pub use data::{DataSet, List, Row};
pub use graph::{Edge, Path, Step, Tag, Vertex};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Sub-kinds of the null value.
///
/// `Null` is the ordinary missing value; every other kind is a "bad null"
/// that records why an operation could not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NullKind {
    Null,
    BadData,
    BadType,
    OutOfRange,
    DivByZero,
    UnknownProp,
}

/// The value union.
#[derive(Debug, Clone, Default, Serialize)]
pub enum Value {
    /// No value at all; distinct from null
    #[default]
    Empty,
    Null(NullKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    List(List),
    /// Unique collection; constructors deduplicate, equality ignores order
    Set(List),
    Map(BTreeMap<String, Value>),
    Vertex(Box<Vertex>),
    Edge(Box<Edge>),
    Path(Box<Path>),
    DataSet(Box<DataSet>),
}

/// Shared empty sentinel returned by accessors with nothing to report.
pub static EMPTY: Value = Value::Empty;
/// Shared plain-null sentinel for "name not found" lookups.
pub static NULL_VALUE: Value = Value::Null(NullKind::Null);
/// Shared bad-type sentinel for out-of-range positional lookups.
pub static NULL_BAD_TYPE: Value = Value::Null(NullKind::BadType);
/// Shared overflow sentinel.
pub static NULL_OUT_OF_RANGE: Value = Value::Null(NullKind::OutOfRange);

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Any null kind other than the plain null
    pub fn is_bad_null(&self) -> bool {
        matches!(self, Value::Null(k) if *k != NullKind::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_dataset(&self) -> bool {
        matches!(self, Value::DataSet(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&DataSet> {
        match self {
            Value::DataSet(ds) => Some(ds),
            _ => None,
        }
    }

    /// Convenience constructor for string values
    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn list(values: Vec<Value>) -> Value {
        Value::List(List { values })
    }

    pub fn dataset(ds: DataSet) -> Value {
        Value::DataSet(Box::new(ds))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Null(_) => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Vertex(_) => "vertex",
            Value::Edge(_) => "edge",
            Value::Path(_) => "path",
            Value::DataSet(_) => "dataset",
        }
    }

    /// Rough heap footprint, used for the per-query memory budget.
    pub fn memory_usage(&self) -> usize {
        let inner = match self {
            Value::Str(s) => s.len(),
            Value::List(l) | Value::Set(l) => l.values.iter().map(Value::memory_usage).sum(),
            Value::Map(m) => m.iter().map(|(k, v)| k.len() + v.memory_usage()).sum(),
            Value::Vertex(v) => v.memory_usage(),
            Value::Edge(e) => e.memory_usage(),
            Value::Path(p) => p.memory_usage(),
            Value::DataSet(ds) => ds.memory_usage(),
            _ => 0,
        };
        std::mem::size_of::<Value>() + inner
    }

    /// Numeric addition with bad-null and type-mismatch propagation.
    pub fn add(&self, rhs: &Value) -> Value {
        if let Some(poison) = propagate(self, rhs) {
            return poison;
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
                Some(v) => Value::Int(v),
                None => Value::Null(NullKind::OutOfRange),
            },
            (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
            (Value::Int(a), Value::Float(b)) => Value::Float(*a as f64 + b),
            (Value::Float(a), Value::Int(b)) => Value::Float(a + *b as f64),
            (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}")),
            _ => Value::Null(NullKind::BadType),
        }
    }

    pub fn sub(&self, rhs: &Value) -> Value {
        if let Some(poison) = propagate(self, rhs) {
            return poison;
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => match a.checked_sub(*b) {
                Some(v) => Value::Int(v),
                None => Value::Null(NullKind::OutOfRange),
            },
            (Value::Float(a), Value::Float(b)) => Value::Float(a - b),
            (Value::Int(a), Value::Float(b)) => Value::Float(*a as f64 - b),
            (Value::Float(a), Value::Int(b)) => Value::Float(a - *b as f64),
            _ => Value::Null(NullKind::BadType),
        }
    }

    pub fn mul(&self, rhs: &Value) -> Value {
        if let Some(poison) = propagate(self, rhs) {
            return poison;
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => match a.checked_mul(*b) {
                Some(v) => Value::Int(v),
                None => Value::Null(NullKind::OutOfRange),
            },
            (Value::Float(a), Value::Float(b)) => Value::Float(a * b),
            (Value::Int(a), Value::Float(b)) => Value::Float(*a as f64 * b),
            (Value::Float(a), Value::Int(b)) => Value::Float(a * *b as f64),
            _ => Value::Null(NullKind::BadType),
        }
    }

    pub fn div(&self, rhs: &Value) -> Value {
        if let Some(poison) = propagate(self, rhs) {
            return poison;
        }
        match (self, rhs) {
            (Value::Int(_), Value::Int(0)) => Value::Null(NullKind::DivByZero),
            (Value::Int(a), Value::Int(b)) => match a.checked_div(*b) {
                Some(v) => Value::Int(v),
                None => Value::Null(NullKind::OutOfRange),
            },
            (Value::Float(a), Value::Float(b)) => Value::Float(a / b),
            (Value::Int(a), Value::Float(b)) => Value::Float(*a as f64 / b),
            (Value::Float(a), Value::Int(b)) => Value::Float(a / *b as f64),
            _ => Value::Null(NullKind::BadType),
        }
    }

    /// Ordering between comparable values; `None` for incomparable pairs.
    pub fn compare(&self, rhs: &Value) -> Option<std::cmp::Ordering> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Logical and with null handling: `false && anything == false`.
    pub fn logical_and(&self, rhs: &Value) -> Value {
        match (self.as_bool(), rhs.as_bool()) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => propagate(self, rhs).unwrap_or(Value::Null(NullKind::BadType)),
        }
    }

    /// Logical or with null handling: `true || anything == true`.
    pub fn logical_or(&self, rhs: &Value) -> Value {
        match (self.as_bool(), rhs.as_bool()) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => propagate(self, rhs).unwrap_or(Value::Null(NullKind::BadType)),
        }
    }
}

/// Bad nulls and plain nulls win over any computation on the other side.
fn propagate(lhs: &Value, rhs: &Value) -> Option<Value> {
    for v in [lhs, rhs] {
        if v.is_bad_null() {
            return Some(v.clone());
        }
    }
    if lhs.is_null() || rhs.is_null() {
        return Some(Value::Null(NullKind::Null));
    }
    None
}

/// Strict, structural equality: variants never compare equal across types
/// (use [`Value::compare`] for numeric int/float comparison), so `Eq` stays
/// consistent with `Hash`.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Null(a), Value::Null(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.values.len() == b.values.len() && a.values.iter().all(|v| b.values.contains(v))
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Vertex(a), Value::Vertex(b)) => a == b,
            (Value::Edge(a), Value::Edge(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::DataSet(a), Value::DataSet(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Empty => {}
            Value::Null(k) => k.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(d) => d.hash(state),
            Value::List(l) | Value::Set(l) => l.hash(state),
            Value::Map(m) => m.hash(state),
            Value::Vertex(v) => v.hash(state),
            Value::Edge(e) => e.hash(state),
            Value::Path(p) => p.hash(state),
            Value::DataSet(ds) => ds.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "__EMPTY__"),
            Value::Null(NullKind::Null) => write!(f, "NULL"),
            Value::Null(k) => write!(f, "NULL({k:?})"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(d) => write!(f, "{d}"),
            Value::List(l) | Value::Set(l) => {
                let items: Vec<String> = l.values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Map(m) => {
                let items: Vec<String> = m.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Value::Vertex(v) => write!(f, "{v}"),
            Value::Edge(e) => write!(f, "{e}"),
            Value::Path(p) => write!(f, "{p}"),
            Value::DataSet(ds) => write!(f, "{ds}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_null_propagation() {
        let bad = Value::Null(NullKind::BadType);
        assert_eq!(Value::Int(1).add(&bad), bad);
        assert_eq!(bad.mul(&Value::Int(2)), bad);
        assert_eq!(
            Value::Int(1).add(&Value::Null(NullKind::Null)),
            Value::Null(NullKind::Null)
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(Value::Int(2).add(&Value::Int(3)), Value::Int(5));
        assert_eq!(Value::Int(2).add(&Value::Float(0.5)), Value::Float(2.5));
        assert_eq!(
            Value::string("foo").add(&Value::string("bar")),
            Value::string("foobar")
        );
        assert_eq!(
            Value::Int(1).add(&Value::Bool(true)),
            Value::Null(NullKind::BadType)
        );
        assert_eq!(
            Value::Int(i64::MAX).add(&Value::Int(1)),
            Value::Null(NullKind::OutOfRange)
        );
        assert_eq!(
            Value::Int(1).div(&Value::Int(0)),
            Value::Null(NullKind::DivByZero)
        );
    }

    #[test]
    fn test_logical() {
        let null = Value::Null(NullKind::Null);
        assert_eq!(Value::Bool(false).logical_and(&null), Value::Bool(false));
        assert_eq!(Value::Bool(true).logical_or(&null), Value::Bool(true));
        assert_eq!(Value::Bool(true).logical_and(&null), null);
    }

    #[test]
    fn test_compare_mixed_numeric() {
        assert_eq!(
            Value::Int(2).compare(&Value::Float(2.0)),
            Some(std::cmp::Ordering::Equal)
        );
        assert_eq!(Value::Int(2).compare(&Value::string("2")), None);
    }

    #[test]
    fn test_memory_usage_counts_heap() {
        let small = Value::Int(1).memory_usage();
        let big = Value::string("x".repeat(100)).memory_usage();
        assert!(big > small);
    }
}
