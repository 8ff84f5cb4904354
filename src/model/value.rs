//! Universal value type for the query engine.
//!
//! Every datum flowing through the pipeline — property values, expression
//! results, result-row cells — is a `Value`. Equality, ordering, and
//! truthiness follow openCypher's three-valued semantics.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::spatial::Point;
use super::temporal::Duration;
use super::{EdgeRef, NodeRef, PathValue};
use crate::{Error, Result};

/// A map of property names to values. Insertion order is preserved and is
/// part of the Map contract.
pub type PropertyMap = IndexMap<String, Value>;

/// A value in the openCypher type system.
///
/// Covers:
/// - Scalars: Bool, Int, Float, String
/// - Temporal: Date, Time, DateTime (zoned), LocalDateTime, Duration
/// - Spatial: Point, Distance
/// - Containers: List, Map
/// - Graph: Node, Edge, Path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),

    // Temporal types
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<FixedOffset>),
    LocalDateTime(NaiveDateTime),
    Duration(Duration),

    // Spatial types
    Point(Point),
    /// Non-negative real produced by `distance()`. Compares numerically
    /// with Int and Float.
    Distance(f64),

    // Containers
    List(Vec<Value>),
    Map(IndexMap<String, Value>),

    // Graph types
    Node(Box<NodeRef>),
    Edge(Box<EdgeRef>),
    Path(Box<PathValue>),
}

/// Three-valued logic: the result of a propositional expression.
///
/// `Unknown` is the logical image of NULL. Conjunction, disjunction and
/// negation follow Kleene's strong three-valued tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }

    /// Filter semantics: only `True` passes.
    pub fn passes(self) -> bool {
        self == Truth::True
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b { Truth::True } else { Truth::False }
    }
}

impl From<Truth> for Value {
    fn from(t: Truth) -> Self {
        match t {
            Truth::True => Value::Bool(true),
            Truth::False => Value::Bool(false),
            Truth::Unknown => Value::Null,
        }
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::DateTime(_) => "DATETIME",
            Value::LocalDateTime(_) => "LOCAL_DATETIME",
            Value::Duration(_) => "DURATION",
            Value::Point(_) => "POINT",
            Value::Distance(_) => "DISTANCE",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
            Value::Node(_) => "NODE",
            Value::Edge(_) => "EDGE",
            Value::Path(_) => "PATH",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Distance(_))
    }

    /// True when the value is a graph entity or container — kinds that the
    /// `toX` conversions refuse.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Map(_) | Value::Node(_) | Value::Edge(_) | Value::Path(_)
        )
    }

    /// Predicate truthiness: `true` passes, `false` and NULL are filtered
    /// out. Any other kind used as a predicate is a type error.
    pub fn truth(&self) -> Result<Truth> {
        match self {
            Value::Null => Ok(Truth::Unknown),
            Value::Bool(b) => Ok(Truth::from(*b)),
            other => Err(Error::Type {
                expected: "BOOLEAN".into(),
                got: other.type_name().into(),
            }),
        }
    }

    /// Attempt to extract as i64.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempt to extract as f64 (Int widens, Distance unwraps).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Distance(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Host-facing conversion for embedders that speak JSON. Graph entities
/// flatten to their property maps; temporal and spatial values stringify.
impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) | Value::Distance(f) => {
                serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number)
            }
            Value::String(s) => Json::String(s.clone()),
            Value::List(l) => Json::Array(l.iter().map(Json::from).collect()),
            Value::Map(m) => {
                Json::Object(m.iter().map(|(k, v)| (k.clone(), Json::from(v))).collect())
            }
            Value::Node(n) => Json::Object(
                n.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), Json::from(v)))
                    .collect(),
            ),
            Value::Edge(e) => Json::Object(
                e.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), Json::from(v)))
                    .collect(),
            ),
            other => Json::String(other.to_string()),
        }
    }
}

// ============================================================================
// Equality and ordering (openCypher rules)
// ============================================================================

impl Value {
    /// openCypher `=` semantics. Any NULL operand (including NULLs nested in
    /// lists or maps) yields `Unknown`; values of different kinds compare
    /// unequal, except that Int, Float and Distance compare numerically.
    pub fn equals(&self, other: &Value) -> Truth {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Truth::Unknown,

            (Value::Bool(a), Value::Bool(b)) => Truth::from(a == b),
            (Value::String(a), Value::String(b)) => Truth::from(a == b),

            (a, b) if a.is_numeric() && b.is_numeric() => match (a, b) {
                (Value::Int(x), Value::Int(y)) => Truth::from(x == y),
                _ => {
                    // as_float is Some for every numeric kind
                    let (x, y) = (a.as_float().unwrap(), b.as_float().unwrap());
                    Truth::from(x == y)
                }
            },

            (Value::Date(a), Value::Date(b)) => Truth::from(a == b),
            (Value::Time(a), Value::Time(b)) => Truth::from(a == b),
            (Value::DateTime(a), Value::DateTime(b)) => Truth::from(a == b),
            (Value::LocalDateTime(a), Value::LocalDateTime(b)) => Truth::from(a == b),
            (Value::Duration(a), Value::Duration(b)) => Truth::from(a == b),
            (Value::Point(a), Value::Point(b)) => Truth::from(a == b),

            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Truth::False;
                }
                let mut result = Truth::True;
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.equals(y) {
                        Truth::False => return Truth::False,
                        Truth::Unknown => result = Truth::Unknown,
                        Truth::True => {}
                    }
                }
                result
            }
            (Value::Map(a), Value::Map(b)) => {
                if a.len() != b.len() {
                    return Truth::False;
                }
                let mut result = Truth::True;
                for (k, x) in a {
                    match b.get(k) {
                        None => return Truth::False,
                        Some(y) => match x.equals(y) {
                            Truth::False => return Truth::False,
                            Truth::Unknown => result = Truth::Unknown,
                            Truth::True => {}
                        },
                    }
                }
                result
            }

            (Value::Node(a), Value::Node(b)) => Truth::from(a.id == b.id),
            (Value::Edge(a), Value::Edge(b)) => Truth::from(a.id == b.id),
            (Value::Path(a), Value::Path(b)) => {
                Truth::from(a.node_ids() == b.node_ids() && a.edge_ids() == b.edge_ids())
            }

            // Different kinds: unequal, not NULL
            _ => Truth::False,
        }
    }

    /// Ordering within compatible kinds. `None` means the kinds are
    /// incomparable — the caller turns that into an evaluation-time error.
    /// NULL operands also yield `None`; the NULL sort policy (last under
    /// ASC, first under DESC) is applied by the sort comparator, not here.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,

            (a, b) if a.is_numeric() && b.is_numeric() => match (a, b) {
                (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
                _ => a.as_float().unwrap().partial_cmp(&b.as_float().unwrap()),
            },

            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),

            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::LocalDateTime(a), Value::LocalDateTime(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => a.partial_cmp(b),

            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        other => return Some(other),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }

            _ => None,
        }
    }

    /// Identity used for grouping keys, DISTINCT and UNION deduplication:
    /// NULL equals NULL here, and numerics compare by value. This is the
    /// one place where NULL is not contagious.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same_value(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, x)| b.get(k).is_some_and(|y| x.same_value(y)))
            }
            _ => self.equals(other) == Truth::True,
        }
    }
}

// ============================================================================
// Display (default stringification, used by toString and string concat)
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Distance(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::LocalDateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::Duration(d) => write!(f, "{d}"),
            Value::Point(p) => write!(f, "{p}"),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Node(n) => write!(f, "{n}"),
            Value::Edge(e) => write!(f, "{e}"),
            Value::Path(p) => write!(f, "{p}"),
        }
    }
}

// ============================================================================
// Temporal component access (shared by the year()/month()/... built-ins)
// ============================================================================

impl Value {
    /// Extract a temporal component by name, dispatching on the operand
    /// kind. Returns None when the component does not apply.
    pub fn temporal_component(&self, name: &str) -> Option<i64> {
        match self {
            Value::Date(d) => match name {
                "year" => Some(i64::from(d.year())),
                "month" => Some(i64::from(d.month())),
                "day" => Some(i64::from(d.day())),
                _ => None,
            },
            Value::Time(t) => match name {
                "hour" => Some(i64::from(t.hour())),
                "minute" => Some(i64::from(t.minute())),
                "second" => Some(i64::from(t.second())),
                _ => None,
            },
            Value::DateTime(dt) => Self::datetime_component(&dt.naive_local(), name),
            Value::LocalDateTime(dt) => Self::datetime_component(dt, name),
            Value::Duration(d) => d.component(name),
            _ => None,
        }
    }

    fn datetime_component(dt: &NaiveDateTime, name: &str) -> Option<i64> {
        match name {
            "year" => Some(i64::from(dt.year())),
            "month" => Some(i64::from(dt.month())),
            "day" => Some(i64::from(dt.day())),
            "hour" => Some(i64::from(dt.hour())),
            "minute" => Some(i64::from(dt.minute())),
            "second" => Some(i64::from(dt.second())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(2.5), Value::Float(2.5));
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn test_null_equality_is_unknown() {
        assert_eq!(Value::Null.equals(&Value::Null), Truth::Unknown);
        assert_eq!(Value::Int(1).equals(&Value::Null), Truth::Unknown);
    }

    #[test]
    fn test_cross_kind_equality_is_false() {
        assert_eq!(Value::Int(1).equals(&Value::String("1".into())), Truth::False);
        assert_eq!(Value::Bool(true).equals(&Value::Int(1)), Truth::False);
    }

    #[test]
    fn test_numeric_equality_across_kinds() {
        assert_eq!(Value::Int(1).equals(&Value::Float(1.0)), Truth::True);
        assert_eq!(Value::Distance(2.0).equals(&Value::Float(2.0)), Truth::True);
    }

    #[test]
    fn test_list_equality_with_nested_null() {
        let a = Value::List(vec![Value::Int(1), Value::Null]);
        let b = Value::List(vec![Value::Int(1), Value::Null]);
        assert_eq!(a.equals(&b), Truth::Unknown);

        let c = Value::List(vec![Value::Int(2), Value::Null]);
        assert_eq!(a.equals(&c), Truth::False);
    }

    #[test]
    fn test_compare_incompatible_kinds() {
        assert!(Value::Int(1).compare(&Value::String("a".into())).is_none());
        assert!(Value::Bool(true).compare(&Value::Int(1)).is_none());
    }

    #[test]
    fn test_compare_numeric() {
        assert_eq!(
            Value::Int(1).compare(&Value::Float(1.5)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_truth_tables() {
        use Truth::*;
        assert_eq!(True.and(Unknown), Unknown);
        assert_eq!(False.and(Unknown), False);
        assert_eq!(True.or(Unknown), True);
        assert_eq!(False.or(Unknown), Unknown);
        assert_eq!(Unknown.not(), Unknown);
    }

    #[test]
    fn test_truth_rejects_non_booleans() {
        assert_eq!(Value::Bool(true).truth().unwrap(), Truth::True);
        assert_eq!(Value::Bool(false).truth().unwrap(), Truth::False);
        assert_eq!(Value::Null.truth().unwrap(), Truth::Unknown);
        assert!(Value::Int(1).truth().is_err());
        assert!(Value::from("true").truth().is_err());
        assert!(Value::List(vec![]).truth().is_err());
    }

    #[test]
    fn test_same_value_groups_nulls() {
        assert!(Value::Null.same_value(&Value::Null));
        assert!(Value::Int(1).same_value(&Value::Float(1.0)));
        assert!(!Value::Null.same_value(&Value::Int(0)));
    }

    #[test]
    fn test_map_preserves_insertion_order() {
        let mut m = IndexMap::new();
        m.insert("z".to_string(), Value::Int(1));
        m.insert("a".to_string(), Value::Int(2));
        let keys: Vec<_> = m.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
