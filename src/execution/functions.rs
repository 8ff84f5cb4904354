//! Built-in functions.
//!
//! Scalar, predicate, list, numeric, string, temporal, spatial and path
//! functions. Names are case-insensitive. The `toX` conversions return
//! NULL on failure and on structural operands rather than erroring;
//! genuinely malformed arguments (bad date strings, out-of-range
//! coordinates) are value errors.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::model::{Crs, Duration, Point, Value};
use crate::{Error, Result};

pub fn call(name: &str, args: &[Value]) -> Result<Value> {
    let lower = name.to_lowercase();
    match lower.as_str() {
        // ====================================================================
        // Scalar / graph introspection
        // ====================================================================
        "id" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Node(n) => Ok(Value::Int(n.id.0 as i64)),
                Value::Edge(e) => Ok(Value::Int(e.id.0 as i64)),
                other => entity_error(other),
            }
        }
        "type" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Edge(e) => Ok(Value::String(e.edge_type.clone())),
                other => Err(Error::Type {
                    expected: "EDGE".into(),
                    got: other.type_name().into(),
                }),
            }
        }
        "labels" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Node(n) => Ok(Value::List(
                    n.labels.iter().map(|l| Value::String(l.clone())).collect(),
                )),
                other => Err(Error::Type {
                    expected: "NODE".into(),
                    got: other.type_name().into(),
                }),
            }
        }
        "properties" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Node(n) => Ok(Value::Map(n.properties.clone())),
                Value::Edge(e) => Ok(Value::Map(e.properties.clone())),
                Value::Map(m) => Ok(Value::Map(m.clone())),
                other => entity_error(other),
            }
        }
        "keys" => {
            let arg = one(&lower, args)?;
            let keys: Vec<Value> = match arg {
                Value::Null => return Ok(Value::Null),
                Value::Node(n) => n.properties.keys().map(|k| Value::String(k.clone())).collect(),
                Value::Edge(e) => e.properties.keys().map(|k| Value::String(k.clone())).collect(),
                Value::Map(m) => m.keys().map(|k| Value::String(k.clone())).collect(),
                other => return entity_error(other),
            };
            Ok(Value::List(keys))
        }
        "timestamp" => Ok(Value::Int(Utc::now().timestamp_millis())),

        // ====================================================================
        // Conversions (NULL on failure, NULL on structural operands)
        // ====================================================================
        "toboolean" => {
            let arg = one(&lower, args)?;
            Ok(match arg {
                Value::Bool(b) => Value::Bool(*b),
                Value::String(s) => match s.to_lowercase().as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => Value::Null,
                },
                _ => Value::Null,
            })
        }
        "tointeger" => {
            let arg = one(&lower, args)?;
            Ok(match arg {
                Value::Int(i) => Value::Int(*i),
                Value::Float(f) if f.is_finite() => Value::Int(*f as i64),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .or_else(|_| s.trim().parse::<f64>().map(|f| Value::Int(f as i64)))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            })
        }
        "tofloat" => {
            let arg = one(&lower, args)?;
            Ok(match arg {
                Value::Float(f) => Value::Float(*f),
                Value::Int(i) => Value::Float(*i as f64),
                Value::Distance(d) => Value::Float(*d),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            })
        }
        "tostring" => {
            let arg = one(&lower, args)?;
            Ok(match arg {
                Value::Null => Value::Null,
                structural if structural.is_structural() => Value::Null,
                other => Value::String(other.to_string()),
            })
        }

        // ====================================================================
        // Predicates
        // ====================================================================
        "exists" => {
            let arg = one(&lower, args)?;
            Ok(Value::Bool(!arg.is_null()))
        }
        "isempty" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::List(l) => Ok(Value::Bool(l.is_empty())),
                Value::Map(m) => Ok(Value::Bool(m.is_empty())),
                Value::String(s) => Ok(Value::Bool(s.is_empty())),
                other => Err(Error::Type {
                    expected: "LIST, MAP, or STRING".into(),
                    got: other.type_name().into(),
                }),
            }
        }

        // ====================================================================
        // Lists
        // ====================================================================
        "size" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::List(l) => Ok(Value::Int(l.len() as i64)),
                Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::Map(m) => Ok(Value::Int(m.len() as i64)),
                other => Err(Error::Type {
                    expected: "LIST or STRING".into(),
                    got: other.type_name().into(),
                }),
            }
        }
        "head" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::List(l) => Ok(l.first().cloned().unwrap_or(Value::Null)),
                other => list_error(other),
            }
        }
        "last" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::List(l) => Ok(l.last().cloned().unwrap_or(Value::Null)),
                other => list_error(other),
            }
        }
        "tail" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::List(l) => Ok(Value::List(l.iter().skip(1).cloned().collect())),
                other => list_error(other),
            }
        }
        "reverse" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::List(l) => Ok(Value::List(l.iter().rev().cloned().collect())),
                Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
                other => Err(Error::Type {
                    expected: "LIST or STRING".into(),
                    got: other.type_name().into(),
                }),
            }
        }
        "range" => {
            if args.len() < 2 || args.len() > 3 {
                return Err(arity_error(&lower, "2 or 3", args.len()));
            }
            if args.iter().any(Value::is_null) {
                return Ok(Value::Null);
            }
            let start = int_arg(&lower, &args[0])?;
            let end = int_arg(&lower, &args[1])?;
            let step = if args.len() == 3 {
                int_arg(&lower, &args[2])?
            } else {
                1
            };
            if step == 0 {
                return Err(Error::Value("range() step must not be zero".into()));
            }
            let mut out = Vec::new();
            let mut i = start;
            while (step > 0 && i <= end) || (step < 0 && i >= end) {
                out.push(Value::Int(i));
                i += step;
            }
            Ok(Value::List(out))
        }

        // ====================================================================
        // Numeric
        // ====================================================================
        "abs" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Int(i) => Ok(Value::Int(i.abs())),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => numeric_error(other),
            }
        }
        "ceil" => float_fn(&lower, args, f64::ceil),
        "floor" => float_fn(&lower, args, f64::floor),
        "round" => float_fn(&lower, args, f64::round),
        "sqrt" => float_fn(&lower, args, f64::sqrt),
        "sign" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Int(i) => Ok(Value::Int(i.signum())),
                Value::Float(f) => Ok(Value::Int(if *f > 0.0 {
                    1
                } else if *f < 0.0 {
                    -1
                } else {
                    0
                })),
                other => numeric_error(other),
            }
        }
        "rand" => {
            if !args.is_empty() {
                return Err(arity_error(&lower, "0", args.len()));
            }
            Ok(Value::Float(rand::random::<f64>()))
        }

        // ====================================================================
        // Strings
        // ====================================================================
        "substring" => {
            if args.len() < 2 || args.len() > 3 {
                return Err(arity_error(&lower, "2 or 3", args.len()));
            }
            let Value::String(s) = &args[0] else {
                return match &args[0] {
                    Value::Null => Ok(Value::Null),
                    other => string_error(other),
                };
            };
            let start = int_arg(&lower, &args[1])?;
            if start < 0 {
                return Err(Error::Value("substring() start must not be negative".into()));
            }
            let chars: Vec<char> = s.chars().collect();
            let start = (start as usize).min(chars.len());
            let end = if args.len() == 3 {
                let length = int_arg(&lower, &args[2])?;
                if length < 0 {
                    return Err(Error::Value(
                        "substring() length must not be negative".into(),
                    ));
                }
                (start + length as usize).min(chars.len())
            } else {
                chars.len()
            };
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        "trim" => string_fn(&lower, args, |s| s.trim().to_string()),
        "ltrim" => string_fn(&lower, args, |s| s.trim_start().to_string()),
        "rtrim" => string_fn(&lower, args, |s| s.trim_end().to_string()),
        "upper" | "toupper" => string_fn(&lower, args, str::to_uppercase),
        "lower" | "tolower" => string_fn(&lower, args, str::to_lowercase),
        "split" => {
            let (s, sep) = two(&lower, args)?;
            match (s, sep) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::String(s), Value::String(sep)) => Ok(Value::List(
                    s.split(sep.as_str())
                        .map(|part| Value::String(part.to_string()))
                        .collect(),
                )),
                (other, _) => string_error(other),
            }
        }
        "replace" => {
            if args.len() != 3 {
                return Err(arity_error(&lower, "3", args.len()));
            }
            match (&args[0], &args[1], &args[2]) {
                (Value::Null, _, _) | (_, Value::Null, _) | (_, _, Value::Null) => Ok(Value::Null),
                (Value::String(s), Value::String(from), Value::String(to)) => {
                    Ok(Value::String(s.replace(from.as_str(), to.as_str())))
                }
                (other, _, _) => string_error(other),
            }
        }
        "left" => {
            let (s, n) = two(&lower, args)?;
            match s {
                Value::Null => Ok(Value::Null),
                Value::String(s) => {
                    let n = int_arg(&lower, n)?;
                    if n < 0 {
                        return Err(Error::Value("left() length must not be negative".into()));
                    }
                    Ok(Value::String(s.chars().take(n as usize).collect()))
                }
                other => string_error(other),
            }
        }
        "right" => {
            let (s, n) = two(&lower, args)?;
            match s {
                Value::Null => Ok(Value::Null),
                Value::String(s) => {
                    let n = int_arg(&lower, n)?;
                    if n < 0 {
                        return Err(Error::Value("right() length must not be negative".into()));
                    }
                    let chars: Vec<char> = s.chars().collect();
                    let skip = chars.len().saturating_sub(n as usize);
                    Ok(Value::String(chars[skip..].iter().collect()))
                }
                other => string_error(other),
            }
        }

        // ====================================================================
        // Temporal
        // ====================================================================
        "date" => match args {
            [] => Ok(Value::Date(Utc::now().date_naive())),
            [Value::Null] => Ok(Value::Null),
            [Value::String(s)] => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| Error::Value(format!("cannot parse date from `{s}`"))),
            [Value::Date(d)] => Ok(Value::Date(*d)),
            [other] => string_error(other),
            _ => Err(arity_error(&lower, "0 or 1", args.len())),
        },
        "datetime" => match args {
            [] => Ok(Value::DateTime(Utc::now().fixed_offset())),
            [Value::Null] => Ok(Value::Null),
            [Value::String(s)] => parse_datetime(s),
            [Value::DateTime(dt)] => Ok(Value::DateTime(*dt)),
            [other] => string_error(other),
            _ => Err(arity_error(&lower, "0 or 1", args.len())),
        },
        "time" => match args {
            [] => Ok(Value::Time(Utc::now().time())),
            [Value::Null] => Ok(Value::Null),
            [Value::String(s)] => NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map(Value::Time)
                .map_err(|_| Error::Value(format!("cannot parse time from `{s}`"))),
            [Value::Time(t)] => Ok(Value::Time(*t)),
            [other] => string_error(other),
            _ => Err(arity_error(&lower, "0 or 1", args.len())),
        },
        "duration" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::String(s) => Duration::parse(s)
                    .map(Value::Duration)
                    .ok_or_else(|| Error::Value(format!("cannot parse duration from `{s}`"))),
                Value::Duration(d) => Ok(Value::Duration(*d)),
                other => string_error(other),
            }
        }
        "year" | "month" | "day" | "hour" | "minute" | "second" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                value @ (Value::Date(_)
                | Value::Time(_)
                | Value::DateTime(_)
                | Value::LocalDateTime(_)
                | Value::Duration(_)) => Ok(value
                    .temporal_component(&lower)
                    .map_or(Value::Null, Value::Int)),
                other => Err(Error::Type {
                    expected: "temporal value".into(),
                    got: other.type_name().into(),
                }),
            }
        }

        // ====================================================================
        // Spatial
        // ====================================================================
        "point" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Map(map) => build_point(map),
                other => Err(Error::Type {
                    expected: "MAP".into(),
                    got: other.type_name().into(),
                }),
            }
        }
        "distance" => {
            let (a, b) = two(&lower, args)?;
            match (a, b) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::Point(p1), Value::Point(p2)) => p1
                    .distance(p2)
                    .map(Value::Distance)
                    .ok_or_else(|| Error::Value("cannot mix cartesian and geographic points".into())),
                (other, _) => Err(Error::Type {
                    expected: "POINT".into(),
                    got: other.type_name().into(),
                }),
            }
        }

        // ====================================================================
        // Paths
        // ====================================================================
        "length" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Path(p) => Ok(Value::Int(p.len() as i64)),
                // Accepted for compatibility with list/string callers.
                Value::List(l) => Ok(Value::Int(l.len() as i64)),
                Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(Error::Type {
                    expected: "PATH".into(),
                    got: other.type_name().into(),
                }),
            }
        }
        "nodes" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Path(p) => Ok(Value::List(
                    p.nodes()
                        .iter()
                        .map(|n| Value::Node(Box::new(n.clone())))
                        .collect(),
                )),
                other => path_error(other),
            }
        }
        "relationships" => {
            let arg = one(&lower, args)?;
            match arg {
                Value::Null => Ok(Value::Null),
                Value::Path(p) => Ok(Value::List(
                    p.edges()
                        .iter()
                        .map(|e| Value::Edge(Box::new(e.clone())))
                        .collect(),
                )),
                other => path_error(other),
            }
        }

        _ => Err(Error::Plan(format!("unknown function `{name}`"))),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn one<'v>(name: &str, args: &'v [Value]) -> Result<&'v Value> {
    match args {
        [arg] => Ok(arg),
        _ => Err(arity_error(name, "1", args.len())),
    }
}

fn two<'v>(name: &str, args: &'v [Value]) -> Result<(&'v Value, &'v Value)> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(arity_error(name, "2", args.len())),
    }
}

fn arity_error(name: &str, expected: &str, got: usize) -> Error {
    Error::Plan(format!("{name}() expects {expected} argument(s), got {got}"))
}

fn int_arg(name: &str, value: &Value) -> Result<i64> {
    value.as_int().ok_or_else(|| Error::Type {
        expected: format!("INTEGER argument for {name}()"),
        got: value.type_name().into(),
    })
}

fn entity_error(value: &Value) -> Result<Value> {
    Err(Error::Type {
        expected: "NODE or EDGE".into(),
        got: value.type_name().into(),
    })
}

fn list_error(value: &Value) -> Result<Value> {
    Err(Error::Type {
        expected: "LIST".into(),
        got: value.type_name().into(),
    })
}

fn numeric_error(value: &Value) -> Result<Value> {
    Err(Error::Type {
        expected: "numeric".into(),
        got: value.type_name().into(),
    })
}

fn string_error(value: &Value) -> Result<Value> {
    Err(Error::Type {
        expected: "STRING".into(),
        got: value.type_name().into(),
    })
}

fn path_error(value: &Value) -> Result<Value> {
    Err(Error::Type {
        expected: "PATH".into(),
        got: value.type_name().into(),
    })
}

fn float_fn(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value> {
    let arg = one(name, args)?;
    match arg {
        Value::Null => Ok(Value::Null),
        value if value.is_numeric() => Ok(Value::Float(f(value.as_float().unwrap()))),
        other => numeric_error(other),
    }
}

fn string_fn(name: &str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value> {
    let arg = one(name, args)?;
    match arg {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(f(s))),
        other => string_error(other),
    }
}

fn parse_datetime(s: &str) -> Result<Value> {
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(s) {
        return Ok(Value::DateTime(dt));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(Value::LocalDateTime)
        .map_err(|_| Error::Value(format!("cannot parse datetime from `{s}`")))
}

fn build_point(map: &indexmap::IndexMap<String, Value>) -> Result<Value> {
    let get_float = |key: &str| -> Result<Option<f64>> {
        match map.get(key) {
            None => Ok(None),
            Some(value) => value.as_float().map(Some).ok_or_else(|| Error::Type {
                expected: format!("numeric `{key}` coordinate"),
                got: value.type_name().into(),
            }),
        }
    };

    let crs = match map.get("crs") {
        None => None,
        Some(Value::String(name)) => Some(
            Crs::from_name(name)
                .ok_or_else(|| Error::Value(format!("invalid CRS `{name}`")))?,
        ),
        Some(other) => {
            return Err(Error::Type {
                expected: "STRING crs".into(),
                got: other.type_name().into(),
            });
        }
    };

    if let (Some(lat), Some(lon)) = (get_float("latitude")?, get_float("longitude")?) {
        let height = get_float("height")?;
        let point = Point::geographic(lon, lat, height)
            .ok_or_else(|| Error::Value("geographic coordinates out of range".into()))?;
        return Ok(Value::Point(point));
    }

    if let (Some(x), Some(y)) = (get_float("x")?, get_float("y")?) {
        let z = get_float("z")?;
        let point = match crs {
            Some(crs) if crs.is_geographic() => Point::geographic(x, y, z)
                .ok_or_else(|| Error::Value("geographic coordinates out of range".into()))?,
            _ => match z {
                Some(z) => Point::cartesian_3d(x, y, z),
                None => Point::cartesian(x, y),
            },
        };
        return Ok(Value::Point(point));
    }

    Err(Error::Value(
        "point() requires {x, y} or {latitude, longitude}".into(),
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, NodeRef};

    fn s(v: &str) -> Value {
        Value::String(v.into())
    }

    #[test]
    fn test_conversion_round_trips() {
        assert_eq!(call("toInteger", &[s("42")]).unwrap(), Value::Int(42));
        assert_eq!(call("toString", &[Value::Int(42)]).unwrap(), s("42"));
        assert_eq!(call("toFloat", &[s("1.5")]).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_conversions_null_on_failure() {
        assert_eq!(call("toInteger", &[s("nope")]).unwrap(), Value::Null);
        assert_eq!(call("toFloat", &[s("nope")]).unwrap(), Value::Null);
        assert_eq!(call("toBoolean", &[s("maybe")]).unwrap(), Value::Null);
        // Structural operands convert to NULL, not an error.
        assert_eq!(
            call("toString", &[Value::List(vec![Value::Int(1)])]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_id_and_labels() {
        let node = NodeRef::new(NodeId(7)).with_labels(["Person"]);
        let value = Value::Node(Box::new(node));
        assert_eq!(call("id", &[value.clone()]).unwrap(), Value::Int(7));
        assert_eq!(
            call("labels", &[value]).unwrap(),
            Value::List(vec![s("Person")])
        );
        assert_eq!(call("id", &[Value::Null]).unwrap(), Value::Null);
        assert!(call("id", &[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_list_functions() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(call("head", &[list.clone()]).unwrap(), Value::Int(1));
        assert_eq!(call("last", &[list.clone()]).unwrap(), Value::Int(3));
        assert_eq!(
            call("tail", &[list.clone()]).unwrap(),
            Value::List(vec![Value::Int(2), Value::Int(3)])
        );
        assert_eq!(call("size", &[list.clone()]).unwrap(), Value::Int(3));
        assert_eq!(
            call("reverse", &[list]).unwrap(),
            Value::List(vec![Value::Int(3), Value::Int(2), Value::Int(1)])
        );
        assert_eq!(
            call("head", &[Value::List(vec![])]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_range() {
        assert_eq!(
            call("range", &[Value::Int(1), Value::Int(3)]).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        // A step whose sign makes progress impossible yields an empty list.
        assert_eq!(
            call("range", &[Value::Int(3), Value::Int(1), Value::Int(1)]).unwrap(),
            Value::List(vec![])
        );
        // Step zero is an error.
        assert!(matches!(
            call("range", &[Value::Int(1), Value::Int(3), Value::Int(0)]),
            Err(Error::Value(_))
        ));
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call("upper", &[s("ada")]).unwrap(), s("ADA"));
        assert_eq!(call("lower", &[s("ADA")]).unwrap(), s("ada"));
        assert_eq!(call("trim", &[s("  x  ")]).unwrap(), s("x"));
        assert_eq!(
            call("split", &[s("a,b"), s(",")]).unwrap(),
            Value::List(vec![s("a"), s("b")])
        );
        assert_eq!(call("replace", &[s("aaa"), s("a"), s("b")]).unwrap(), s("bbb"));
        assert_eq!(call("left", &[s("hello"), Value::Int(2)]).unwrap(), s("he"));
        assert_eq!(call("right", &[s("hello"), Value::Int(2)]).unwrap(), s("lo"));
        assert_eq!(
            call("substring", &[s("hello"), Value::Int(1), Value::Int(3)]).unwrap(),
            s("ell")
        );
        assert_eq!(call("reverse", &[s("abc")]).unwrap(), s("cba"));
    }

    #[test]
    fn test_numeric_functions() {
        assert_eq!(call("abs", &[Value::Int(-4)]).unwrap(), Value::Int(4));
        assert_eq!(call("ceil", &[Value::Float(1.2)]).unwrap(), Value::Float(2.0));
        assert_eq!(call("floor", &[Value::Float(1.8)]).unwrap(), Value::Float(1.0));
        assert_eq!(call("sign", &[Value::Int(-9)]).unwrap(), Value::Int(-1));
        assert_eq!(call("sqrt", &[Value::Int(9)]).unwrap(), Value::Float(3.0));
        let Value::Float(r) = call("rand", &[]).unwrap() else {
            panic!()
        };
        assert!((0.0..1.0).contains(&r));
    }

    #[test]
    fn test_temporal_parse_and_accessors() {
        let d = call("date", &[s("2024-02-29")]).unwrap();
        assert_eq!(call("year", &[d.clone()]).unwrap(), Value::Int(2024));
        assert_eq!(call("month", &[d.clone()]).unwrap(), Value::Int(2));
        assert_eq!(call("day", &[d]).unwrap(), Value::Int(29));
        assert!(matches!(
            call("date", &[s("not a date")]),
            Err(Error::Value(_))
        ));

        let dur = call("duration", &[s("P1DT2H")]).unwrap();
        assert_eq!(call("hour", &[dur]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_point_and_distance() {
        let mut map = indexmap::IndexMap::new();
        map.insert("x".to_string(), Value::Float(0.0));
        map.insert("y".to_string(), Value::Float(0.0));
        let a = call("point", &[Value::Map(map)]).unwrap();

        let mut map = indexmap::IndexMap::new();
        map.insert("x".to_string(), Value::Float(3.0));
        map.insert("y".to_string(), Value::Float(4.0));
        let b = call("point", &[Value::Map(map)]).unwrap();

        assert_eq!(call("distance", &[a, b]).unwrap(), Value::Distance(5.0));
    }

    #[test]
    fn test_point_rejects_bad_coordinates() {
        let mut map = indexmap::IndexMap::new();
        map.insert("latitude".to_string(), Value::Float(95.0));
        map.insert("longitude".to_string(), Value::Float(0.0));
        assert!(matches!(
            call("point", &[Value::Map(map)]),
            Err(Error::Value(_))
        ));

        let mut map = indexmap::IndexMap::new();
        map.insert("x".to_string(), Value::Float(0.0));
        map.insert("y".to_string(), Value::Float(0.0));
        map.insert("crs".to_string(), s("klingon"));
        assert!(matches!(
            call("point", &[Value::Map(map)]),
            Err(Error::Value(_))
        ));
    }

    #[test]
    fn test_unknown_function() {
        assert!(matches!(call("frobnicate", &[]), Err(Error::Plan(_))));
    }
}
