//! Expression evaluator.
//!
//! `evaluate(expr, binding)` is pure apart from the clock-reading temporal
//! constructors and `rand()`. Three-valued logic governs the propositional
//! operators; NULL propagates through arithmetic, comparison and string
//! matching; division and modulo by zero yield NULL, never an error.

use crate::cypher::ast::{BinaryOp, Expr, Literal, Quantifier, StringMatchOp, SubqueryKind, UnaryOp};
use crate::model::{Truth, Value};
use crate::planner::is_aggregate_function;
use crate::storage::StoreTxn;
use crate::{Error, Result};

use super::functions;
use super::operators::run_subquery;
use super::{Binding, ExecContext};

/// Evaluate an expression against a row binding.
pub fn evaluate<T: StoreTxn>(
    expr: &Expr,
    row: &Binding,
    cx: &mut ExecContext<'_, T>,
) -> Result<Value> {
    eval_inner(expr, row, None, cx)
}

/// Evaluate a projection item of an aggregation: aggregate sub-expressions
/// are substituted by their accumulated values, everything else evaluates
/// against the group's representative row.
pub fn evaluate_with_aggregates<T: StoreTxn>(
    expr: &Expr,
    row: &Binding,
    aggregates: &[(Expr, Value)],
    cx: &mut ExecContext<'_, T>,
) -> Result<Value> {
    eval_inner(expr, row, Some(aggregates), cx)
}

/// Predicate check with filter truthiness: only `true` passes, `false`
/// and NULL are filtered out, and a non-boolean predicate value is a type
/// error. A missing predicate always passes.
pub fn passes<T: StoreTxn>(
    predicate: Option<&Expr>,
    row: &Binding,
    cx: &mut ExecContext<'_, T>,
) -> Result<bool> {
    match predicate {
        None => Ok(true),
        Some(expr) => Ok(evaluate(expr, row, cx)?.truth()?.passes()),
    }
}

fn eval_inner<T: StoreTxn>(
    expr: &Expr,
    row: &Binding,
    aggregates: Option<&[(Expr, Value)]>,
    cx: &mut ExecContext<'_, T>,
) -> Result<Value> {
    if let Some(aggs) = aggregates {
        if let Some((_, value)) = aggs.iter().find(|(agg, _)| agg == expr) {
            return Ok(value.clone());
        }
    }

    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(s.clone()),
        }),

        Expr::Variable(name) => row
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Plan(format!("variable `{name}` is not defined"))),

        Expr::Parameter(name) => cx
            .params
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Plan(format!("missing parameter `${name}`"))),

        Expr::Property { expr, key } => {
            let value = eval_inner(expr, row, aggregates, cx)?;
            property_of(&value, key)
        }

        Expr::Binary { left, op, right } => match op {
            BinaryOp::And => {
                let l = eval_inner(left, row, aggregates, cx)?.truth()?;
                if l == Truth::False {
                    return Ok(Value::Bool(false));
                }
                let r = eval_inner(right, row, aggregates, cx)?.truth()?;
                Ok(l.and(r).into())
            }
            BinaryOp::Or => {
                let l = eval_inner(left, row, aggregates, cx)?.truth()?;
                if l == Truth::True {
                    return Ok(Value::Bool(true));
                }
                let r = eval_inner(right, row, aggregates, cx)?.truth()?;
                Ok(l.or(r).into())
            }
            _ => {
                let l = eval_inner(left, row, aggregates, cx)?;
                let r = eval_inner(right, row, aggregates, cx)?;
                eval_binary(&l, *op, &r)
            }
        },

        Expr::Unary { op, expr } => {
            let value = eval_inner(expr, row, aggregates, cx)?;
            match op {
                UnaryOp::Not => Ok(value.truth()?.not().into()),
                UnaryOp::Negate => match value {
                    Value::Null => Ok(Value::Null),
                    Value::Int(i) => Ok(Value::Int(-i)),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    Value::Duration(d) => Ok(Value::Duration(d.negated())),
                    other => Err(Error::Type {
                        expected: "numeric".into(),
                        got: other.type_name().into(),
                    }),
                },
            }
        }

        Expr::IsNull { expr, negated } => {
            let value = eval_inner(expr, row, aggregates, cx)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }

        Expr::In { expr, list } => {
            let item = eval_inner(expr, row, aggregates, cx)?;
            let list = eval_inner(list, row, aggregates, cx)?;
            match list {
                Value::Null => Ok(Value::Null),
                Value::List(items) => {
                    if items.is_empty() {
                        return Ok(Value::Bool(false));
                    }
                    if item.is_null() {
                        return Ok(Value::Null);
                    }
                    let mut saw_unknown = false;
                    for candidate in &items {
                        match item.equals(candidate) {
                            Truth::True => return Ok(Value::Bool(true)),
                            Truth::Unknown => saw_unknown = true,
                            Truth::False => {}
                        }
                    }
                    // A NULL element with no match leaves the answer open.
                    if saw_unknown {
                        Ok(Value::Null)
                    } else {
                        Ok(Value::Bool(false))
                    }
                }
                other => Err(Error::Type {
                    expected: "LIST".into(),
                    got: other.type_name().into(),
                }),
            }
        }

        Expr::StringMatch { left, op, right } => {
            let l = eval_inner(left, row, aggregates, cx)?;
            let r = eval_inner(right, row, aggregates, cx)?;
            match (&l, &r) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::String(a), Value::String(b)) => {
                    let matched = match op {
                        StringMatchOp::StartsWith => a.starts_with(b.as_str()),
                        StringMatchOp::EndsWith => a.ends_with(b.as_str()),
                        StringMatchOp::Contains => a.contains(b.as_str()),
                    };
                    Ok(Value::Bool(matched))
                }
                _ => Err(Error::Type {
                    expected: "STRING".into(),
                    got: format!("{}, {}", l.type_name(), r.type_name()),
                }),
            }
        }

        Expr::HasLabel { expr, labels } => {
            let value = eval_inner(expr, row, aggregates, cx)?;
            match value {
                Value::Null => Ok(Value::Null),
                Value::Node(node) => {
                    let matches = labels
                        .iter()
                        .any(|conjunct| conjunct.iter().all(|l| node.has_label(l)));
                    Ok(Value::Bool(matches))
                }
                other => Err(Error::Type {
                    expected: "NODE".into(),
                    got: other.type_name().into(),
                }),
            }
        }

        Expr::FunctionCall { name, args, .. } => {
            if is_aggregate_function(name) {
                return Err(Error::Plan(format!(
                    "aggregate function {name}() is only allowed in RETURN and WITH"
                )));
            }
            // coalesce is lazy: arguments evaluate until one is non-NULL.
            if name.eq_ignore_ascii_case("coalesce") {
                for arg in args {
                    let value = eval_inner(arg, row, aggregates, cx)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                return Ok(Value::Null);
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_inner(arg, row, aggregates, cx)?);
            }
            functions::call(name, &values)
        }

        Expr::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_inner(item, row, aggregates, cx)?);
            }
            Ok(Value::List(values))
        }

        Expr::Map(entries) => {
            let mut map = indexmap::IndexMap::new();
            for (key, value) in entries {
                map.insert(key.clone(), eval_inner(value, row, aggregates, cx)?);
            }
            Ok(Value::Map(map))
        }

        Expr::Index { expr, index } => {
            let base = eval_inner(expr, row, aggregates, cx)?;
            let index = eval_inner(index, row, aggregates, cx)?;
            match (base, index) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::List(items), Value::Int(i)) => {
                    Ok(list_index(&items, i).cloned().unwrap_or(Value::Null))
                }
                (Value::Map(map), Value::String(key)) => {
                    Ok(map.get(&key).cloned().unwrap_or(Value::Null))
                }
                (Value::Node(node), Value::String(key)) => {
                    Ok(node.get(&key).cloned().unwrap_or(Value::Null))
                }
                (Value::Edge(edge), Value::String(key)) => {
                    Ok(edge.get(&key).cloned().unwrap_or(Value::Null))
                }
                (base, index) => Err(Error::Type {
                    expected: "LIST with an integer index, or MAP with a string key".into(),
                    got: format!("{}[{}]", base.type_name(), index.type_name()),
                }),
            }
        }

        Expr::Slice { expr, start, end } => {
            let base = eval_inner(expr, row, aggregates, cx)?;
            let Value::List(items) = base else {
                return match base {
                    Value::Null => Ok(Value::Null),
                    other => Err(Error::Type {
                        expected: "LIST".into(),
                        got: other.type_name().into(),
                    }),
                };
            };
            let len = items.len() as i64;
            let resolve = |value: Option<Value>, default: i64| -> Result<i64> {
                match value {
                    None => Ok(default),
                    Some(Value::Int(i)) => Ok(if i < 0 { (len + i).max(0) } else { i.min(len) }),
                    Some(Value::Null) => Ok(default),
                    Some(other) => Err(Error::Type {
                        expected: "INTEGER".into(),
                        got: other.type_name().into(),
                    }),
                }
            };
            let start = match start {
                Some(e) => resolve(Some(eval_inner(e, row, aggregates, cx)?), 0)?,
                None => 0,
            };
            let end = match end {
                Some(e) => resolve(Some(eval_inner(e, row, aggregates, cx)?), len)?,
                None => len,
            };
            if start >= end {
                return Ok(Value::List(Vec::new()));
            }
            Ok(Value::List(items[start as usize..end as usize].to_vec()))
        }

        Expr::ListComprehension {
            variable,
            list,
            predicate,
            projection,
        } => {
            let list = eval_inner(list, row, aggregates, cx)?;
            match list {
                Value::Null => Ok(Value::Null),
                Value::List(items) => {
                    let mut out = Vec::new();
                    for item in items {
                        let inner = row.extended(variable, item.clone());
                        if let Some(pred) = predicate {
                            if !evaluate(pred, &inner, cx)?.truth()?.passes() {
                                continue;
                            }
                        }
                        match projection {
                            Some(proj) => out.push(evaluate(proj, &inner, cx)?),
                            None => out.push(item),
                        }
                    }
                    Ok(Value::List(out))
                }
                other => Err(Error::Type {
                    expected: "LIST".into(),
                    got: other.type_name().into(),
                }),
            }
        }

        Expr::Quantified {
            quantifier,
            variable,
            list,
            predicate,
        } => {
            let list = eval_inner(list, row, aggregates, cx)?;
            match list {
                Value::Null => Ok(Value::Null),
                Value::List(items) => {
                    let mut trues = 0usize;
                    let mut falses = 0usize;
                    let mut unknowns = 0usize;
                    for item in items {
                        let inner = row.extended(variable, item);
                        match evaluate(predicate, &inner, cx)?.truth()? {
                            Truth::True => trues += 1,
                            Truth::False => falses += 1,
                            Truth::Unknown => unknowns += 1,
                        }
                    }
                    Ok(quantifier_verdict(*quantifier, trues, falses, unknowns).into())
                }
                other => Err(Error::Type {
                    expected: "LIST".into(),
                    got: other.type_name().into(),
                }),
            }
        }

        Expr::Case {
            operand,
            whens,
            else_expr,
        } => {
            match operand {
                Some(operand) => {
                    let subject = eval_inner(operand, row, aggregates, cx)?;
                    for (when, then) in whens {
                        let candidate = eval_inner(when, row, aggregates, cx)?;
                        if subject.equals(&candidate) == Truth::True {
                            return eval_inner(then, row, aggregates, cx);
                        }
                    }
                }
                None => {
                    for (when, then) in whens {
                        if eval_inner(when, row, aggregates, cx)?.truth()?.passes() {
                            return eval_inner(then, row, aggregates, cx);
                        }
                    }
                }
            }
            match else_expr {
                Some(e) => eval_inner(e, row, aggregates, cx),
                None => Ok(Value::Null),
            }
        }

        Expr::Subquery { id, kind } => {
            let sub = cx
                .subqueries
                .get(*id)
                .ok_or_else(|| Error::Plan(format!("unknown subquery #{id}")))?
                .clone();
            match kind {
                SubqueryKind::Exists => {
                    let rows = run_subquery(&sub.ops, row, cx, Some(1))?;
                    Ok(Value::Bool(!rows.is_empty()))
                }
                SubqueryKind::Count => {
                    let rows = run_subquery(&sub.ops, row, cx, None)?;
                    Ok(Value::Int(rows.len() as i64))
                }
                SubqueryKind::Collect => {
                    let rows = run_subquery(&sub.ops, row, cx, None)?;
                    let values = rows
                        .into_iter()
                        .map(|r| r.get("#value").cloned().unwrap_or(Value::Null))
                        .collect();
                    Ok(Value::List(values))
                }
            }
        }

        Expr::ExistsSubquery(_)
        | Expr::CountSubquery(_)
        | Expr::PatternComprehension { .. }
        | Expr::PatternPredicate(_) => Err(Error::Plan(
            "subquery expression was not lowered during planning".into(),
        )),
    }
}

/// Negative indices count from the end; out-of-range yields None.
fn list_index(items: &[Value], index: i64) -> Option<&Value> {
    let len = items.len() as i64;
    let i = if index < 0 { len + index } else { index };
    if (0..len).contains(&i) {
        items.get(i as usize)
    } else {
        None
    }
}

/// Three-valued verdicts for the quantifiers. An unknown element keeps
/// the answer open unless a definite element already decided it.
fn quantifier_verdict(quantifier: Quantifier, trues: usize, falses: usize, unknowns: usize) -> Truth {
    match quantifier {
        Quantifier::All => {
            if falses > 0 {
                Truth::False
            } else if unknowns > 0 {
                Truth::Unknown
            } else {
                Truth::True
            }
        }
        Quantifier::Any => {
            if trues > 0 {
                Truth::True
            } else if unknowns > 0 {
                Truth::Unknown
            } else {
                Truth::False
            }
        }
        Quantifier::None => {
            if trues > 0 {
                Truth::False
            } else if unknowns > 0 {
                Truth::Unknown
            } else {
                Truth::True
            }
        }
        Quantifier::Single => {
            if trues > 1 {
                Truth::False
            } else if unknowns > 0 {
                Truth::Unknown
            } else if trues == 1 {
                Truth::True
            } else {
                Truth::False
            }
        }
    }
}

/// Property access dispatched on the value kind. Access on NULL yields
/// NULL, as does a missing property.
fn property_of(value: &Value, key: &str) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Node(node) => Ok(node.get(key).cloned().unwrap_or(Value::Null)),
        Value::Edge(edge) => Ok(edge.get(key).cloned().unwrap_or(Value::Null)),
        Value::Map(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        Value::Date(_)
        | Value::Time(_)
        | Value::DateTime(_)
        | Value::LocalDateTime(_)
        | Value::Duration(_) => Ok(value
            .temporal_component(key)
            .map_or(Value::Null, Value::Int)),
        Value::Point(point) => Ok(match key {
            "x" | "longitude" => Value::Float(point.x),
            "y" | "latitude" => Value::Float(point.y),
            "z" | "height" => point.z.map_or(Value::Null, Value::Float),
            "crs" => Value::String(point.crs.name().into()),
            "srid" => Value::Int(i64::from(point.crs.srid())),
            _ => Value::Null,
        }),
        other => Err(Error::Type {
            expected: "NODE, EDGE, or MAP".into(),
            got: other.type_name().into(),
        }),
    }
}

// ============================================================================
// Binary operators
// ============================================================================

fn eval_binary(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(left.equals(right).into()),
        BinaryOp::Neq => Ok(left.equals(right).not().into()),
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            let Some(ord) = left.compare(right) else {
                return Err(Error::Type {
                    expected: "comparable values".into(),
                    got: format!("{} vs {}", left.type_name(), right.type_name()),
                });
            };
            let result = match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Lte => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                BinaryOp::Gte => ord.is_ge(),
                _ => unreachable!("checked above"),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => eval_add(left, right),
        BinaryOp::Sub => eval_sub(left, right),
        BinaryOp::Mul => eval_numeric(left, right, |a, b| a.checked_mul(b), |a, b| a * b),
        BinaryOp::Div => eval_div(left, right),
        BinaryOp::Mod => eval_mod(left, right),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled with short-circuiting"),
    }
}

fn eval_add(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        // A string operand concatenates, converting the other side.
        (Value::String(a), b) => Ok(Value::String(format!("{a}{b}"))),
        (a, Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| Error::Value("integer addition overflow".into())),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            Ok(Value::Float(a.as_float().unwrap() + b.as_float().unwrap()))
        }
        (Value::List(a), Value::List(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::List(out))
        }
        (Value::List(a), b) => {
            let mut out = a.clone();
            out.push(b.clone());
            Ok(Value::List(out))
        }
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_add(b)
            .map(Value::Duration)
            .ok_or_else(|| Error::Value("duration addition overflow".into())),
        (Value::Date(d), Value::Duration(dur)) | (Value::Duration(dur), Value::Date(d)) => {
            add_duration_to_date(*d, dur, 1).map(Value::Date)
        }
        (Value::LocalDateTime(dt), Value::Duration(dur))
        | (Value::Duration(dur), Value::LocalDateTime(dt)) => {
            add_duration_to_datetime(*dt, dur, 1).map(Value::LocalDateTime)
        }
        _ => Err(Error::Type {
            expected: "operands compatible with +".into(),
            got: format!("{} + {}", left.type_name(), right.type_name()),
        }),
    }
}

fn eval_sub(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .ok_or_else(|| Error::Value("integer subtraction overflow".into())),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            Ok(Value::Float(a.as_float().unwrap() - b.as_float().unwrap()))
        }
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_add(&b.negated())
            .map(Value::Duration)
            .ok_or_else(|| Error::Value("duration subtraction overflow".into())),
        (Value::Date(d), Value::Duration(dur)) => add_duration_to_date(*d, dur, -1).map(Value::Date),
        (Value::LocalDateTime(dt), Value::Duration(dur)) => {
            add_duration_to_datetime(*dt, dur, -1).map(Value::LocalDateTime)
        }
        _ => Err(Error::Type {
            expected: "numeric operands".into(),
            got: format!("{} - {}", left.type_name(), right.type_name()),
        }),
    }
}

fn eval_numeric(
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| Error::Value("integer arithmetic overflow".into())),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            Ok(Value::Float(float_op(a.as_float().unwrap(), b.as_float().unwrap())))
        }
        _ => Err(Error::Type {
            expected: "numeric operands".into(),
            got: format!("{}, {}", left.type_name(), right.type_name()),
        }),
    }
}

/// Division always yields Float; division by zero yields NULL.
fn eval_div(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let divisor = b.as_float().unwrap();
            if divisor == 0.0 {
                Ok(Value::Null)
            } else {
                Ok(Value::Float(a.as_float().unwrap() / divisor))
            }
        }
        _ => Err(Error::Type {
            expected: "numeric operands".into(),
            got: format!("{} / {}", left.type_name(), right.type_name()),
        }),
    }
}

/// Modulo by zero yields NULL.
fn eval_mod(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(_), Value::Int(0)) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a % b)),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let divisor = b.as_float().unwrap();
            if divisor == 0.0 {
                Ok(Value::Null)
            } else {
                Ok(Value::Float(a.as_float().unwrap() % divisor))
            }
        }
        _ => Err(Error::Type {
            expected: "numeric operands".into(),
            got: format!("{} % {}", left.type_name(), right.type_name()),
        }),
    }
}

fn add_duration_to_date(
    date: chrono::NaiveDate,
    duration: &crate::model::Duration,
    sign: i64,
) -> Result<chrono::NaiveDate> {
    use chrono::Months;
    let months = duration.months * sign;
    let with_months = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs() as u32))
    };
    let days = duration.days * sign + (duration.seconds * sign) / 86_400;
    with_months
        .and_then(|d| d.checked_add_signed(chrono::Duration::days(days)))
        .ok_or_else(|| Error::Value("date arithmetic out of range".into()))
}

fn add_duration_to_datetime(
    datetime: chrono::NaiveDateTime,
    duration: &crate::model::Duration,
    sign: i64,
) -> Result<chrono::NaiveDateTime> {
    use chrono::Months;
    let months = duration.months * sign;
    let with_months = if months >= 0 {
        datetime.checked_add_months(Months::new(months as u32))
    } else {
        datetime.checked_sub_months(Months::new(months.unsigned_abs() as u32))
    };
    with_months
        .and_then(|dt| dt.checked_add_signed(chrono::Duration::days(duration.days * sign)))
        .and_then(|dt| dt.checked_add_signed(chrono::Duration::seconds(duration.seconds * sign)))
        .ok_or_else(|| Error::Value("datetime arithmetic out of range".into()))
}
