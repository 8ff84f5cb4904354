//! Aggregate function computation.
//!
//! Each aggregate evaluates its argument over the rows of one group,
//! skipping NULLs (except `count(*)`, which counts rows regardless).
//! `DISTINCT` deduplicates the collected argument values before
//! accumulation.

use crate::cypher::ast::Expr;
use crate::model::Value;
use crate::storage::StoreTxn;
use crate::{Error, Result};

use super::eval;
use super::{Binding, ExecContext};

/// Compute one aggregate call over a group's rows.
pub fn compute<T: StoreTxn>(
    call: &Expr,
    rows: &[Binding],
    cx: &mut ExecContext<'_, T>,
) -> Result<Value> {
    let Expr::FunctionCall { name, args, distinct } = call else {
        return Err(Error::Plan("aggregate expression is not a function call".into()));
    };
    let lower = name.to_lowercase();

    // count(*) counts rows, NULLs included.
    if lower == "count" && args.is_empty() {
        return Ok(Value::Int(rows.len() as i64));
    }

    let arg = args
        .first()
        .ok_or_else(|| Error::Plan(format!("{name}() requires an argument")))?;

    // Collect the non-NULL argument values of the group.
    let mut values = Vec::new();
    for row in rows {
        let value = eval::evaluate(arg, row, cx)?;
        if !value.is_null() {
            values.push(value);
        }
    }
    if *distinct {
        let mut deduped: Vec<Value> = Vec::new();
        for value in values {
            if !deduped.iter().any(|v| v.same_value(&value)) {
                deduped.push(value);
            }
        }
        values = deduped;
    }

    match lower.as_str() {
        "count" => Ok(Value::Int(values.len() as i64)),

        "sum" => {
            let mut int_sum: i64 = 0;
            let mut float_sum: f64 = 0.0;
            let mut saw_float = false;
            for value in &values {
                match value {
                    Value::Int(i) => int_sum += i,
                    Value::Float(f) | Value::Distance(f) => {
                        saw_float = true;
                        float_sum += f;
                    }
                    other => return non_numeric(name, other),
                }
            }
            if saw_float {
                Ok(Value::Float(int_sum as f64 + float_sum))
            } else {
                Ok(Value::Int(int_sum))
            }
        }

        "avg" => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let mut sum = 0.0;
            for value in &values {
                sum += value.as_float().ok_or_else(|| Error::Type {
                    expected: "numeric values for avg()".into(),
                    got: value.type_name().into(),
                })?;
            }
            Ok(Value::Float(sum / values.len() as f64))
        }

        "min" => fold_extreme(name, values, std::cmp::Ordering::Less),
        "max" => fold_extreme(name, values, std::cmp::Ordering::Greater),

        "collect" => Ok(Value::List(values)),

        "stdev" => standard_deviation(name, &values, false),
        "stdevp" => standard_deviation(name, &values, true),

        "percentiledisc" | "percentilecont" => {
            let p_expr = args
                .get(1)
                .ok_or_else(|| Error::Plan(format!("{name}() requires a percentile argument")))?;
            let p_row = rows.first().cloned().unwrap_or_default();
            let p = match eval::evaluate(p_expr, &p_row, cx)? {
                Value::Null => return Ok(Value::Null),
                value => value.as_float().ok_or_else(|| Error::Type {
                    expected: "numeric percentile".into(),
                    got: value.type_name().into(),
                })?,
            };
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Value(format!(
                    "percentile must be between 0.0 and 1.0, got {p}"
                )));
            }
            percentile(name, values, p, lower == "percentilecont")
        }

        _ => Err(Error::Plan(format!("unknown aggregate `{name}`"))),
    }
}

fn non_numeric(name: &str, value: &Value) -> Result<Value> {
    Err(Error::Type {
        expected: format!("numeric values for {name}()"),
        got: value.type_name().into(),
    })
}

fn fold_extreme(name: &str, values: Vec<Value>, keep: std::cmp::Ordering) -> Result<Value> {
    let mut iter = values.into_iter();
    let Some(mut best) = iter.next() else {
        return Ok(Value::Null);
    };
    for value in iter {
        let Some(ord) = value.compare(&best) else {
            return Err(Error::Type {
                expected: format!("comparable values for {name}()"),
                got: format!("{} vs {}", value.type_name(), best.type_name()),
            });
        };
        if ord == keep {
            best = value;
        }
    }
    Ok(best)
}

/// Sample standard deviation returns NULL for a single value; population
/// standard deviation returns 0 for it.
fn standard_deviation(name: &str, values: &[Value], population: bool) -> Result<Value> {
    let mut floats = Vec::with_capacity(values.len());
    for value in values {
        floats.push(value.as_float().ok_or_else(|| Error::Type {
            expected: format!("numeric values for {name}()"),
            got: value.type_name().into(),
        })?);
    }
    match floats.len() {
        0 => Ok(Value::Null),
        1 => {
            if population {
                Ok(Value::Float(0.0))
            } else {
                Ok(Value::Null)
            }
        }
        n => {
            let mean = floats.iter().sum::<f64>() / n as f64;
            let sum_sq: f64 = floats.iter().map(|x| (x - mean) * (x - mean)).sum();
            let divisor = if population { n } else { n - 1 } as f64;
            Ok(Value::Float((sum_sq / divisor).sqrt()))
        }
    }
}

fn percentile(name: &str, mut values: Vec<Value>, p: f64, continuous: bool) -> Result<Value> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    // Sort numerically; mixed non-numeric input is an error.
    for value in &values {
        if value.as_float().is_none() {
            return non_numeric(name, value);
        }
    }
    values.sort_by(|a, b| {
        a.as_float()
            .unwrap()
            .partial_cmp(&b.as_float().unwrap())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let n = values.len();
    if continuous {
        let position = p * (n - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        if lower == upper {
            return Ok(Value::Float(values[lower].as_float().unwrap()));
        }
        let fraction = position - lower as f64;
        let low = values[lower].as_float().unwrap();
        let high = values[upper].as_float().unwrap();
        Ok(Value::Float(low + (high - low) * fraction))
    } else {
        // Discrete percentile: the smallest value whose cumulative rank
        // reaches p.
        let rank = ((p * n as f64).ceil() as usize).max(1);
        Ok(values[rank - 1].clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
