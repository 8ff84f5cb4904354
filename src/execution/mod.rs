//! Query execution engine.
//!
//! Pull-based, single-threaded within a query. The plan's operator
//! sequence is compiled into a chain of row streams, each owning its
//! input; the driver pulls rows off the final stream one at a time,
//! polling the cancellation flag between rows. All store access goes
//! through the transaction carried in the execution context.

pub mod aggregate;
pub mod eval;
pub mod functions;
pub mod operators;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::model::{EdgeRef, NodeRef, PathValue, PropertyMap, Value};
use crate::planner::ops::{Plan, SubPlan};
use crate::planner::pipeline_columns;
use crate::storage::StoreTxn;
use crate::{Error, Result};

// ============================================================================
// Bindings
// ============================================================================

/// An immutable mapping from variable name to value — the unit of data
/// flowing between operators. New bindings are produced by copy-on-write
/// extension.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    values: HashMap<String, Value>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Copy-on-write extension: a new binding with one more entry.
    pub fn extended(&self, name: &str, value: Value) -> Binding {
        let mut values = self.values.clone();
        values.insert(name.to_string(), value);
        Binding { values }
    }

    /// In-place insert, for operators building a fresh binding.
    pub fn insert(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

// ============================================================================
// Results
// ============================================================================

/// Execution statistics for a single query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecStats {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub edges_created: u64,
    pub edges_deleted: u64,
    pub properties_set: u64,
    pub labels_added: u64,
    pub labels_removed: u64,
}

/// Query execution result: columns in projection order plus the rows.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub stats: ExecStats,
}

/// A single result row. Preserves column order.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub values: Vec<(String, Value)>,
}

impl ResultRow {
    fn from_binding(columns: &[String], binding: &Binding) -> Self {
        let values = columns
            .iter()
            .map(|col| {
                (
                    col.clone(),
                    binding.get(col).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        Self { values }
    }

    /// Get a typed value from the row by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Value(format!("no column named `{column}`")))?;
        T::from_value(value)
    }

    /// Raw value reference by column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }
}

/// Conversions from `Value` to host types.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

macro_rules! type_error {
    ($expected:expr, $value:expr) => {
        Err(Error::Type {
            expected: $expected.into(),
            got: $value.type_name().into(),
        })
    };
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for NodeRef {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Node(n) => Ok(*n.clone()),
            other => type_error!("NODE", other),
        }
    }
}

impl FromValue for EdgeRef {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Edge(e) => Ok(*e.clone()),
            other => type_error!("EDGE", other),
        }
    }
}

impl FromValue for PathValue {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Path(p) => Ok(*p.clone()),
            other => type_error!("PATH", other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => type_error!("STRING", other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            other => type_error!("INTEGER", other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_float()
            .ok_or_else(|| Error::Type {
                expected: "FLOAT".into(),
                got: value.type_name().into(),
            })
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => type_error!("BOOLEAN", other),
        }
    }
}

impl FromValue for Vec<Value> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::List(l) => Ok(l.clone()),
            other => type_error!("LIST", other),
        }
    }
}

// ============================================================================
// Execution context
// ============================================================================

/// Mutable state shared by every operator of one query: the transaction,
/// parameters, the subquery catalog, the cancellation flag, and the write
/// counters.
pub struct ExecContext<'q, T: StoreTxn> {
    pub txn: &'q mut T,
    pub params: &'q PropertyMap,
    pub subqueries: &'q [SubPlan],
    pub cancel: &'q AtomicBool,
    pub stats: ExecStats,
}

impl<T: StoreTxn> ExecContext<'_, T> {
    /// Polled at every produced row.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A pull iterator over bindings. Operators own their children by move;
/// the root operator owns everything transitively.
pub trait RowStream<T: StoreTxn> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>>;
}

// ============================================================================
// Driver
// ============================================================================

/// Execute a plan against an open transaction, materializing the result.
/// Commit/rollback is the caller's responsibility.
pub fn execute_plan<T: StoreTxn>(
    txn: &mut T,
    plan: &Plan,
    params: &PropertyMap,
    cancel: &AtomicBool,
) -> Result<QueryResult> {
    let columns = pipeline_columns(&plan.ops);
    let mut cx = ExecContext {
        txn,
        params,
        subqueries: &plan.subqueries,
        cancel,
        stats: ExecStats::default(),
    };

    let mut stream = operators::build_pipeline(plan.ops.clone(), Binding::new());
    let mut rows = Vec::new();
    while let Some(binding) = stream.next(&mut cx)? {
        cx.check_cancelled()?;
        if !columns.is_empty() {
            rows.push(ResultRow::from_binding(&columns, &binding));
        }
    }

    debug!(rows = rows.len(), "query executed");
    Ok(QueryResult {
        columns,
        rows,
        stats: cx.stats,
    })
}
