//! # GraphForge — Embeddable Property Graph Database
//!
//! An in-memory (optionally store-backed) property graph engine speaking a
//! substantial openCypher subset.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore` is the contract between the query
//!    engine and storage
//! 2. **Clean DTOs**: `NodeRef`, `EdgeRef`, `Value` cross all boundaries
//! 3. **Parser owns nothing**: Cypher → AST is a pure function
//! 4. **Store-agnostic planner**: logical plans don't know about storage
//!
//! ## Quick Start
//!
//! ```rust
//! use graphforge::{Graph, NodeRef};
//!
//! # fn example() -> graphforge::Result<()> {
//! let graph = Graph::open_memory();
//!
//! graph.execute("CREATE (n:Person {name: 'Ada'})")?;
//! let result = graph.execute("MATCH (n:Person) RETURN n")?;
//!
//! for row in &result.rows {
//!     println!("{:?}", row.get::<NodeRef>("n")?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! `source → AST (parser) → ops (planner) → ops' (optimizer) → rows
//! (executor over store)`. Every query runs in one serializable store
//! transaction, committed on success and rolled back on any error.

use std::sync::atomic::AtomicBool;

use tracing::debug;

pub mod cypher;
pub mod execution;
pub mod model;
pub mod optimizer;
pub mod planner;
pub mod storage;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Crs, Direction, Duration, EdgeId, EdgeRef, NodeId, NodeRef, PathValue, Point, PropertyMap,
    Truth, Value,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{GraphStatistics, GraphStore, MemoryStore, StoreTxn};

// ============================================================================
// Re-exports: Execution & optimizer configuration
// ============================================================================

pub use execution::{ExecStats, FromValue, QueryResult, ResultRow};
pub use optimizer::OptimizerConfig;

// ============================================================================
// Error Types
// ============================================================================

/// The closed set of engine errors. Runtime NULL-producing situations
/// (comparison with NULL, division by zero, missing properties, …) are
/// not errors; everything here aborts the query and rolls back its
/// transaction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error at line {line}, column {column}: {message}")]
    Parse {
        line: u32,
        column: u32,
        message: String,
    },

    #[error("plan error: {0}")]
    Plan(String),

    #[error("type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("value error: {0}")]
    Value(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("query cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Top-level Graph handle
// ============================================================================

/// The primary entry point. A `Graph` wraps a store and provides Cypher
/// execution: parse → plan → optimize → execute, one transaction per
/// query.
pub struct Graph<S: GraphStore> {
    store: S,
    optimizer_config: OptimizerConfig,
}

impl Graph<MemoryStore> {
    /// An in-memory graph for embedding and tests.
    pub fn open_memory() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl<S: GraphStore> Graph<S> {
    /// Create a graph over the given store.
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            optimizer_config: OptimizerConfig::default(),
        }
    }

    /// Override the optimizer rewrites (all are enabled by default).
    pub fn with_optimizer_config(mut self, config: OptimizerConfig) -> Self {
        self.optimizer_config = config;
        self
    }

    /// Execute a Cypher query.
    pub fn execute(&self, source: &str) -> Result<QueryResult> {
        self.execute_with(source, PropertyMap::new())
    }

    /// Execute a Cypher query with parameters.
    pub fn execute_with(&self, source: &str, params: PropertyMap) -> Result<QueryResult> {
        let cancel = AtomicBool::new(false);
        self.execute_cancellable(source, params, &cancel)
    }

    /// Execute a Cypher query with parameters and a cancellation flag.
    /// Setting the flag between rows aborts the query with
    /// [`Error::Cancelled`] and rolls back its transaction.
    pub fn execute_cancellable(
        &self,
        source: &str,
        params: PropertyMap,
        cancel: &AtomicBool,
    ) -> Result<QueryResult> {
        // Parse and plan before any transaction is opened; a syntactically
        // or semantically invalid query never touches the store.
        let ast = cypher::parse(source)?;
        let plan = planner::plan(&ast)?;
        debug!(source, "query parsed and planned");

        let mut txn = self.store.open_transaction()?;
        let stats = txn.statistics()?;
        let plan = optimizer::Optimizer::new(stats)
            .with_config(self.optimizer_config.clone())
            .optimize(plan);

        match execution::execute_plan(&mut txn, &plan, &params, cancel) {
            Ok(result) => {
                txn.commit()?;
                Ok(result)
            }
            Err(error) => {
                // The error wins over any rollback failure.
                let _ = txn.rollback();
                Err(error)
            }
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
