//! # Graph Store Interface
//!
//! The contract between the query engine and any storage engine. The
//! executor consumes exactly this surface: scan by label, expand by type,
//! mutate nodes/edges, and a serializable transaction boundary.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory reference store for embedding and tests |

pub mod memory;

use hashbrown::HashMap;

use crate::model::{Direction, EdgeId, EdgeRef, NodeId, NodeRef, PropertyMap, Value};
use crate::Result;

pub use memory::{MemoryStore, MemoryTxn};

// ============================================================================
// Statistics
// ============================================================================

/// Statistics snapshot consumed by the cost-based optimizer. May be stale,
/// but must be monotone within a transaction. Missing entries default to
/// `total_nodes` (labels) and `1.0` (degrees).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStatistics {
    pub total_nodes: u64,
    pub total_edges: u64,
    pub node_counts_by_label: HashMap<String, u64>,
    pub avg_degree_by_type: HashMap<String, f64>,
}

impl GraphStatistics {
    /// Node count for a label; unknown labels fall back to `total_nodes`.
    pub fn label_count(&self, label: &str) -> f64 {
        self.node_counts_by_label
            .get(label)
            .map_or(self.total_nodes as f64, |c| *c as f64)
    }

    /// Mean out-degree for an edge type; unknown types fall back to 1.0.
    pub fn avg_degree(&self, edge_type: &str) -> f64 {
        self.avg_degree_by_type.get(edge_type).copied().unwrap_or(1.0)
    }

    /// Mean degree across all edge types, used when a pattern lists none.
    pub fn untyped_degree(&self) -> f64 {
        if self.total_nodes == 0 {
            1.0
        } else {
            self.total_edges as f64 / self.total_nodes as f64
        }
    }
}

// ============================================================================
// Store traits
// ============================================================================

/// A graph store: hands out one serializable unit of work at a time.
pub trait GraphStore: Send + Sync + 'static {
    type Txn: StoreTxn;

    /// Begin a serializable unit of work.
    fn open_transaction(&self) -> Result<Self::Txn>;
}

/// A transaction over a graph store.
///
/// Read methods observe committed state plus this transaction's own writes
/// (read-your-writes). Node/edge handles carry property snapshots taken at
/// issuance and are valid for the duration of the transaction.
pub trait StoreTxn: 'static {
    // ========================================================================
    // Reads
    // ========================================================================

    /// Nodes carrying `label`, or every node when `label` is None.
    fn scan_nodes_by_label(&self, label: Option<&str>) -> Result<Vec<NodeRef>>;

    /// Edges of `edge_type`, or every edge when `edge_type` is None.
    fn scan_edges_by_type(&self, edge_type: Option<&str>) -> Result<Vec<EdgeRef>>;

    /// Edges incident to `node` in `direction`, filtered to `types` when
    /// non-empty. The hot path of traversal.
    fn incident_edges(
        &self,
        node: NodeId,
        direction: Direction,
        types: &[String],
    ) -> Result<Vec<EdgeRef>>;

    /// Fresh handle for a node id; None if the node no longer exists.
    fn node(&self, id: NodeId) -> Result<Option<NodeRef>>;

    /// Fresh handle for an edge id; None if the edge no longer exists.
    fn edge(&self, id: EdgeId) -> Result<Option<EdgeRef>>;

    /// Cheap statistics snapshot for the optimizer.
    fn statistics(&self) -> Result<GraphStatistics>;

    // ========================================================================
    // Mutations
    // ========================================================================

    fn create_node(&mut self, labels: &[String], properties: PropertyMap) -> Result<NodeRef>;

    fn create_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        edge_type: &str,
        properties: PropertyMap,
    ) -> Result<EdgeRef>;

    fn set_node_property(&mut self, id: NodeId, key: &str, value: Value) -> Result<()>;

    fn set_edge_property(&mut self, id: EdgeId, key: &str, value: Value) -> Result<()>;

    /// Removing a property that is absent is a no-op.
    fn remove_node_property(&mut self, id: NodeId, key: &str) -> Result<()>;

    fn remove_edge_property(&mut self, id: EdgeId, key: &str) -> Result<()>;

    fn add_label(&mut self, id: NodeId, label: &str) -> Result<()>;

    /// Removing a label the node does not carry is a no-op.
    fn remove_label(&mut self, id: NodeId, label: &str) -> Result<()>;

    /// Fails with a constraint error when the node still has incident
    /// edges; deleting an already-deleted node is a no-op.
    fn delete_node(&mut self, id: NodeId) -> Result<()>;

    /// Deletes incident edges first, then the node.
    fn detach_delete_node(&mut self, id: NodeId) -> Result<()>;

    fn delete_edge(&mut self, id: EdgeId) -> Result<()>;

    // ========================================================================
    // Boundary
    // ========================================================================

    fn commit(self) -> Result<()>;

    fn rollback(self) -> Result<()>;
}
