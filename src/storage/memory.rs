//! In-memory graph store.
//!
//! The reference implementation of `GraphStore`: id-keyed tables plus an
//! adjacency list and a label index, guarded by a single `RwLock` so
//! multiple queries can run against one store from different threads.
//!
//! Transactions apply writes in place and keep an undo log; `rollback`
//! (or dropping the transaction without committing) replays the log in
//! reverse, so a failed query never leaves partial state behind. Writers
//! serialize on the inner lock per operation.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::model::{Direction, EdgeId, EdgeRef, NodeId, NodeRef, PropertyMap, Value};
use crate::{Error, Result};

use super::{GraphStatistics, GraphStore, StoreTxn};

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory property graph storage.
#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<GraphInner>>,
}

#[derive(Default)]
struct GraphInner {
    nodes: HashMap<NodeId, NodeRecord>,
    edges: HashMap<EdgeId, EdgeRecord>,
    /// node id → incident edge ids (both directions).
    adjacency: HashMap<NodeId, Vec<EdgeId>>,
    /// label → node ids carrying it.
    label_index: HashMap<String, Vec<NodeId>>,
    next_node_id: u64,
    next_edge_id: u64,
}

#[derive(Debug, Clone)]
struct NodeRecord {
    labels: SmallVec<[String; 2]>,
    properties: PropertyMap,
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    src: NodeId,
    dst: NodeId,
    edge_type: String,
    properties: PropertyMap,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryStore {
    type Txn = MemoryTxn;

    fn open_transaction(&self) -> Result<MemoryTxn> {
        Ok(MemoryTxn {
            inner: Arc::clone(&self.inner),
            undo: Vec::new(),
            finished: false,
        })
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// Undo-log transaction over the shared graph. Dropping an unfinished
/// transaction rolls it back.
pub struct MemoryTxn {
    inner: Arc<RwLock<GraphInner>>,
    undo: Vec<Undo>,
    finished: bool,
}

enum Undo {
    CreatedNode(NodeId),
    CreatedEdge(EdgeId),
    SetNodeProperty {
        id: NodeId,
        key: String,
        previous: Option<Value>,
    },
    SetEdgeProperty {
        id: EdgeId,
        key: String,
        previous: Option<Value>,
    },
    AddedLabel {
        id: NodeId,
        label: String,
    },
    RemovedLabel {
        id: NodeId,
        label: String,
    },
    DeletedNode {
        id: NodeId,
        record: NodeRecord,
    },
    DeletedEdge {
        id: EdgeId,
        record: EdgeRecord,
    },
}

fn node_ref(id: NodeId, record: &NodeRecord) -> NodeRef {
    NodeRef {
        id,
        labels: record.labels.clone(),
        properties: record.properties.clone(),
    }
}

fn edge_ref(id: EdgeId, record: &EdgeRecord) -> EdgeRef {
    EdgeRef {
        id,
        src: record.src,
        dst: record.dst,
        edge_type: record.edge_type.clone(),
        properties: record.properties.clone(),
    }
}

impl MemoryTxn {
    fn rollback_in_place(&mut self) {
        let mut graph = self.inner.write();
        for undo in self.undo.drain(..).rev() {
            match undo {
                Undo::CreatedNode(id) => {
                    if let Some(record) = graph.nodes.remove(&id) {
                        for label in &record.labels {
                            if let Some(ids) = graph.label_index.get_mut(label) {
                                ids.retain(|n| *n != id);
                            }
                        }
                    }
                    graph.adjacency.remove(&id);
                }
                Undo::CreatedEdge(id) => {
                    if let Some(record) = graph.edges.remove(&id) {
                        unlink_adjacency(&mut graph, &record, id);
                    }
                }
                Undo::SetNodeProperty { id, key, previous } => {
                    if let Some(node) = graph.nodes.get_mut(&id) {
                        match previous {
                            Some(value) => {
                                node.properties.insert(key, value);
                            }
                            None => {
                                node.properties.shift_remove(&key);
                            }
                        }
                    }
                }
                Undo::SetEdgeProperty { id, key, previous } => {
                    if let Some(edge) = graph.edges.get_mut(&id) {
                        match previous {
                            Some(value) => {
                                edge.properties.insert(key, value);
                            }
                            None => {
                                edge.properties.shift_remove(&key);
                            }
                        }
                    }
                }
                Undo::AddedLabel { id, label } => {
                    if let Some(node) = graph.nodes.get_mut(&id) {
                        node.labels.retain(|l| *l != label);
                    }
                    if let Some(ids) = graph.label_index.get_mut(&label) {
                        ids.retain(|n| *n != id);
                    }
                }
                Undo::RemovedLabel { id, label } => {
                    if let Some(node) = graph.nodes.get_mut(&id) {
                        node.labels.push(label.clone());
                    }
                    graph.label_index.entry(label).or_default().push(id);
                }
                Undo::DeletedNode { id, record } => {
                    for label in &record.labels {
                        graph.label_index.entry(label.clone()).or_default().push(id);
                    }
                    graph.nodes.insert(id, record);
                    graph.adjacency.entry(id).or_default();
                }
                Undo::DeletedEdge { id, record } => {
                    graph.adjacency.entry(record.src).or_default().push(id);
                    if record.src != record.dst {
                        graph.adjacency.entry(record.dst).or_default().push(id);
                    }
                    graph.edges.insert(id, record);
                }
            }
        }
    }
}

fn unlink_adjacency(graph: &mut GraphInner, record: &EdgeRecord, id: EdgeId) {
    if let Some(ids) = graph.adjacency.get_mut(&record.src) {
        ids.retain(|e| *e != id);
    }
    if record.src != record.dst {
        if let Some(ids) = graph.adjacency.get_mut(&record.dst) {
            ids.retain(|e| *e != id);
        }
    }
}

impl Drop for MemoryTxn {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback_in_place();
        }
    }
}

impl StoreTxn for MemoryTxn {
    // ========================================================================
    // Reads
    // ========================================================================

    fn scan_nodes_by_label(&self, label: Option<&str>) -> Result<Vec<NodeRef>> {
        let graph = self.inner.read();
        let refs = match label {
            Some(label) => {
                let ids = graph.label_index.get(label).cloned().unwrap_or_default();
                ids.iter()
                    .filter_map(|id| graph.nodes.get(id).map(|r| node_ref(*id, r)))
                    .collect()
            }
            None => {
                let mut refs: Vec<NodeRef> = graph
                    .nodes
                    .iter()
                    .map(|(id, r)| node_ref(*id, r))
                    .collect();
                refs.sort_by_key(|n| n.id);
                refs
            }
        };
        Ok(refs)
    }

    fn scan_edges_by_type(&self, edge_type: Option<&str>) -> Result<Vec<EdgeRef>> {
        let graph = self.inner.read();
        let mut refs: Vec<EdgeRef> = graph
            .edges
            .iter()
            .filter(|(_, r)| edge_type.is_none_or(|t| r.edge_type == t))
            .map(|(id, r)| edge_ref(*id, r))
            .collect();
        refs.sort_by_key(|e| e.id);
        Ok(refs)
    }

    fn incident_edges(
        &self,
        node: NodeId,
        direction: Direction,
        types: &[String],
    ) -> Result<Vec<EdgeRef>> {
        let graph = self.inner.read();
        let edge_ids = graph.adjacency.get(&node).cloned().unwrap_or_default();
        let mut result = Vec::new();
        for id in edge_ids {
            let Some(record) = graph.edges.get(&id) else {
                continue;
            };
            let matches_direction = match direction {
                Direction::Outgoing => record.src == node,
                Direction::Incoming => record.dst == node,
                Direction::Undirected => true,
            };
            let matches_type = types.is_empty() || types.iter().any(|t| *t == record.edge_type);
            if matches_direction && matches_type {
                result.push(edge_ref(id, record));
            }
        }
        Ok(result)
    }

    fn node(&self, id: NodeId) -> Result<Option<NodeRef>> {
        let graph = self.inner.read();
        Ok(graph.nodes.get(&id).map(|r| node_ref(id, r)))
    }

    fn edge(&self, id: EdgeId) -> Result<Option<EdgeRef>> {
        let graph = self.inner.read();
        Ok(graph.edges.get(&id).map(|r| edge_ref(id, r)))
    }

    fn statistics(&self) -> Result<GraphStatistics> {
        let graph = self.inner.read();
        let total_nodes = graph.nodes.len() as u64;
        let total_edges = graph.edges.len() as u64;

        let node_counts_by_label = graph
            .label_index
            .iter()
            .map(|(label, ids)| (label.clone(), ids.len() as u64))
            .collect();

        let mut edges_by_type: HashMap<String, u64> = HashMap::new();
        for record in graph.edges.values() {
            *edges_by_type.entry(record.edge_type.clone()).or_default() += 1;
        }
        let avg_degree_by_type = edges_by_type
            .into_iter()
            .map(|(edge_type, count)| {
                let degree = if total_nodes == 0 {
                    0.0
                } else {
                    count as f64 / total_nodes as f64
                };
                (edge_type, degree)
            })
            .collect();

        Ok(GraphStatistics {
            total_nodes,
            total_edges,
            node_counts_by_label,
            avg_degree_by_type,
        })
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    fn create_node(&mut self, labels: &[String], properties: PropertyMap) -> Result<NodeRef> {
        let mut graph = self.inner.write();
        graph.next_node_id += 1;
        let id = NodeId(graph.next_node_id);

        let record = NodeRecord {
            labels: labels.iter().cloned().collect(),
            properties,
        };
        for label in &record.labels {
            graph.label_index.entry(label.clone()).or_default().push(id);
        }
        let handle = node_ref(id, &record);
        graph.nodes.insert(id, record);
        graph.adjacency.entry(id).or_default();
        drop(graph);

        self.undo.push(Undo::CreatedNode(id));
        Ok(handle)
    }

    fn create_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        edge_type: &str,
        properties: PropertyMap,
    ) -> Result<EdgeRef> {
        let mut graph = self.inner.write();
        if !graph.nodes.contains_key(&src) {
            return Err(Error::Store(format!("source node {src} does not exist")));
        }
        if !graph.nodes.contains_key(&dst) {
            return Err(Error::Store(format!("target node {dst} does not exist")));
        }

        graph.next_edge_id += 1;
        let id = EdgeId(graph.next_edge_id);
        let record = EdgeRecord {
            src,
            dst,
            edge_type: edge_type.to_string(),
            properties,
        };
        let handle = edge_ref(id, &record);
        graph.edges.insert(id, record);
        graph.adjacency.entry(src).or_default().push(id);
        if src != dst {
            graph.adjacency.entry(dst).or_default().push(id);
        }
        drop(graph);

        self.undo.push(Undo::CreatedEdge(id));
        Ok(handle)
    }

    fn set_node_property(&mut self, id: NodeId, key: &str, value: Value) -> Result<()> {
        let mut graph = self.inner.write();
        let node = graph
            .nodes
            .get_mut(&id)
            .ok_or_else(|| Error::Store(format!("node {id} does not exist")))?;
        let previous = node.properties.insert(key.to_string(), value);
        self.undo.push(Undo::SetNodeProperty {
            id,
            key: key.to_string(),
            previous,
        });
        Ok(())
    }

    fn set_edge_property(&mut self, id: EdgeId, key: &str, value: Value) -> Result<()> {
        let mut graph = self.inner.write();
        let edge = graph
            .edges
            .get_mut(&id)
            .ok_or_else(|| Error::Store(format!("edge {id} does not exist")))?;
        let previous = edge.properties.insert(key.to_string(), value);
        self.undo.push(Undo::SetEdgeProperty {
            id,
            key: key.to_string(),
            previous,
        });
        Ok(())
    }

    fn remove_node_property(&mut self, id: NodeId, key: &str) -> Result<()> {
        let mut graph = self.inner.write();
        let Some(node) = graph.nodes.get_mut(&id) else {
            return Ok(());
        };
        if let Some(previous) = node.properties.shift_remove(key) {
            self.undo.push(Undo::SetNodeProperty {
                id,
                key: key.to_string(),
                previous: Some(previous),
            });
        }
        Ok(())
    }

    fn remove_edge_property(&mut self, id: EdgeId, key: &str) -> Result<()> {
        let mut graph = self.inner.write();
        let Some(edge) = graph.edges.get_mut(&id) else {
            return Ok(());
        };
        if let Some(previous) = edge.properties.shift_remove(key) {
            self.undo.push(Undo::SetEdgeProperty {
                id,
                key: key.to_string(),
                previous: Some(previous),
            });
        }
        Ok(())
    }

    fn add_label(&mut self, id: NodeId, label: &str) -> Result<()> {
        let mut graph = self.inner.write();
        let node = graph
            .nodes
            .get_mut(&id)
            .ok_or_else(|| Error::Store(format!("node {id} does not exist")))?;
        if node.labels.iter().any(|l| l == label) {
            return Ok(());
        }
        node.labels.push(label.to_string());
        graph
            .label_index
            .entry(label.to_string())
            .or_default()
            .push(id);
        self.undo.push(Undo::AddedLabel {
            id,
            label: label.to_string(),
        });
        Ok(())
    }

    fn remove_label(&mut self, id: NodeId, label: &str) -> Result<()> {
        let mut graph = self.inner.write();
        let Some(node) = graph.nodes.get_mut(&id) else {
            return Ok(());
        };
        if !node.labels.iter().any(|l| l == label) {
            return Ok(());
        }
        node.labels.retain(|l| l != label);
        if let Some(ids) = graph.label_index.get_mut(label) {
            ids.retain(|n| *n != id);
        }
        self.undo.push(Undo::RemovedLabel {
            id,
            label: label.to_string(),
        });
        Ok(())
    }

    fn delete_node(&mut self, id: NodeId) -> Result<()> {
        let mut graph = self.inner.write();
        if !graph.nodes.contains_key(&id) {
            return Ok(());
        }
        if graph.adjacency.get(&id).is_some_and(|edges| !edges.is_empty()) {
            let count = graph.adjacency[&id].len();
            return Err(Error::Constraint(format!(
                "cannot delete node {id} with {count} incident edges; use DETACH DELETE"
            )));
        }
        let record = graph.nodes.remove(&id).expect("checked above");
        for label in &record.labels {
            if let Some(ids) = graph.label_index.get_mut(label) {
                ids.retain(|n| *n != id);
            }
        }
        graph.adjacency.remove(&id);
        self.undo.push(Undo::DeletedNode { id, record });
        Ok(())
    }

    fn detach_delete_node(&mut self, id: NodeId) -> Result<()> {
        let incident: Vec<EdgeId> = {
            let graph = self.inner.read();
            graph.adjacency.get(&id).cloned().unwrap_or_default()
        };
        for edge_id in incident {
            self.delete_edge(edge_id)?;
        }
        self.delete_node(id)
    }

    fn delete_edge(&mut self, id: EdgeId) -> Result<()> {
        let mut graph = self.inner.write();
        let Some(record) = graph.edges.remove(&id) else {
            return Ok(());
        };
        unlink_adjacency(&mut graph, &record, id);
        self.undo.push(Undo::DeletedEdge { id, record });
        Ok(())
    }

    // ========================================================================
    // Boundary
    // ========================================================================

    fn commit(mut self) -> Result<()> {
        self.undo.clear();
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self) -> Result<()> {
        self.rollback_in_place();
        self.finished = true;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
