//! Path — an alternating sequence of nodes and edges.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::edge::{EdgeId, EdgeRef};
use super::node::{NodeId, NodeRef};

/// A path in the graph: node -[edge]- node -[edge]- node ...
///
/// Invariants, enforced by the constructors:
/// - there is always at least one node;
/// - `edges.len() == nodes.len() - 1`;
/// - every adjacent (node, edge, node) triple is incident in either
///   direction.
///
/// The length of a path is its edge count; a single-node path has length 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathValue {
    nodes: Vec<NodeRef>,
    edges: Vec<EdgeRef>,
}

impl PathValue {
    /// A zero-length path consisting of one node.
    pub fn single(node: NodeRef) -> Self {
        Self { nodes: vec![node], edges: Vec::new() }
    }

    /// Build a path from parallel node/edge sequences, validating the
    /// alternating-sequence invariant. Returns None when the shape or any
    /// incidence check fails.
    pub fn try_new(nodes: Vec<NodeRef>, edges: Vec<EdgeRef>) -> Option<Self> {
        if nodes.is_empty() || edges.len() != nodes.len() - 1 {
            return None;
        }
        for (i, edge) in edges.iter().enumerate() {
            let a = nodes[i].id;
            let b = nodes[i + 1].id;
            let incident = (edge.src == a && edge.dst == b) || (edge.src == b && edge.dst == a);
            if !incident {
                return None;
            }
        }
        Some(Self { nodes, edges })
    }

    /// Extend the path with an edge and the node it leads to. Returns false
    /// (leaving the path untouched) when the edge is not incident to the
    /// current end and the new node.
    pub fn append(&mut self, edge: EdgeRef, node: NodeRef) -> bool {
        let tip = self.end().id;
        let incident =
            (edge.src == tip && edge.dst == node.id) || (edge.src == node.id && edge.dst == tip);
        if !incident {
            return false;
        }
        self.edges.push(edge);
        self.nodes.push(node);
        true
    }

    /// Path length = number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn start(&self) -> &NodeRef {
        &self.nodes[0]
    }

    pub fn end(&self) -> &NodeRef {
        self.nodes.last().expect("path always has at least one node")
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeRef] {
        &self.edges
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|e| e.id).collect()
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.iter().any(|e| e.id == id)
    }

    /// Iterator over (node, edge, node) triples along the path.
    pub fn triples(&self) -> impl Iterator<Item = (&NodeRef, &EdgeRef, &NodeRef)> {
        self.edges
            .iter()
            .enumerate()
            .map(move |(i, edge)| (&self.nodes[i], edge, &self.nodes[i + 1]))
    }
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nodes[0])?;
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.src == self.nodes[i].id {
                write!(f, "-{edge}->")?;
            } else {
                write!(f, "<-{edge}-")?;
            }
            write!(f, "{}", self.nodes[i + 1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> NodeRef {
        NodeRef::new(NodeId(id))
    }

    fn edge(id: u64, src: u64, dst: u64) -> EdgeRef {
        EdgeRef::new(EdgeId(id), NodeId(src), NodeId(dst), "KNOWS")
    }

    #[test]
    fn test_single_node_path_has_length_zero() {
        let p = PathValue::single(node(1));
        assert_eq!(p.len(), 0);
        assert_eq!(p.nodes().len(), 1);
    }

    #[test]
    fn test_append_checks_incidence() {
        let mut p = PathValue::single(node(1));
        assert!(p.append(edge(10, 1, 2), node(2)));
        // edge 2->3 traversed backwards is also fine
        assert!(p.append(edge(11, 3, 2), node(3)));
        // but an edge not touching the tip is rejected
        assert!(!p.append(edge(12, 7, 8), node(8)));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_length_invariant() {
        let mut p = PathValue::single(node(1));
        p.append(edge(10, 1, 2), node(2));
        p.append(edge(11, 2, 3), node(3));
        assert_eq!(p.len(), p.nodes().len() - 1);
        assert_eq!(p.len(), p.edges().len());
    }

    #[test]
    fn test_try_new_rejects_bad_shapes() {
        assert!(PathValue::try_new(vec![], vec![]).is_none());
        assert!(PathValue::try_new(vec![node(1)], vec![edge(10, 1, 2)]).is_none());
        assert!(PathValue::try_new(vec![node(1), node(2)], vec![edge(10, 5, 6)]).is_none());
        assert!(PathValue::try_new(vec![node(1), node(2)], vec![edge(10, 2, 1)]).is_some());
    }

    #[test]
    fn test_triples() {
        let mut p = PathValue::single(node(1));
        p.append(edge(10, 1, 2), node(2));
        p.append(edge(11, 2, 3), node(3));
        let triples: Vec<_> = p.triples().collect();
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].0.id, NodeId(1));
        assert_eq!(triples[1].2.id, NodeId(3));
    }
}
