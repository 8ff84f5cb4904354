//! Join (pattern-operator) reordering.
//!
//! Within a boundary-delimited segment, pattern operators may run in any
//! order that respects variable dependencies: an operator depends on every
//! earlier operator that binds a variable it requires. This module builds
//! that dependency DAG, enumerates topological orderings up to a
//! configurable budget, and returns the cheapest ordering under the
//! cardinality model.

use std::collections::HashSet;

use crate::planner::ops::Op;

use super::cardinality::CardinalityEstimator;

/// Dependency DAG over a run of reorderable operators.
pub struct JoinGraph<'o> {
    ops: &'o [Op],
    /// deps[i] = indices that must precede op i.
    deps: Vec<Vec<usize>>,
}

impl<'o> JoinGraph<'o> {
    pub fn new(ops: &'o [Op]) -> Self {
        let mut deps = vec![Vec::new(); ops.len()];
        for (i, op) in ops.iter().enumerate() {
            let required: Vec<&str> = op.required_vars();
            for var in required {
                // The binder is the closest earlier operator introducing it.
                for j in (0..i).rev() {
                    if ops[j].bound_vars().contains(&var) {
                        if !deps[i].contains(&j) {
                            deps[i].push(j);
                        }
                        break;
                    }
                }
            }
        }
        Self { ops, deps }
    }

    /// Enumerate topological orderings, stopping once `budget` orderings
    /// have been produced. Returns index permutations.
    pub fn orderings(&self, budget: usize) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut current = Vec::with_capacity(self.ops.len());
        let mut used = vec![false; self.ops.len()];
        self.enumerate(&mut current, &mut used, &mut out, budget);
        out
    }

    fn enumerate(
        &self,
        current: &mut Vec<usize>,
        used: &mut [bool],
        out: &mut Vec<Vec<usize>>,
        budget: usize,
    ) {
        if out.len() >= budget {
            return;
        }
        if current.len() == self.ops.len() {
            out.push(current.clone());
            return;
        }
        for i in 0..self.ops.len() {
            if used[i] {
                continue;
            }
            if self.deps[i].iter().any(|dep| !used[*dep]) {
                continue;
            }
            used[i] = true;
            current.push(i);
            self.enumerate(current, used, out, budget);
            current.pop();
            used[i] = false;
            if out.len() >= budget {
                return;
            }
        }
    }

    /// Pick the minimum-cost ordering. Returns None when the order is
    /// already unique (nothing to do).
    pub fn best_ordering(
        &self,
        estimator: &CardinalityEstimator<'_>,
        budget: usize,
    ) -> Option<Vec<usize>> {
        let orderings = self.orderings(budget);
        if orderings.len() < 2 {
            return None;
        }
        orderings.into_iter().min_by(|a, b| {
            let cost_a = self.ordering_cost(estimator, a);
            let cost_b = self.ordering_cost(estimator, b);
            cost_a.partial_cmp(&cost_b).unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    fn ordering_cost(&self, estimator: &CardinalityEstimator<'_>, ordering: &[usize]) -> f64 {
        let ops: Vec<Op> = ordering.iter().map(|i| self.ops[*i].clone()).collect();
        estimator.pipeline_cost(&ops)
    }
}

/// Whether a run of operators is worth reordering: at least two pattern
/// sources, no mutations, and no operator kind the reorderer does not
/// model.
pub fn reorderable(ops: &[Op]) -> bool {
    if ops.iter().any(Op::is_mutation) {
        return false;
    }
    let sources = ops.iter().filter(|op| op.is_pattern_source()).count();
    if sources < 2 {
        return false;
    }
    ops.iter().all(|op| op.is_pattern_source() || matches!(op, Op::Filter { .. }))
}

/// Sanity check used after reordering: every operator's requirements are
/// bound by its predecessors.
pub fn dependencies_satisfied(ops: &[Op]) -> bool {
    let mut bound: HashSet<&str> = HashSet::new();
    for op in ops {
        // Filters may reference variables bound before the segment (the
        // planner validated the full pipeline); only traversal sources are
        // strict here.
        if op.is_pattern_source() {
            for var in op.required_vars() {
                if !bound.contains(var) {
                    return false;
                }
            }
        }
        for var in op.bound_vars() {
            bound.insert(var);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::ast::PatternDirection;
    use crate::storage::GraphStatistics;

    fn scan(var: &str, label: &str) -> Op {
        Op::ScanNodes {
            var: var.into(),
            labels: vec![vec![label.into()]],
            predicate: None,
        }
    }

    fn expand(src: &str, dst: &str) -> Op {
        Op::ExpandEdges {
            src_var: src.into(),
            edge_var: None,
            dst_var: dst.into(),
            edge_types: vec!["KNOWS".into()],
            direction: PatternDirection::Out,
            predicate: None,
        }
    }

    fn stats() -> GraphStatistics {
        let mut s = GraphStatistics {
            total_nodes: 1000,
            total_edges: 2000,
            ..Default::default()
        };
        s.node_counts_by_label.insert("Big".into(), 900);
        s.node_counts_by_label.insert("Small".into(), 3);
        s.avg_degree_by_type.insert("KNOWS".into(), 2.0);
        s
    }

    #[test]
    fn test_expand_depends_on_its_scan() {
        let ops = vec![scan("a", "Big"), expand("a", "b")];
        let graph = JoinGraph::new(&ops);
        let orderings = graph.orderings(16);
        // The expand can never precede the scan.
        assert_eq!(orderings.len(), 1);
        assert_eq!(orderings[0], vec![0, 1]);
    }

    #[test]
    fn test_independent_scans_permute() {
        let ops = vec![scan("a", "Big"), scan("b", "Small")];
        let graph = JoinGraph::new(&ops);
        assert_eq!(graph.orderings(16).len(), 2);
    }

    #[test]
    fn test_best_ordering_puts_selective_scan_first() {
        let ops = vec![scan("a", "Big"), scan("b", "Small"), expand("a", "c")];
        let stats = stats();
        let estimator = CardinalityEstimator::new(&stats);
        let graph = JoinGraph::new(&ops);
        let best = graph.best_ordering(&estimator, 64).unwrap();
        // The Small scan should come first: the later scan pays the
        // running-cardinality multiplier.
        assert_eq!(best[0], 1);
    }

    #[test]
    fn test_budget_truncates() {
        let ops = vec![scan("a", "Big"), scan("b", "Small"), scan("c", "Big")];
        let graph = JoinGraph::new(&ops);
        assert_eq!(graph.orderings(4).len(), 4);
        assert_eq!(graph.orderings(100).len(), 6);
    }

    #[test]
    fn test_reorderable_guards() {
        assert!(!reorderable(&[scan("a", "Big")]));
        assert!(reorderable(&[scan("a", "Big"), scan("b", "Small")]));
        assert!(!reorderable(&[
            scan("a", "Big"),
            scan("b", "Small"),
            Op::Delete {
                vars: vec!["a".into()],
                detach: false
            }
        ]));
    }

    #[test]
    fn test_dependencies_satisfied() {
        assert!(dependencies_satisfied(&[scan("a", "Big"), expand("a", "b")]));
        assert!(!dependencies_satisfied(&[expand("a", "b"), scan("a", "Big")]));
    }
}
