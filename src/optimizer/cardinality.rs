//! Cardinality estimation and plan cost.
//!
//! Estimates the number of rows each operator produces from a
//! `GraphStatistics` snapshot. Plan cost is the sum of per-operator
//! output cardinalities (rows processed). Scans of unbound variables are
//! multiplied by the running cardinality, which surfaces Cartesian
//! products.

use std::collections::HashSet;

use crate::cypher::ast::{BinaryOp, Expr};
use crate::planner::ops::Op;
use crate::storage::GraphStatistics;

/// Selectivity assigned to predicates the model knows nothing about.
pub const DEFAULT_SELECTIVITY: f64 = 0.5;

/// Exponent cap for variable-length fanout estimation; keeps estimates
/// finite for unbounded patterns.
const VAR_LENGTH_ESTIMATE_CAP: u32 = 16;

/// Estimated selectivity of a predicate expression.
///
/// `=` and `IS NULL` → 0.1; inequalities → 0.5; `<>` and `IS NOT NULL`
/// → 0.9; `AND` → min of operands; `OR` → max of operands; anything else
/// → 0.5.
pub fn selectivity(expr: &Expr) -> f64 {
    match expr {
        Expr::Binary { op, left, right } => match op {
            BinaryOp::Eq => 0.1,
            BinaryOp::Neq => 0.9,
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => 0.5,
            BinaryOp::And => selectivity(left).min(selectivity(right)),
            BinaryOp::Or => selectivity(left).max(selectivity(right)),
            _ => DEFAULT_SELECTIVITY,
        },
        Expr::IsNull { negated: false, .. } => 0.1,
        Expr::IsNull { negated: true, .. } => 0.9,
        _ => DEFAULT_SELECTIVITY,
    }
}

/// Statistics-driven cardinality estimator.
pub struct CardinalityEstimator<'a> {
    stats: &'a GraphStatistics,
}

impl<'a> CardinalityEstimator<'a> {
    pub fn new(stats: &'a GraphStatistics) -> Self {
        Self { stats }
    }

    /// Cardinality of a label-DNF scan: without labels, every node; with a
    /// DNF, the sum over disjuncts of the most selective conjunct.
    pub fn scan_cardinality(&self, labels: &[Vec<String>]) -> f64 {
        if labels.is_empty() {
            return self.stats.total_nodes as f64;
        }
        labels
            .iter()
            .map(|conjunct| {
                conjunct
                    .iter()
                    .map(|label| self.stats.label_count(label))
                    .fold(f64::INFINITY, f64::min)
            })
            .sum()
    }

    /// Mean fanout of one expansion step over the listed edge types.
    pub fn expand_fanout(&self, edge_types: &[String]) -> f64 {
        if edge_types.is_empty() {
            self.stats.untyped_degree()
        } else {
            edge_types.iter().map(|t| self.stats.avg_degree(t)).sum()
        }
    }

    fn var_length_fanout(&self, edge_types: &[String], min: u32, max: u32) -> f64 {
        let f = self.expand_fanout(edge_types).max(1e-9);
        let min = min.min(VAR_LENGTH_ESTIMATE_CAP);
        let max = max.min(VAR_LENGTH_ESTIMATE_CAP).max(min);
        if (f - 1.0).abs() < 1e-9 {
            f64::from(max - min + 1)
        } else {
            // Geometric series over depths min..=max.
            (f.powi(max as i32 + 1) - f.powi(min as i32)) / (f - 1.0)
        }
    }

    fn predicate_selectivity(predicate: &Option<Expr>) -> f64 {
        predicate.as_ref().map_or(1.0, selectivity)
    }

    /// Plan cost of a pipeline: the sum of per-operator output
    /// cardinalities.
    pub fn pipeline_cost(&self, ops: &[Op]) -> f64 {
        let mut bound: HashSet<String> = HashSet::new();
        let mut card = 1.0_f64;
        let mut total = 0.0_f64;

        for op in ops {
            card = self.output_cardinality(op, card, &bound);
            for var in op.bound_vars() {
                bound.insert(var.to_string());
            }
            total += card;
        }
        total
    }

    fn output_cardinality(&self, op: &Op, input: f64, bound: &HashSet<String>) -> f64 {
        match op {
            Op::ScanNodes { var, labels, predicate }
            | Op::OptionalScanNodes { var, labels, predicate } => {
                let base = if bound.contains(var) {
                    // Bound variables are validated, not rescanned.
                    1.0
                } else {
                    self.scan_cardinality(labels)
                };
                (input * base * Self::predicate_selectivity(predicate)).max(1.0)
            }
            Op::ExpandEdges { edge_types, predicate, .. }
            | Op::OptionalExpandEdges { edge_types, predicate, .. } => {
                let fanout = self.expand_fanout(edge_types);
                (input * fanout * Self::predicate_selectivity(predicate)).max(1.0)
            }
            Op::ExpandVariableLength {
                edge_types,
                min_hops,
                max_hops,
                edge_predicate,
                node_predicate,
                ..
            } => {
                let fanout = self.var_length_fanout(edge_types, *min_hops, *max_hops);
                (input
                    * fanout
                    * Self::predicate_selectivity(edge_predicate)
                    * Self::predicate_selectivity(node_predicate))
                .max(1.0)
            }
            Op::ExpandMultiHop { hops, .. } => {
                let mut card = input;
                for hop in hops {
                    card *= self.expand_fanout(&hop.edge_types)
                        * Self::predicate_selectivity(&hop.predicate);
                }
                card.max(1.0)
            }
            Op::Filter { predicate } => (input * selectivity(predicate)).max(0.0),
            Op::Aggregate { grouping, .. } => {
                if grouping.is_empty() {
                    1.0
                } else {
                    (input / 10.0).max(1.0)
                }
            }
            _ => input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::ast::Literal;

    fn stats() -> GraphStatistics {
        let mut s = GraphStatistics {
            total_nodes: 1000,
            total_edges: 5000,
            ..Default::default()
        };
        s.node_counts_by_label.insert("Person".into(), 100);
        s.node_counts_by_label.insert("City".into(), 10);
        s.avg_degree_by_type.insert("KNOWS".into(), 3.0);
        s
    }

    fn prop_cmp(op: BinaryOp) -> Expr {
        Expr::Binary {
            left: Box::new(Expr::Property {
                expr: Box::new(Expr::Variable("n".into())),
                key: "age".into(),
            }),
            op,
            right: Box::new(Expr::Literal(Literal::Int(30))),
        }
    }

    #[test]
    fn test_selectivity_table() {
        assert_eq!(selectivity(&prop_cmp(BinaryOp::Eq)), 0.1);
        assert_eq!(selectivity(&prop_cmp(BinaryOp::Neq)), 0.9);
        assert_eq!(selectivity(&prop_cmp(BinaryOp::Lt)), 0.5);
        assert_eq!(selectivity(&Expr::Variable("x".into())), 0.5);
    }

    #[test]
    fn test_and_takes_min_or_takes_max() {
        let and = Expr::Binary {
            left: Box::new(prop_cmp(BinaryOp::Eq)),
            op: BinaryOp::And,
            right: Box::new(prop_cmp(BinaryOp::Lt)),
        };
        assert_eq!(selectivity(&and), 0.1);

        let or = Expr::Binary {
            left: Box::new(prop_cmp(BinaryOp::Eq)),
            op: BinaryOp::Or,
            right: Box::new(prop_cmp(BinaryOp::Lt)),
        };
        assert_eq!(selectivity(&or), 0.5);
    }

    #[test]
    fn test_scan_cardinality_dnf() {
        let stats = stats();
        let est = CardinalityEstimator::new(&stats);
        // No labels: every node.
        assert_eq!(est.scan_cardinality(&[]), 1000.0);
        // Single label.
        assert_eq!(est.scan_cardinality(&[vec!["Person".into()]]), 100.0);
        // Conjunction takes the most selective label.
        assert_eq!(
            est.scan_cardinality(&[vec!["Person".into(), "City".into()]]),
            10.0
        );
        // Disjunction sums.
        assert_eq!(
            est.scan_cardinality(&[vec!["Person".into()], vec!["City".into()]]),
            110.0
        );
        // Unknown labels fall back to the node count.
        assert_eq!(est.scan_cardinality(&[vec!["Nope".into()]]), 1000.0);
    }

    #[test]
    fn test_expand_fanout() {
        let stats = stats();
        let est = CardinalityEstimator::new(&stats);
        assert_eq!(est.expand_fanout(&["KNOWS".into()]), 3.0);
        assert_eq!(est.expand_fanout(&["UNKNOWN".into()]), 1.0);
        // Empty type list: total_edges / total_nodes.
        assert_eq!(est.expand_fanout(&[]), 5.0);
    }

    #[test]
    fn test_cost_prefers_selective_scan_first() {
        let stats = stats();
        let est = CardinalityEstimator::new(&stats);

        let scan = |var: &str, label: &str| Op::ScanNodes {
            var: var.into(),
            labels: vec![vec![label.into()]],
            predicate: None,
        };

        // City (10) then Person (100) is cheaper than the reverse because
        // the second scan is multiplied by the running cardinality.
        let cheap = est.pipeline_cost(&[scan("c", "City"), scan("p", "Person")]);
        let costly = est.pipeline_cost(&[scan("p", "Person"), scan("c", "City")]);
        assert!(cheap < costly, "{cheap} vs {costly}");
    }

    #[test]
    fn test_filter_reduces_downstream_cost() {
        let stats = stats();
        let est = CardinalityEstimator::new(&stats);

        let scan = Op::ScanNodes {
            var: "n".into(),
            labels: vec![vec!["Person".into()]],
            predicate: None,
        };
        let expand = Op::ExpandEdges {
            src_var: "n".into(),
            edge_var: None,
            dst_var: "m".into(),
            edge_types: vec!["KNOWS".into()],
            direction: crate::cypher::ast::PatternDirection::Out,
            predicate: None,
        };
        let filter = Op::Filter {
            predicate: prop_cmp(BinaryOp::Eq),
        };

        let filtered_early =
            est.pipeline_cost(&[scan.clone(), filter.clone(), expand.clone()]);
        let filtered_late = est.pipeline_cost(&[scan, expand, filter]);
        assert!(filtered_early < filtered_late);
    }
}
