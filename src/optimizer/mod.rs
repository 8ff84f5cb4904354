//! Cost-based plan optimizer.
//!
//! Runs a sequence of rewrites, each preserving result semantics:
//!
//! - **Filter pushdown**: standalone filter conjuncts move onto the
//!   earliest predicate-bearing operator whose inputs bind their
//!   variables.
//! - **Predicate reordering**: AND-conjunctions are sorted by estimated
//!   selectivity, cheapest first.
//! - **Join reordering**: independent pattern operators are permuted to
//!   the cheapest dependency-respecting order.
//!
//! All rewrites respect pipeline boundaries (`With`, `Union` branches,
//! projections, mutations) and never touch the optional operators, whose
//! NULL semantics a pushed predicate would change. Each rewrite is
//! individually switchable; the default enables all three.

pub mod cardinality;
pub mod join_order;

use tracing::trace;

use crate::cypher::ast::{BinaryOp, Expr};
use crate::planner::ops::{collect_expr_vars, Op, Plan};
use crate::storage::GraphStatistics;
use cardinality::{selectivity, CardinalityEstimator};
use join_order::{dependencies_satisfied, reorderable, JoinGraph};

/// Rewrite toggles.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub filter_pushdown: bool,
    pub predicate_reorder: bool,
    pub join_reorder: bool,
    /// Enumeration budget for join reordering; segments whose ordering
    /// space exceeds it are truncated to the first orderings found.
    pub join_enumeration_limit: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            filter_pushdown: true,
            predicate_reorder: true,
            join_reorder: true,
            join_enumeration_limit: 256,
        }
    }
}

/// Plan optimizer over a statistics snapshot.
pub struct Optimizer {
    stats: GraphStatistics,
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(stats: GraphStatistics) -> Self {
        Self {
            stats,
            config: OptimizerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_filter_pushdown(mut self, enabled: bool) -> Self {
        self.config.filter_pushdown = enabled;
        self
    }

    pub fn with_predicate_reorder(mut self, enabled: bool) -> Self {
        self.config.predicate_reorder = enabled;
        self
    }

    pub fn with_join_reorder(mut self, enabled: bool) -> Self {
        self.config.join_reorder = enabled;
        self
    }

    /// Estimated cost of a pipeline under the current statistics.
    pub fn estimate_cost(&self, ops: &[Op]) -> f64 {
        CardinalityEstimator::new(&self.stats).pipeline_cost(ops)
    }

    /// Optimize a plan, rewriting the main pipeline, every union branch,
    /// and every subquery pipeline.
    pub fn optimize(&self, mut plan: Plan) -> Plan {
        plan.ops = self.optimize_ops(plan.ops);
        for sub in &mut plan.subqueries {
            sub.ops = self.optimize_ops(std::mem::take(&mut sub.ops));
        }
        plan
    }

    fn optimize_ops(&self, mut ops: Vec<Op>) -> Vec<Op> {
        // Recurse into union branches first; each branch is its own
        // pipeline.
        for op in &mut ops {
            if let Op::Union { branches, .. } = op {
                let rewritten: Vec<Vec<Op>> = branches
                    .drain(..)
                    .map(|branch| self.optimize_ops(branch))
                    .collect();
                *branches = rewritten;
            }
        }

        if self.config.filter_pushdown {
            ops = self.push_filters(ops);
        }
        if self.config.join_reorder {
            ops = self.reorder_joins(ops);
        }
        if self.config.predicate_reorder {
            for op in &mut ops {
                reorder_op_predicates(op);
            }
        }
        ops
    }

    // ========================================================================
    // Filter pushdown
    // ========================================================================

    fn push_filters(&self, ops: Vec<Op>) -> Vec<Op> {
        let mut result: Vec<Op> = Vec::new();
        let mut segment_start = 0usize;

        for op in ops {
            match op {
                Op::Filter { predicate } => {
                    let mut kept = Vec::new();
                    for conjunct in split_conjuncts(predicate) {
                        if !try_push_conjunct(&mut result, segment_start, &conjunct) {
                            kept.push(conjunct);
                        } else {
                            trace!("pushed filter conjunct into an earlier operator");
                        }
                    }
                    if let Some(predicate) = combine_conjuncts(kept) {
                        result.push(Op::Filter { predicate });
                    }
                }
                other => {
                    let boundary = other.is_boundary();
                    result.push(other);
                    if boundary {
                        segment_start = result.len();
                    }
                }
            }
        }
        result
    }

    // ========================================================================
    // Join reordering
    // ========================================================================

    fn reorder_joins(&self, ops: Vec<Op>) -> Vec<Op> {
        let estimator = CardinalityEstimator::new(&self.stats);
        let mut result: Vec<Op> = Vec::new();
        let mut run: Vec<Op> = Vec::new();

        let flush = |run: &mut Vec<Op>, result: &mut Vec<Op>| {
            if run.len() >= 2 && reorderable(run) && run.iter().all(|op| !op_has_subquery(op)) {
                let graph = JoinGraph::new(run);
                if let Some(order) = graph.best_ordering(&estimator, self.config.join_enumeration_limit)
                {
                    let reordered: Vec<Op> = order.iter().map(|i| run[*i].clone()).collect();
                    if dependencies_satisfied(&reordered) {
                        trace!(operators = reordered.len(), "reordered pattern segment");
                        result.extend(reordered);
                        run.clear();
                        return;
                    }
                }
            }
            result.append(run);
        };

        for op in ops {
            if op.is_pattern_source() || matches!(op, Op::Filter { .. }) {
                run.push(op);
            } else {
                flush(&mut run, &mut result);
                result.push(op);
            }
        }
        flush(&mut run, &mut result);
        result
    }
}

// ============================================================================
// Predicate helpers
// ============================================================================

/// Flatten a predicate into its AND-conjuncts. OR subtrees stay intact.
pub fn split_conjuncts(expr: Expr) -> Vec<Expr> {
    match expr {
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => {
            let mut conjuncts = split_conjuncts(*left);
            conjuncts.extend(split_conjuncts(*right));
            conjuncts
        }
        other => vec![other],
    }
}

/// Rebuild a left-associated AND-conjunction, preserving order.
pub fn combine_conjuncts(conjuncts: Vec<Expr>) -> Option<Expr> {
    let mut iter = conjuncts.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, next| Expr::Binary {
        left: Box::new(acc),
        op: BinaryOp::And,
        right: Box::new(next),
    }))
}

/// Attach one conjunct to the earliest eligible operator. Returns false if
/// it has to stay in a standalone filter.
fn try_push_conjunct(result: &mut [Op], segment_start: usize, conjunct: &Expr) -> bool {
    // A subquery's correlated variables are invisible to the variable
    // walk; moving one is unsound.
    if expr_has_subquery(conjunct) {
        return false;
    }

    let mut vars = Vec::new();
    collect_expr_vars(conjunct, &mut vars);

    // Earliest index in the segment at which every variable is bound.
    let mut earliest = segment_start;
    for var in &vars {
        let mut binder = None;
        for (i, op) in result.iter().enumerate() {
            if op.bound_vars().contains(var) {
                binder = Some(i);
                break;
            }
        }
        match binder {
            Some(i) if i >= segment_start => earliest = earliest.max(i),
            Some(_) => {} // bound before the segment: available throughout
            None => return false,
        }
    }

    for op in result.iter_mut().skip(earliest) {
        if !op.supports_predicates() {
            continue;
        }
        if let Some(slot) = op.predicate_mut() {
            *slot = Some(match slot.take() {
                Some(existing) => Expr::Binary {
                    left: Box::new(existing),
                    op: BinaryOp::And,
                    right: Box::new(conjunct.clone()),
                },
                None => conjunct.clone(),
            });
            return true;
        }
    }
    false
}

/// Sort the AND-conjuncts of every predicate carried by an operator by
/// ascending selectivity (stable). OR subtrees are left untouched.
fn reorder_op_predicates(op: &mut Op) {
    let mut slots: Vec<&mut Option<Expr>> = Vec::new();
    match op {
        Op::ScanNodes { predicate, .. }
        | Op::OptionalScanNodes { predicate, .. }
        | Op::ExpandEdges { predicate, .. }
        | Op::OptionalExpandEdges { predicate, .. } => slots.push(predicate),
        Op::ExpandVariableLength { edge_predicate, node_predicate, .. } => {
            slots.push(edge_predicate);
            slots.push(node_predicate);
        }
        Op::ExpandMultiHop { hops, .. } => {
            for hop in hops {
                slots.push(&mut hop.predicate);
            }
        }
        Op::Filter { predicate } => {
            let reordered = reorder_conjunction(std::mem::replace(
                predicate,
                Expr::Literal(crate::cypher::ast::Literal::Null),
            ));
            *predicate = reordered;
            return;
        }
        Op::Union { branches, .. } => {
            for branch in branches {
                for op in branch {
                    reorder_op_predicates(op);
                }
            }
            return;
        }
        _ => return,
    }

    for slot in slots {
        if let Some(expr) = slot.take() {
            *slot = Some(reorder_conjunction(expr));
        }
    }
}

fn reorder_conjunction(expr: Expr) -> Expr {
    let mut conjuncts = split_conjuncts(expr);
    if conjuncts.len() > 1 {
        conjuncts.sort_by(|a, b| {
            selectivity(a)
                .partial_cmp(&selectivity(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    combine_conjuncts(conjuncts).expect("non-empty conjunction")
}

fn expr_has_subquery(expr: &Expr) -> bool {
    match expr {
        Expr::Subquery { .. } => true,
        Expr::Property { expr, .. }
        | Expr::Unary { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::HasLabel { expr, .. } => expr_has_subquery(expr),
        Expr::Binary { left, right, .. } => expr_has_subquery(left) || expr_has_subquery(right),
        Expr::In { expr, list } => expr_has_subquery(expr) || expr_has_subquery(list),
        Expr::StringMatch { left, right, .. } => {
            expr_has_subquery(left) || expr_has_subquery(right)
        }
        Expr::FunctionCall { args, .. } => args.iter().any(expr_has_subquery),
        Expr::List(items) => items.iter().any(expr_has_subquery),
        Expr::Map(entries) => entries.iter().any(|(_, v)| expr_has_subquery(v)),
        Expr::Index { expr, index } => expr_has_subquery(expr) || expr_has_subquery(index),
        Expr::Slice { expr, start, end } => {
            expr_has_subquery(expr)
                || start.as_deref().is_some_and(expr_has_subquery)
                || end.as_deref().is_some_and(expr_has_subquery)
        }
        Expr::ListComprehension { list, predicate, projection, .. } => {
            expr_has_subquery(list)
                || predicate.as_deref().is_some_and(expr_has_subquery)
                || projection.as_deref().is_some_and(expr_has_subquery)
        }
        Expr::Quantified { list, predicate, .. } => {
            expr_has_subquery(list) || expr_has_subquery(predicate)
        }
        Expr::Case { operand, whens, else_expr } => {
            operand.as_deref().is_some_and(expr_has_subquery)
                || whens
                    .iter()
                    .any(|(w, t)| expr_has_subquery(w) || expr_has_subquery(t))
                || else_expr.as_deref().is_some_and(expr_has_subquery)
        }
        _ => false,
    }
}

fn op_has_subquery(op: &Op) -> bool {
    match op {
        Op::Filter { predicate } => expr_has_subquery(predicate),
        Op::ScanNodes { predicate, .. }
        | Op::OptionalScanNodes { predicate, .. }
        | Op::ExpandEdges { predicate, .. }
        | Op::OptionalExpandEdges { predicate, .. } => {
            predicate.as_ref().is_some_and(expr_has_subquery)
        }
        Op::ExpandVariableLength { edge_predicate, node_predicate, .. } => {
            edge_predicate.as_ref().is_some_and(expr_has_subquery)
                || node_predicate.as_ref().is_some_and(expr_has_subquery)
        }
        Op::ExpandMultiHop { hops, .. } => hops
            .iter()
            .any(|h| h.predicate.as_ref().is_some_and(expr_has_subquery)),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
