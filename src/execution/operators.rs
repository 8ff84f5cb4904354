//! Pull-based operator implementations.
//!
//! Each logical operator compiles to a stream that owns its input stream
//! and produces bindings on demand. Mutating operators apply their writes
//! through the transaction as rows flow through them, so later reads in
//! the same query observe the effects.

use std::cell::Cell;
use std::cmp::Ordering;

use crate::cypher::ast::{
    Expr, OrderItem, PatternDirection, PatternElement, PatternPart, RemoveItem, SetItem,
};
use crate::model::{Direction, EdgeRef, NodeRef, PathValue, PropertyMap, Value};
use crate::planner::ops::{Hop, Op, ProjectItem};
use crate::storage::StoreTxn;
use crate::{Error, Result};

use super::aggregate;
use super::eval;
use super::{Binding, ExecContext, RowStream};

/// Name under which an anonymous edge is visible to its own inline
/// predicate during matching. Never escapes into result bindings.
pub const ANON_EDGE: &str = "#edge";

// ============================================================================
// Pipeline assembly
// ============================================================================

/// Compile an operator sequence into a stream chain seeded with one row.
pub fn build_pipeline<T: StoreTxn>(ops: Vec<Op>, seed: Binding) -> Box<dyn RowStream<T>> {
    let mut stream: Box<dyn RowStream<T>> = Box::new(SeedSource {
        binding: Some(seed),
    });
    for op in ops {
        stream = match op {
            Op::ScanNodes {
                var,
                labels,
                predicate,
            } => Box::new(ScanStream {
                var,
                labels,
                predicate,
                optional: false,
                input: stream,
                state: None,
            }),
            Op::OptionalScanNodes {
                var,
                labels,
                predicate,
            } => Box::new(ScanStream {
                var,
                labels,
                predicate,
                optional: true,
                input: stream,
                state: None,
            }),
            Op::ExpandEdges {
                src_var,
                edge_var,
                dst_var,
                edge_types,
                direction,
                predicate,
            } => Box::new(ExpandStream {
                src_var,
                edge_var,
                dst_var,
                edge_types,
                direction,
                predicate,
                optional: false,
                input: stream,
                state: None,
            }),
            Op::OptionalExpandEdges {
                src_var,
                edge_var,
                dst_var,
                edge_types,
                direction,
                predicate,
            } => Box::new(ExpandStream {
                src_var,
                edge_var,
                dst_var,
                edge_types,
                direction,
                predicate,
                optional: true,
                input: stream,
                state: None,
            }),
            Op::ExpandVariableLength {
                src_var,
                edge_var,
                dst_var,
                edge_types,
                direction,
                min_hops,
                max_hops,
                path_var,
                edge_predicate,
                node_predicate,
                optional,
            } => Box::new(VarLengthStream {
                src_var,
                edge_var,
                dst_var,
                edge_types,
                direction,
                min_hops,
                max_hops,
                path_var,
                edge_predicate,
                node_predicate,
                optional,
                input: stream,
                pending: Vec::new(),
            }),
            Op::ExpandMultiHop {
                src_var,
                hops,
                path_var,
            } => Box::new(MultiHopStream {
                src_var,
                hops,
                path_var,
                input: stream,
                pending: Vec::new(),
            }),
            Op::Filter { predicate } => Box::new(FilterStream {
                predicate,
                input: stream,
            }),
            Op::Project { items, distinct } => Box::new(ProjectStream {
                items,
                distinct,
                seen: Vec::new(),
                input: stream,
            }),
            Op::Sort { items } => Box::new(SortStream {
                items,
                input: stream,
                sorted: None,
            }),
            Op::Skip { count } => Box::new(SkipStream {
                count,
                remaining: None,
                input: stream,
            }),
            Op::Limit { count } => Box::new(LimitStream {
                count,
                remaining: None,
                input: stream,
            }),
            Op::Aggregate {
                grouping,
                aggregates,
                items,
            } => Box::new(AggregateStream {
                grouping,
                aggregates,
                items,
                input: stream,
                output: None,
            }),
            Op::With {
                items,
                distinct,
                predicate,
                sort,
                skip,
                limit,
            } => Box::new(WithStream {
                items,
                distinct,
                predicate,
                sort,
                skip,
                limit,
                input: stream,
                buffered: None,
            }),
            Op::Unwind { expr, var } => Box::new(UnwindStream {
                expr,
                var,
                input: stream,
                pending: Vec::new(),
            }),
            Op::Union { branches, all } => Box::new(UnionStream {
                columns: crate::planner::pipeline_columns(
                    branches.first().map_or(&[][..], Vec::as_slice),
                ),
                branches,
                all,
                current: None,
                branch_index: 0,
                seen: Vec::new(),
            }),
            Op::Create { patterns } => Box::new(CreateStream {
                patterns,
                input: stream,
            }),
            Op::Merge {
                pattern,
                match_ops,
                on_create,
                on_match,
            } => Box::new(MergeStream {
                pattern,
                match_ops,
                on_create,
                on_match,
                input: stream,
                pending: Vec::new(),
            }),
            Op::SetProps { items } => Box::new(SetStream {
                items,
                input: stream,
            }),
            Op::Remove { items } => Box::new(RemoveStream {
                items,
                input: stream,
            }),
            Op::Delete { vars, detach } => Box::new(DeleteStream {
                vars,
                detach,
                input: stream,
            }),
        };
    }
    stream
}

/// Run a pre-planned subquery pipeline seeded with the outer binding.
/// `limit` enables EXISTS-style short-circuiting.
pub fn run_subquery<T: StoreTxn>(
    ops: &[Op],
    seed: &Binding,
    cx: &mut ExecContext<'_, T>,
    limit: Option<usize>,
) -> Result<Vec<Binding>> {
    let mut stream = build_pipeline(ops.to_vec(), seed.clone());
    let mut rows = Vec::new();
    while let Some(binding) = stream.next(cx)? {
        cx.check_cancelled()?;
        rows.push(binding);
        if limit.is_some_and(|l| rows.len() >= l) {
            break;
        }
    }
    Ok(rows)
}

// ============================================================================
// Sources
// ============================================================================

struct SeedSource {
    binding: Option<Binding>,
}

impl<T: StoreTxn> RowStream<T> for SeedSource {
    fn next(&mut self, _cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        Ok(self.binding.take())
    }
}

// ============================================================================
// Scans
// ============================================================================

fn node_matches_dnf(node: &NodeRef, labels: &[Vec<String>]) -> bool {
    labels.is_empty()
        || labels
            .iter()
            .any(|conjunct| conjunct.iter().all(|label| node.has_label(label)))
}

struct ScanStream<T: StoreTxn> {
    var: String,
    labels: Vec<Vec<String>>,
    predicate: Option<Expr>,
    optional: bool,
    input: Box<dyn RowStream<T>>,
    state: Option<ScanState>,
}

struct ScanState {
    base: Binding,
    candidates: Vec<NodeRef>,
    index: usize,
    emitted: bool,
}

impl<T: StoreTxn> ScanStream<T> {
    /// Most selective label first: use the label index for the smallest
    /// conjunct label, then re-filter by the rest.
    fn fetch_candidates(&self, cx: &mut ExecContext<'_, T>) -> Result<Vec<NodeRef>> {
        if self.labels.is_empty() {
            return cx.txn.scan_nodes_by_label(None);
        }
        if self.labels.len() == 1 {
            let conjunct = &self.labels[0];
            let stats = cx.txn.statistics()?;
            let anchor = conjunct
                .iter()
                .min_by(|a, b| {
                    stats
                        .label_count(a)
                        .partial_cmp(&stats.label_count(b))
                        .unwrap_or(Ordering::Equal)
                })
                .expect("non-empty conjunct");
            let nodes = cx.txn.scan_nodes_by_label(Some(anchor))?;
            return Ok(nodes
                .into_iter()
                .filter(|n| conjunct.iter().all(|l| n.has_label(l)))
                .collect());
        }
        // Disjunctive label expression: full scan filtered by the DNF.
        let nodes = cx.txn.scan_nodes_by_label(None)?;
        Ok(nodes
            .into_iter()
            .filter(|n| node_matches_dnf(n, &self.labels))
            .collect())
    }

    fn validate_bound(
        &self,
        base: &Binding,
        cx: &mut ExecContext<'_, T>,
    ) -> Result<Option<Binding>> {
        let matches = match base.get(&self.var) {
            Some(Value::Node(node)) => {
                node_matches_dnf(node, &self.labels)
                    && eval::passes(self.predicate.as_ref(), base, cx)?
            }
            _ => false,
        };
        if matches {
            Ok(Some(base.clone()))
        } else if self.optional {
            Ok(Some(base.extended(&self.var, Value::Null)))
        } else {
            Ok(None)
        }
    }
}

impl<T: StoreTxn> RowStream<T> for ScanStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        loop {
            if self.state.is_none() {
                let Some(base) = self.input.next(cx)? else {
                    return Ok(None);
                };
                if base.contains(&self.var) {
                    match self.validate_bound(&base, cx)? {
                        Some(row) => return Ok(Some(row)),
                        None => continue,
                    }
                }
                let candidates = self.fetch_candidates(cx)?;
                self.state = Some(ScanState {
                    base,
                    candidates,
                    index: 0,
                    emitted: false,
                });
            }

            let state = self.state.as_mut().expect("state set above");
            while state.index < state.candidates.len() {
                let node = state.candidates[state.index].clone();
                state.index += 1;
                let row = state.base.extended(&self.var, Value::Node(Box::new(node)));
                if eval::passes(self.predicate.as_ref(), &row, cx)? {
                    state.emitted = true;
                    return Ok(Some(row));
                }
            }

            let state = self.state.take().expect("state set above");
            if self.optional && !state.emitted {
                return Ok(Some(state.base.extended(&self.var, Value::Null)));
            }
        }
    }
}

// ============================================================================
// Single-hop expansion
// ============================================================================

fn direction_of(direction: PatternDirection) -> Direction {
    match direction {
        PatternDirection::Out => Direction::Outgoing,
        PatternDirection::In => Direction::Incoming,
        PatternDirection::Undirected => Direction::Undirected,
    }
}

/// Destination node id of an edge traversed from `from` in `direction`.
fn traversal_target(edge: &EdgeRef, from: crate::model::NodeId, direction: PatternDirection) -> crate::model::NodeId {
    match direction {
        PatternDirection::Out => edge.dst,
        PatternDirection::In => edge.src,
        PatternDirection::Undirected => edge.other_node(from).unwrap_or(edge.dst),
    }
}

struct ExpandStream<T: StoreTxn> {
    src_var: String,
    edge_var: Option<String>,
    dst_var: String,
    edge_types: Vec<String>,
    direction: PatternDirection,
    predicate: Option<Expr>,
    optional: bool,
    input: Box<dyn RowStream<T>>,
    state: Option<ExpandState>,
}

struct ExpandState {
    base: Binding,
    candidates: Vec<(EdgeRef, NodeRef)>,
    index: usize,
    emitted: bool,
}

impl<T: StoreTxn> ExpandStream<T> {
    fn null_row(&self, base: &Binding) -> Binding {
        let mut row = base.extended(&self.dst_var, Value::Null);
        if let Some(edge_var) = &self.edge_var {
            row = row.extended(edge_var, Value::Null);
        }
        row
    }

    fn candidates_for(
        &self,
        src: &NodeRef,
        base: &Binding,
        cx: &mut ExecContext<'_, T>,
    ) -> Result<Vec<(EdgeRef, NodeRef)>> {
        let edges = cx
            .txn
            .incident_edges(src.id, direction_of(self.direction), &self.edge_types)?;
        let mut candidates = Vec::new();
        for edge in edges {
            let mut targets = vec![traversal_target(&edge, src.id, self.direction)];
            // A self-loop traversed undirected yields a row per direction.
            if self.direction == PatternDirection::Undirected && edge.src == edge.dst {
                targets.push(edge.src);
            }
            for target in targets {
                let Some(node) = cx.txn.node(target)? else {
                    continue;
                };
                // Join semantics: an already-bound destination or edge
                // variable restricts the expansion to matching candidates.
                if let Some(Value::Node(bound)) = base.get(&self.dst_var) {
                    if bound.id != node.id {
                        continue;
                    }
                }
                if let Some(edge_var) = &self.edge_var {
                    if let Some(Value::Edge(bound)) = base.get(edge_var) {
                        if bound.id != edge.id {
                            continue;
                        }
                    }
                }
                candidates.push((edge.clone(), node));
            }
        }
        Ok(candidates)
    }
}

impl<T: StoreTxn> RowStream<T> for ExpandStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        loop {
            if self.state.is_none() {
                let Some(base) = self.input.next(cx)? else {
                    return Ok(None);
                };
                let candidates = match base.get(&self.src_var) {
                    Some(Value::Node(src)) => {
                        let src = (**src).clone();
                        self.candidates_for(&src, &base, cx)?
                    }
                    Some(Value::Null) | None => {
                        if self.optional {
                            return Ok(Some(self.null_row(&base)));
                        }
                        continue;
                    }
                    Some(other) => {
                        return Err(Error::Type {
                            expected: "NODE".into(),
                            got: other.type_name().into(),
                        });
                    }
                };
                self.state = Some(ExpandState {
                    base,
                    candidates,
                    index: 0,
                    emitted: false,
                });
            }

            let state = self.state.as_mut().expect("state set above");
            while state.index < state.candidates.len() {
                let (edge, node) = state.candidates[state.index].clone();
                state.index += 1;

                let mut row = state.base.clone();
                if !row.contains(&self.dst_var) {
                    row = row.extended(&self.dst_var, Value::Node(Box::new(node)));
                }
                let pred_row = match &self.edge_var {
                    Some(edge_var) => {
                        row = row.extended(edge_var, Value::Edge(Box::new(edge)));
                        None
                    }
                    None if self.predicate.is_some() => {
                        Some(row.extended(ANON_EDGE, Value::Edge(Box::new(edge))))
                    }
                    None => None,
                };

                let passes = eval::passes(
                    self.predicate.as_ref(),
                    pred_row.as_ref().unwrap_or(&row),
                    cx,
                )?;
                if passes {
                    state.emitted = true;
                    return Ok(Some(row));
                }
            }

            let state = self.state.take().expect("state set above");
            if self.optional && !state.emitted {
                return Ok(Some(self.null_row(&state.base)));
            }
        }
    }
}

// ============================================================================
// Variable-length expansion
// ============================================================================

struct VarLengthStream<T: StoreTxn> {
    src_var: String,
    edge_var: Option<String>,
    dst_var: String,
    edge_types: Vec<String>,
    direction: PatternDirection,
    min_hops: u32,
    max_hops: u32,
    path_var: Option<String>,
    edge_predicate: Option<Expr>,
    node_predicate: Option<Expr>,
    optional: bool,
    input: Box<dyn RowStream<T>>,
    pending: Vec<Binding>,
}

impl<T: StoreTxn> VarLengthStream<T> {
    fn emit(
        &self,
        base: &Binding,
        path: &PathValue,
        out: &mut Vec<Binding>,
        cx: &mut ExecContext<'_, T>,
    ) -> Result<()> {
        let end = path.end().clone();
        if let Some(Value::Node(bound)) = base.get(&self.dst_var) {
            if bound.id != end.id {
                return Ok(());
            }
        }
        let mut row = base.clone();
        if !row.contains(&self.dst_var) {
            row = row.extended(&self.dst_var, Value::Node(Box::new(end)));
        }
        if let Some(edge_var) = &self.edge_var {
            let edges = path
                .edges()
                .iter()
                .map(|e| Value::Edge(Box::new(e.clone())))
                .collect();
            row = row.extended(edge_var, Value::List(edges));
        }
        if let Some(path_var) = &self.path_var {
            row = row.extended(path_var, Value::Path(Box::new(path.clone())));
        }
        if eval::passes(self.node_predicate.as_ref(), &row, cx)? {
            out.push(row);
        }
        Ok(())
    }

    /// Breadth-first enumeration up to `max_hops`, recording destinations
    /// at every depth in `[min_hops, max_hops]`. Cycles are prevented by
    /// edge-uniqueness within a path, not node-uniqueness.
    fn expand_all(
        &self,
        base: &Binding,
        src: NodeRef,
        cx: &mut ExecContext<'_, T>,
    ) -> Result<Vec<Binding>> {
        let mut out = Vec::new();
        let root = PathValue::single(src);
        if self.min_hops == 0 {
            self.emit(base, &root, &mut out, cx)?;
        }

        let mut frontier = vec![root];
        let mut depth = 0u32;
        while depth < self.max_hops && !frontier.is_empty() {
            let mut next_frontier = Vec::new();
            for path in &frontier {
                let tip = path.end().clone();
                let edges = cx.txn.incident_edges(
                    tip.id,
                    direction_of(self.direction),
                    &self.edge_types,
                )?;
                for edge in edges {
                    if path.contains_edge(edge.id) {
                        continue;
                    }
                    let pred_row = base.extended(
                        self.edge_var.as_deref().unwrap_or(ANON_EDGE),
                        Value::Edge(Box::new(edge.clone())),
                    );
                    if !eval::passes(self.edge_predicate.as_ref(), &pred_row, cx)? {
                        continue;
                    }
                    let target = traversal_target(&edge, tip.id, self.direction);
                    let Some(node) = cx.txn.node(target)? else {
                        continue;
                    };
                    let mut extended = path.clone();
                    if !extended.append(edge, node) {
                        continue;
                    }
                    if depth + 1 >= self.min_hops {
                        self.emit(base, &extended, &mut out, cx)?;
                    }
                    next_frontier.push(extended);
                }
            }
            frontier = next_frontier;
            depth += 1;
        }
        Ok(out)
    }

    fn null_row(&self, base: &Binding) -> Binding {
        let mut row = base.extended(&self.dst_var, Value::Null);
        if let Some(edge_var) = &self.edge_var {
            row = row.extended(edge_var, Value::Null);
        }
        if let Some(path_var) = &self.path_var {
            row = row.extended(path_var, Value::Null);
        }
        row
    }
}

impl<T: StoreTxn> RowStream<T> for VarLengthStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        loop {
            if let Some(row) = self.pending.pop() {
                return Ok(Some(row));
            }
            let Some(base) = self.input.next(cx)? else {
                return Ok(None);
            };
            match base.get(&self.src_var) {
                Some(Value::Node(src)) => {
                    let src = (**src).clone();
                    let mut rows = self.expand_all(&base, src, cx)?;
                    if rows.is_empty() && self.optional {
                        rows.push(self.null_row(&base));
                    }
                    rows.reverse();
                    self.pending = rows;
                }
                Some(Value::Null) | None => {
                    if self.optional {
                        return Ok(Some(self.null_row(&base)));
                    }
                }
                Some(other) => {
                    return Err(Error::Type {
                        expected: "NODE".into(),
                        got: other.type_name().into(),
                    });
                }
            }
        }
    }
}

// ============================================================================
// Fixed-length multi-hop expansion
// ============================================================================

struct MultiHopStream<T: StoreTxn> {
    src_var: String,
    hops: Vec<Hop>,
    path_var: Option<String>,
    input: Box<dyn RowStream<T>>,
    pending: Vec<Binding>,
}

impl<T: StoreTxn> MultiHopStream<T> {
    fn expand_hop(
        &self,
        hop_index: usize,
        row: Binding,
        path: PathValue,
        out: &mut Vec<Binding>,
        cx: &mut ExecContext<'_, T>,
    ) -> Result<()> {
        if hop_index == self.hops.len() {
            let mut row = row;
            if let Some(path_var) = &self.path_var {
                row = row.extended(path_var, Value::Path(Box::new(path)));
            }
            out.push(row);
            return Ok(());
        }

        let hop = &self.hops[hop_index];
        let tip = path.end().clone();
        let edges = cx
            .txn
            .incident_edges(tip.id, direction_of(hop.direction), &hop.edge_types)?;
        for edge in edges {
            let target = traversal_target(&edge, tip.id, hop.direction);
            let Some(node) = cx.txn.node(target)? else {
                continue;
            };
            if let Some(Value::Node(bound)) = row.get(&hop.dst_var) {
                if bound.id != node.id {
                    continue;
                }
            }

            let mut extended = row.clone();
            if !extended.contains(&hop.dst_var) {
                extended = extended.extended(&hop.dst_var, Value::Node(Box::new(node.clone())));
            }
            let pred_row = match &hop.edge_var {
                Some(edge_var) => {
                    extended = extended.extended(edge_var, Value::Edge(Box::new(edge.clone())));
                    None
                }
                None if hop.predicate.is_some() => {
                    Some(extended.extended(ANON_EDGE, Value::Edge(Box::new(edge.clone()))))
                }
                None => None,
            };
            if !eval::passes(
                hop.predicate.as_ref(),
                pred_row.as_ref().unwrap_or(&extended),
                cx,
            )? {
                continue;
            }

            let mut next_path = path.clone();
            if !next_path.append(edge, node) {
                continue;
            }
            self.expand_hop(hop_index + 1, extended, next_path, out, cx)?;
        }
        Ok(())
    }
}

impl<T: StoreTxn> RowStream<T> for MultiHopStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        loop {
            if let Some(row) = self.pending.pop() {
                return Ok(Some(row));
            }
            let Some(base) = self.input.next(cx)? else {
                return Ok(None);
            };
            let Some(Value::Node(src)) = base.get(&self.src_var) else {
                continue;
            };
            let path = PathValue::single((**src).clone());
            let mut rows = Vec::new();
            self.expand_hop(0, base.clone(), path, &mut rows, cx)?;
            rows.reverse();
            self.pending = rows;
        }
    }
}

// ============================================================================
// Filter / Project
// ============================================================================

struct FilterStream<T: StoreTxn> {
    predicate: Expr,
    input: Box<dyn RowStream<T>>,
}

impl<T: StoreTxn> RowStream<T> for FilterStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        while let Some(row) = self.input.next(cx)? {
            if eval::passes(Some(&self.predicate), &row, cx)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

fn project_row<T: StoreTxn>(
    items: &[ProjectItem],
    row: &Binding,
    cx: &mut ExecContext<'_, T>,
) -> Result<Binding> {
    let mut out = Binding::new();
    for item in items {
        let value = eval::evaluate(&item.expr, row, cx)?;
        out.insert(&item.name, value);
    }
    Ok(out)
}

fn distinct_key(columns: &[String], row: &Binding) -> Vec<Value> {
    columns
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
        .collect()
}

fn key_seen(seen: &[Vec<Value>], key: &[Value]) -> bool {
    seen.iter()
        .any(|k| k.len() == key.len() && k.iter().zip(key).all(|(a, b)| a.same_value(b)))
}

struct ProjectStream<T: StoreTxn> {
    items: Vec<ProjectItem>,
    distinct: bool,
    seen: Vec<Vec<Value>>,
    input: Box<dyn RowStream<T>>,
}

impl<T: StoreTxn> RowStream<T> for ProjectStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        let columns: Vec<String> = self.items.iter().map(|i| i.name.clone()).collect();
        while let Some(row) = self.input.next(cx)? {
            // The pre-projection variables stay in the binding so a later
            // Sort can evaluate keys like `n.age` when only `n.name` was
            // projected. The result row is narrowed to the column list by
            // the driver.
            let mut values = Vec::with_capacity(self.items.len());
            for item in &self.items {
                values.push(eval::evaluate(&item.expr, &row, cx)?);
            }
            let mut projected = row.clone();
            for (item, value) in self.items.iter().zip(values) {
                projected.insert(&item.name, value);
            }
            if self.distinct {
                let key = distinct_key(&columns, &projected);
                if key_seen(&self.seen, &key) {
                    continue;
                }
                self.seen.push(key);
            }
            return Ok(Some(projected));
        }
        Ok(None)
    }
}

// ============================================================================
// Sort / Skip / Limit
// ============================================================================

/// Sort key comparison with the NULL policy: NULL sorts last under ASC,
/// first under DESC. Incompatible kinds flag an error.
fn compare_keys(a: &[Value], b: &[Value], items: &[OrderItem], error: &Cell<bool>) -> Ordering {
    for (i, item) in items.iter().enumerate() {
        let (x, y) = (&a[i], &b[i]);
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match x.compare(y) {
                Some(ord) => ord,
                None => {
                    error.set(true);
                    Ordering::Equal
                }
            },
        };
        let ord = if item.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Evaluate a sort expression: projected column names win (so aliases of
/// aggregates resolve), otherwise the expression is evaluated against the
/// row.
fn sort_key_value<T: StoreTxn>(
    expr: &Expr,
    row: &Binding,
    cx: &mut ExecContext<'_, T>,
) -> Result<Value> {
    if let Some(value) = row.get(&expr.column_name()) {
        return Ok(value.clone());
    }
    eval::evaluate(expr, row, cx)
}

/// Stable multi-key sort of materialized rows.
fn sort_bindings<T: StoreTxn>(
    rows: &mut Vec<Binding>,
    items: &[OrderItem],
    cx: &mut ExecContext<'_, T>,
) -> Result<()> {
    let mut keyed: Vec<(Vec<Value>, Binding)> = Vec::with_capacity(rows.len());
    for row in rows.drain(..) {
        let mut key = Vec::with_capacity(items.len());
        for item in items {
            key.push(sort_key_value(&item.expr, &row, cx)?);
        }
        keyed.push((key, row));
    }

    let error = Cell::new(false);
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, items, &error));
    if error.get() {
        return Err(Error::Type {
            expected: "comparable sort keys".into(),
            got: "mismatched kinds".into(),
        });
    }

    rows.extend(keyed.into_iter().map(|(_, row)| row));
    Ok(())
}

struct SortStream<T: StoreTxn> {
    items: Vec<OrderItem>,
    input: Box<dyn RowStream<T>>,
    sorted: Option<std::vec::IntoIter<Binding>>,
}

impl<T: StoreTxn> RowStream<T> for SortStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        if self.sorted.is_none() {
            let mut rows = Vec::new();
            while let Some(row) = self.input.next(cx)? {
                cx.check_cancelled()?;
                rows.push(row);
            }
            sort_bindings(&mut rows, &self.items, cx)?;
            self.sorted = Some(rows.into_iter());
        }
        Ok(self.sorted.as_mut().expect("materialized above").next())
    }
}

/// SKIP/LIMIT count: evaluated once, clamped at zero, non-integers are a
/// runtime error.
fn paging_count<T: StoreTxn>(expr: &Expr, cx: &mut ExecContext<'_, T>) -> Result<usize> {
    let value = eval::evaluate(expr, &Binding::new(), cx)?;
    match value {
        Value::Int(i) => Ok(i.max(0) as usize),
        other => Err(Error::Type {
            expected: "INTEGER".into(),
            got: other.type_name().into(),
        }),
    }
}

struct SkipStream<T: StoreTxn> {
    count: Expr,
    remaining: Option<usize>,
    input: Box<dyn RowStream<T>>,
}

impl<T: StoreTxn> RowStream<T> for SkipStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        if self.remaining.is_none() {
            self.remaining = Some(paging_count(&self.count, cx)?);
        }
        while self.remaining.unwrap_or(0) > 0 {
            if self.input.next(cx)?.is_none() {
                return Ok(None);
            }
            self.remaining = Some(self.remaining.unwrap_or(0) - 1);
        }
        self.input.next(cx)
    }
}

struct LimitStream<T: StoreTxn> {
    count: Expr,
    remaining: Option<usize>,
    input: Box<dyn RowStream<T>>,
}

impl<T: StoreTxn> RowStream<T> for LimitStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        if self.remaining.is_none() {
            self.remaining = Some(paging_count(&self.count, cx)?);
        }
        let remaining = self.remaining.expect("initialized above");
        if remaining == 0 {
            return Ok(None);
        }
        match self.input.next(cx)? {
            Some(row) => {
                self.remaining = Some(remaining - 1);
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }
}

// ============================================================================
// Aggregate
// ============================================================================

struct AggregateStream<T: StoreTxn> {
    grouping: Vec<ProjectItem>,
    aggregates: Vec<Expr>,
    items: Vec<ProjectItem>,
    input: Box<dyn RowStream<T>>,
    output: Option<std::vec::IntoIter<Binding>>,
}

impl<T: StoreTxn> AggregateStream<T> {
    fn materialize(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Vec<Binding>> {
        // Group rows by the grouping tuple; NULL equals NULL here.
        let mut groups: Vec<(Vec<Value>, Vec<Binding>)> = Vec::new();
        while let Some(row) = self.input.next(cx)? {
            cx.check_cancelled()?;
            let mut key = Vec::with_capacity(self.grouping.len());
            for item in &self.grouping {
                key.push(eval::evaluate(&item.expr, &row, cx)?);
            }
            let found = groups
                .iter()
                .position(|(k, _)| k.iter().zip(key.iter()).all(|(a, b)| a.same_value(b)));
            match found {
                Some(i) => groups[i].1.push(row),
                None => groups.push((key, vec![row])),
            }
        }

        // A grouping-free aggregation over no rows still emits one row.
        if groups.is_empty() && self.grouping.is_empty() {
            groups.push((Vec::new(), Vec::new()));
        }

        let mut output = Vec::with_capacity(groups.len());
        for (_, rows) in groups {
            let representative = rows.first().cloned().unwrap_or_default();
            let mut agg_values = Vec::with_capacity(self.aggregates.len());
            for agg in &self.aggregates {
                let value = aggregate::compute(agg, &rows, cx)?;
                agg_values.push((agg.clone(), value));
            }

            let mut out = Binding::new();
            for item in &self.items {
                let value =
                    eval::evaluate_with_aggregates(&item.expr, &representative, &agg_values, cx)?;
                out.insert(&item.name, value);
            }
            // Aggregates not projected under their own name stay reachable
            // for ORDER BY via their rendered form.
            for (expr, value) in &agg_values {
                let name = expr.column_name();
                if !out.contains(&name) {
                    out.insert(&name, value.clone());
                }
            }
            output.push(out);
        }
        Ok(output)
    }
}

impl<T: StoreTxn> RowStream<T> for AggregateStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        if self.output.is_none() {
            let rows = self.materialize(cx)?;
            self.output = Some(rows.into_iter());
        }
        Ok(self.output.as_mut().expect("materialized above").next())
    }
}

// ============================================================================
// With
// ============================================================================

struct WithStream<T: StoreTxn> {
    items: Vec<ProjectItem>,
    distinct: bool,
    predicate: Option<Expr>,
    sort: Vec<OrderItem>,
    skip: Option<Expr>,
    limit: Option<Expr>,
    input: Box<dyn RowStream<T>>,
    buffered: Option<std::vec::IntoIter<Binding>>,
}

impl<T: StoreTxn> WithStream<T> {
    fn needs_materialization(&self) -> bool {
        self.distinct || !self.sort.is_empty() || self.skip.is_some() || self.limit.is_some()
    }
}

impl<T: StoreTxn> RowStream<T> for WithStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        if !self.needs_materialization() {
            // Streaming form: project, then filter.
            while let Some(row) = self.input.next(cx)? {
                let projected = project_row(&self.items, &row, cx)?;
                if eval::passes(self.predicate.as_ref(), &projected, cx)? {
                    return Ok(Some(projected));
                }
            }
            return Ok(None);
        }

        if self.buffered.is_none() {
            let columns: Vec<String> = self.items.iter().map(|i| i.name.clone()).collect();
            // Sort keys may reference pre-projection variables, so the
            // original binding rides along until sorting is done; the new
            // scope is cut afterwards.
            let mut rows = Vec::new();
            let mut seen: Vec<Vec<Value>> = Vec::new();
            while let Some(row) = self.input.next(cx)? {
                cx.check_cancelled()?;
                let mut values = Vec::with_capacity(self.items.len());
                for item in &self.items {
                    values.push(eval::evaluate(&item.expr, &row, cx)?);
                }
                let mut merged = row.clone();
                for (item, value) in self.items.iter().zip(values) {
                    merged.insert(&item.name, value);
                }
                if !eval::passes(self.predicate.as_ref(), &merged, cx)? {
                    continue;
                }
                if self.distinct {
                    let key = distinct_key(&columns, &merged);
                    if key_seen(&seen, &key) {
                        continue;
                    }
                    seen.push(key);
                }
                rows.push(merged);
            }

            if !self.sort.is_empty() {
                sort_bindings(&mut rows, &self.sort, cx)?;
            }
            if let Some(skip) = &self.skip {
                let n = paging_count(skip, cx)?;
                rows.drain(..n.min(rows.len()));
            }
            if let Some(limit) = &self.limit {
                let n = paging_count(limit, cx)?;
                rows.truncate(n);
            }
            let narrowed = rows
                .into_iter()
                .map(|row| {
                    let mut out = Binding::new();
                    for column in &columns {
                        out.insert(column, row.get(column).cloned().unwrap_or(Value::Null));
                    }
                    out
                })
                .collect::<Vec<_>>();
            self.buffered = Some(narrowed.into_iter());
        }
        Ok(self.buffered.as_mut().expect("materialized above").next())
    }
}

// ============================================================================
// Unwind
// ============================================================================

struct UnwindStream<T: StoreTxn> {
    expr: Expr,
    var: String,
    input: Box<dyn RowStream<T>>,
    pending: Vec<Binding>,
}

impl<T: StoreTxn> RowStream<T> for UnwindStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        loop {
            if let Some(row) = self.pending.pop() {
                return Ok(Some(row));
            }
            let Some(base) = self.input.next(cx)? else {
                return Ok(None);
            };
            match eval::evaluate(&self.expr, &base, cx)? {
                // An empty list contributes zero rows.
                Value::List(items) => {
                    self.pending = items
                        .into_iter()
                        .rev()
                        .map(|item| base.extended(&self.var, item))
                        .collect();
                }
                Value::Null => return Ok(Some(base.extended(&self.var, Value::Null))),
                other => {
                    return Err(Error::Type {
                        expected: "LIST".into(),
                        got: other.type_name().into(),
                    });
                }
            }
        }
    }
}

// ============================================================================
// Union
// ============================================================================

struct UnionStream<T: StoreTxn> {
    branches: Vec<Vec<Op>>,
    all: bool,
    columns: Vec<String>,
    current: Option<Box<dyn RowStream<T>>>,
    branch_index: usize,
    seen: Vec<Vec<Value>>,
}

impl<T: StoreTxn> RowStream<T> for UnionStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        loop {
            if self.current.is_none() {
                if self.branch_index >= self.branches.len() {
                    return Ok(None);
                }
                let ops = self.branches[self.branch_index].clone();
                self.branch_index += 1;
                self.current = Some(build_pipeline(ops, Binding::new()));
            }

            match self.current.as_mut().expect("set above").next(cx)? {
                Some(row) => {
                    if !self.all {
                        let key = distinct_key(&self.columns, &row);
                        if key_seen(&self.seen, &key) {
                            continue;
                        }
                        self.seen.push(key);
                    }
                    return Ok(Some(row));
                }
                None => {
                    self.current = None;
                }
            }
        }
    }
}

// ============================================================================
// Mutations
// ============================================================================

/// Instantiate one pattern, creating nodes and edges in pattern order.
/// Already-bound variables are reused; new entity handles are bound to
/// their pattern variables.
pub fn instantiate_pattern<T: StoreTxn>(
    pattern: &PatternPart,
    row: &Binding,
    cx: &mut ExecContext<'_, T>,
) -> Result<Binding> {
    let mut row = row.clone();
    let mut previous: Option<NodeRef> = None;
    let mut pending_edge: Option<&crate::cypher::ast::EdgePattern> = None;

    for element in &pattern.elements {
        match element {
            PatternElement::Node(node_pattern) => {
                let node = resolve_or_create_node(node_pattern, &mut row, cx)?;
                if let Some(edge_pattern) = pending_edge.take() {
                    let left = previous.take().expect("edge follows a node");
                    let (src, dst) = match edge_pattern.direction {
                        PatternDirection::Out => (left.id, node.id),
                        PatternDirection::In => (node.id, left.id),
                        PatternDirection::Undirected => {
                            return Err(Error::Plan(
                                "creating an edge requires a direction".into(),
                            ));
                        }
                    };
                    let mut properties = PropertyMap::new();
                    for (key, expr) in &edge_pattern.properties {
                        let value = eval::evaluate(expr, &row, cx)?;
                        if !value.is_null() {
                            properties.insert(key.clone(), value);
                        }
                    }
                    let edge =
                        cx.txn
                            .create_edge(src, dst, &edge_pattern.types[0], properties)?;
                    cx.stats.edges_created += 1;
                    if let Some(var) = &edge_pattern.variable {
                        row.insert(var, Value::Edge(Box::new(edge)));
                    }
                }
                previous = Some(node);
            }
            PatternElement::Edge(edge_pattern) => {
                pending_edge = Some(edge_pattern);
            }
        }
    }
    Ok(row)
}

fn resolve_or_create_node<T: StoreTxn>(
    pattern: &crate::cypher::ast::NodePattern,
    row: &mut Binding,
    cx: &mut ExecContext<'_, T>,
) -> Result<NodeRef> {
    if let Some(var) = &pattern.variable {
        if let Some(value) = row.get(var) {
            return match value {
                Value::Node(node) => Ok((**node).clone()),
                other => Err(Error::Type {
                    expected: "NODE".into(),
                    got: other.type_name().into(),
                }),
            };
        }
    }

    let labels: Vec<String> = pattern.labels.first().cloned().unwrap_or_default();
    let mut properties = PropertyMap::new();
    for (key, expr) in &pattern.properties {
        let value = eval::evaluate(expr, row, cx)?;
        if !value.is_null() {
            properties.insert(key.clone(), value);
        }
    }
    let node = cx.txn.create_node(&labels, properties)?;
    cx.stats.nodes_created += 1;
    if let Some(var) = &pattern.variable {
        row.insert(var, Value::Node(Box::new(node.clone())));
    }
    Ok(node)
}

struct CreateStream<T: StoreTxn> {
    patterns: Vec<PatternPart>,
    input: Box<dyn RowStream<T>>,
}

impl<T: StoreTxn> RowStream<T> for CreateStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        let Some(mut row) = self.input.next(cx)? else {
            return Ok(None);
        };
        for pattern in &self.patterns {
            row = instantiate_pattern(pattern, &row, cx)?;
        }
        Ok(Some(row))
    }
}

struct MergeStream<T: StoreTxn> {
    pattern: PatternPart,
    match_ops: Vec<Op>,
    on_create: Vec<SetItem>,
    on_match: Vec<SetItem>,
    input: Box<dyn RowStream<T>>,
    pending: Vec<Binding>,
}

impl<T: StoreTxn> RowStream<T> for MergeStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        loop {
            if let Some(row) = self.pending.pop() {
                return Ok(Some(row));
            }
            let Some(base) = self.input.next(cx)? else {
                return Ok(None);
            };

            // Full scan of the candidate set; a NULL in the pattern's
            // property maps never matches and therefore forces a create.
            let matches = run_subquery(&self.match_ops, &base, cx, None)?;
            let mut rows = Vec::new();
            if matches.is_empty() {
                let mut created = instantiate_pattern(&self.pattern, &base, cx)?;
                created = apply_set_items(&self.on_create, created, cx)?;
                rows.push(created);
            } else {
                for matched in matches {
                    rows.push(apply_set_items(&self.on_match, matched, cx)?);
                }
            }
            rows.reverse();
            self.pending = rows;
        }
    }
}

/// Apply SET items against a row, routing the writes through the
/// transaction and re-binding updated handles so later reads in the same
/// query observe the new snapshots.
fn apply_set_items<T: StoreTxn>(
    items: &[SetItem],
    mut row: Binding,
    cx: &mut ExecContext<'_, T>,
) -> Result<Binding> {
    for item in items {
        match item {
            SetItem::Property { variable, key, value } => {
                let value = eval::evaluate(value, &row, cx)?;
                match row.get(variable).cloned() {
                    Some(Value::Node(node)) => {
                        if value.is_null() {
                            cx.txn.remove_node_property(node.id, key)?;
                        } else {
                            cx.txn.set_node_property(node.id, key, value)?;
                        }
                        cx.stats.properties_set += 1;
                        rebind_node(&mut row, variable, node.id, cx)?;
                    }
                    Some(Value::Edge(edge)) => {
                        if value.is_null() {
                            cx.txn.remove_edge_property(edge.id, key)?;
                        } else {
                            cx.txn.set_edge_property(edge.id, key, value)?;
                        }
                        cx.stats.properties_set += 1;
                        rebind_edge(&mut row, variable, edge.id, cx)?;
                    }
                    Some(Value::Null) | None => {}
                    Some(other) => {
                        return Err(Error::Type {
                            expected: "NODE or EDGE".into(),
                            got: other.type_name().into(),
                        });
                    }
                }
            }
            SetItem::AllProperties { variable, value }
            | SetItem::MergeProperties { variable, value } => {
                let replace = matches!(item, SetItem::AllProperties { .. });
                let value = eval::evaluate(value, &row, cx)?;
                let map = match value {
                    Value::Map(map) => map,
                    Value::Node(n) => n.properties.clone(),
                    Value::Edge(e) => e.properties.clone(),
                    Value::Null => continue,
                    other => {
                        return Err(Error::Type {
                            expected: "MAP".into(),
                            got: other.type_name().into(),
                        });
                    }
                };
                match row.get(variable).cloned() {
                    Some(Value::Node(node)) => {
                        if replace {
                            for key in node.properties.keys() {
                                cx.txn.remove_node_property(node.id, key)?;
                            }
                        }
                        for (key, value) in map {
                            if value.is_null() {
                                cx.txn.remove_node_property(node.id, &key)?;
                            } else {
                                cx.txn.set_node_property(node.id, &key, value)?;
                            }
                            cx.stats.properties_set += 1;
                        }
                        rebind_node(&mut row, variable, node.id, cx)?;
                    }
                    Some(Value::Edge(edge)) => {
                        if replace {
                            for key in edge.properties.keys() {
                                cx.txn.remove_edge_property(edge.id, key)?;
                            }
                        }
                        for (key, value) in map {
                            if value.is_null() {
                                cx.txn.remove_edge_property(edge.id, &key)?;
                            } else {
                                cx.txn.set_edge_property(edge.id, &key, value)?;
                            }
                            cx.stats.properties_set += 1;
                        }
                        rebind_edge(&mut row, variable, edge.id, cx)?;
                    }
                    Some(Value::Null) | None => {}
                    Some(other) => {
                        return Err(Error::Type {
                            expected: "NODE or EDGE".into(),
                            got: other.type_name().into(),
                        });
                    }
                }
            }
            SetItem::Labels { variable, labels } => match row.get(variable).cloned() {
                Some(Value::Node(node)) => {
                    for label in labels {
                        cx.txn.add_label(node.id, label)?;
                        cx.stats.labels_added += 1;
                    }
                    rebind_node(&mut row, variable, node.id, cx)?;
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(Error::Type {
                        expected: "NODE".into(),
                        got: other.type_name().into(),
                    });
                }
            },
        }
    }
    Ok(row)
}

fn rebind_node<T: StoreTxn>(
    row: &mut Binding,
    variable: &str,
    id: crate::model::NodeId,
    cx: &mut ExecContext<'_, T>,
) -> Result<()> {
    if let Some(node) = cx.txn.node(id)? {
        row.insert(variable, Value::Node(Box::new(node)));
    }
    Ok(())
}

fn rebind_edge<T: StoreTxn>(
    row: &mut Binding,
    variable: &str,
    id: crate::model::EdgeId,
    cx: &mut ExecContext<'_, T>,
) -> Result<()> {
    if let Some(edge) = cx.txn.edge(id)? {
        row.insert(variable, Value::Edge(Box::new(edge)));
    }
    Ok(())
}

struct SetStream<T: StoreTxn> {
    items: Vec<SetItem>,
    input: Box<dyn RowStream<T>>,
}

impl<T: StoreTxn> RowStream<T> for SetStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        let Some(row) = self.input.next(cx)? else {
            return Ok(None);
        };
        Ok(Some(apply_set_items(&self.items, row, cx)?))
    }
}

struct RemoveStream<T: StoreTxn> {
    items: Vec<RemoveItem>,
    input: Box<dyn RowStream<T>>,
}

impl<T: StoreTxn> RowStream<T> for RemoveStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        let Some(mut row) = self.input.next(cx)? else {
            return Ok(None);
        };
        for item in &self.items {
            match item {
                RemoveItem::Property { variable, key } => match row.get(variable).cloned() {
                    Some(Value::Node(node)) => {
                        cx.txn.remove_node_property(node.id, key)?;
                        cx.stats.properties_set += 1;
                        rebind_node(&mut row, variable, node.id, cx)?;
                    }
                    Some(Value::Edge(edge)) => {
                        cx.txn.remove_edge_property(edge.id, key)?;
                        cx.stats.properties_set += 1;
                        rebind_edge(&mut row, variable, edge.id, cx)?;
                    }
                    Some(Value::Null) | None => {}
                    Some(other) => {
                        return Err(Error::Type {
                            expected: "NODE or EDGE".into(),
                            got: other.type_name().into(),
                        });
                    }
                },
                RemoveItem::Labels { variable, labels } => match row.get(variable).cloned() {
                    Some(Value::Node(node)) => {
                        for label in labels {
                            cx.txn.remove_label(node.id, label)?;
                            cx.stats.labels_removed += 1;
                        }
                        rebind_node(&mut row, variable, node.id, cx)?;
                    }
                    Some(Value::Null) | None => {}
                    Some(other) => {
                        return Err(Error::Type {
                            expected: "NODE".into(),
                            got: other.type_name().into(),
                        });
                    }
                },
            }
        }
        Ok(Some(row))
    }
}

struct DeleteStream<T: StoreTxn> {
    vars: Vec<String>,
    detach: bool,
    input: Box<dyn RowStream<T>>,
}

impl<T: StoreTxn> RowStream<T> for DeleteStream<T> {
    fn next(&mut self, cx: &mut ExecContext<'_, T>) -> Result<Option<Binding>> {
        let Some(row) = self.input.next(cx)? else {
            return Ok(None);
        };
        for var in &self.vars {
            match row.get(var) {
                Some(Value::Node(node)) => delete_node(node.id, self.detach, cx)?,
                Some(Value::Edge(edge)) => delete_edge(edge.id, cx)?,
                Some(Value::Path(path)) => {
                    for edge in path.edges() {
                        delete_edge(edge.id, cx)?;
                    }
                    for node in path.nodes() {
                        delete_node(node.id, self.detach, cx)?;
                    }
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(Error::Type {
                        expected: "NODE, EDGE, or PATH".into(),
                        got: other.type_name().into(),
                    });
                }
            }
        }
        Ok(Some(row))
    }
}

fn delete_node<T: StoreTxn>(
    id: crate::model::NodeId,
    detach: bool,
    cx: &mut ExecContext<'_, T>,
) -> Result<()> {
    if cx.txn.node(id)?.is_none() {
        return Ok(());
    }
    if detach {
        let incident = cx.txn.incident_edges(id, Direction::Undirected, &[])?.len();
        cx.txn.detach_delete_node(id)?;
        cx.stats.edges_deleted += incident as u64;
    } else {
        cx.txn.delete_node(id)?;
    }
    cx.stats.nodes_deleted += 1;
    Ok(())
}

fn delete_edge<T: StoreTxn>(id: crate::model::EdgeId, cx: &mut ExecContext<'_, T>) -> Result<()> {
    if cx.txn.edge(id)?.is_none() {
        return Ok(());
    }
    cx.txn.delete_edge(id)?;
    cx.stats.edges_deleted += 1;
    Ok(())
}
