//! Query planner — translates the AST into a linear operator pipeline.
//!
//! One pipeline per query; `UNION` produces a `Union` operator whose
//! branches are full pipelines. `WITH` is a pipeline boundary: accumulated
//! operators are flushed, a `With` operator carries the projection and its
//! modifiers, and planning continues in a fresh scope inherited from the
//! projection.
//!
//! Subquery expressions (EXISTS/COUNT blocks, pattern predicates, pattern
//! comprehensions) are lowered here, once, into the plan's subquery
//! catalog; the evaluator re-runs those pipelines per row without
//! re-planning.

pub mod ops;

use tracing::debug;

use crate::cypher::ast::{
    Clause, Expr, NodePattern, OrderItem, PatternElement, PatternPart, Projection, Query,
    SingleQuery, SubqueryKind,
};
use crate::{Error, Result};
use ops::{collect_expr_vars, Hop, Op, Plan, ProjectItem, SubPlan};

/// Cap applied to unbounded variable-length patterns (`*` / `*2..`).
/// Edge-uniqueness already bounds every enumeration; this keeps cost
/// estimates finite.
pub const DEFAULT_MAX_HOPS: u32 = 100;

const AGGREGATE_FUNCTIONS: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "collect",
    "stdev",
    "stdevp",
    "percentiledisc",
    "percentilecont",
];

pub fn is_aggregate_function(name: &str) -> bool {
    AGGREGATE_FUNCTIONS.contains(&name.to_lowercase().as_str())
}

/// Translate a parsed query into a plan.
pub fn plan(query: &Query) -> Result<Plan> {
    let mut cx = PlannerCtx::default();

    let first_ops = plan_single(&query.first, &mut cx)?;

    let plan = if query.unions.is_empty() {
        Plan {
            ops: first_ops,
            subqueries: cx.subqueries,
        }
    } else {
        let first_cols = pipeline_columns(&first_ops);
        let mut branches = vec![first_ops];
        let mut all_flags = Vec::new();
        for (all, branch) in &query.unions {
            all_flags.push(*all);
            let branch_ops = plan_single(branch, &mut cx)?;
            let cols = pipeline_columns(&branch_ops);
            if cols != first_cols {
                return Err(Error::Plan(format!(
                    "UNION branches must return the same columns: {first_cols:?} vs {cols:?}"
                )));
            }
            branches.push(branch_ops);
        }
        if all_flags.iter().any(|a| *a != all_flags[0]) {
            return Err(Error::Plan(
                "cannot mix UNION and UNION ALL in one query".into(),
            ));
        }
        Plan {
            ops: vec![Op::Union {
                branches,
                all: all_flags[0],
            }],
            subqueries: cx.subqueries,
        }
    };

    debug!(operators = plan.ops.len(), subqueries = plan.subqueries.len(), "query planned");
    Ok(plan)
}

/// Result column names of a pipeline: the names of its last projecting
/// operator. Empty for write-only pipelines.
pub fn pipeline_columns(ops: &[Op]) -> Vec<String> {
    let mut columns = Vec::new();
    for op in ops {
        match op {
            Op::Project { items, .. } | Op::Aggregate { items, .. } | Op::With { items, .. } => {
                columns = items.iter().map(|i| i.name.clone()).collect();
            }
            Op::Union { branches, .. } => {
                if let Some(first) = branches.first() {
                    columns = pipeline_columns(first);
                }
            }
            _ => {}
        }
    }
    columns
}

// ============================================================================
// Planner context and scope
// ============================================================================

#[derive(Default)]
struct PlannerCtx {
    anon_counter: usize,
    subqueries: Vec<SubPlan>,
}

impl PlannerCtx {
    fn fresh_var(&mut self) -> String {
        let name = format!("#anon{}", self.anon_counter);
        self.anon_counter += 1;
        name
    }
}

/// Variables visible at the current point of the pipeline, in binding
/// order. Anonymous variables carry a `#` prefix and are hidden from
/// `RETURN *`.
#[derive(Debug, Clone, Default)]
struct Scope {
    vars: Vec<String>,
}

impl Scope {
    fn bound(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v == name)
    }

    fn add(&mut self, name: &str) {
        if !self.bound(name) {
            self.vars.push(name.to_string());
        }
    }

    fn visible(&self) -> impl Iterator<Item = &String> {
        self.vars.iter().filter(|v| !v.starts_with('#'))
    }

    fn reset_to(&mut self, names: impl IntoIterator<Item = String>) {
        self.vars = names.into_iter().collect();
    }
}

// ============================================================================
// Clause translation
// ============================================================================

fn plan_single(query: &SingleQuery, cx: &mut PlannerCtx) -> Result<Vec<Op>> {
    let mut ops = Vec::new();
    let mut scope = Scope::default();

    for (index, clause) in query.clauses.iter().enumerate() {
        if matches!(clause, Clause::Return(_)) && index + 1 != query.clauses.len() {
            return Err(Error::Plan("RETURN must be the final clause".into()));
        }
        match clause {
            Clause::Match {
                optional,
                patterns,
                where_clause,
            } => {
                for pattern in patterns {
                    translate_pattern(pattern, *optional, &mut ops, &mut scope, cx)?;
                }
                if let Some(pred) = where_clause {
                    if contains_aggregate(pred) {
                        return Err(Error::Plan(
                            "aggregate functions are not allowed in WHERE".into(),
                        ));
                    }
                    let pred = rewrite_subqueries(pred.clone(), &scope, cx)?;
                    validate_expr(&pred, &scope)?;
                    ops.push(Op::Filter { predicate: pred });
                }
            }

            Clause::Unwind { expr, variable } => {
                let expr = rewrite_subqueries(expr.clone(), &scope, cx)?;
                validate_expr(&expr, &scope)?;
                ops.push(Op::Unwind {
                    expr,
                    var: variable.clone(),
                });
                scope.add(variable);
            }

            Clause::With(projection) => {
                plan_projection(projection, true, &mut ops, &mut scope, cx)?;
            }
            Clause::Return(projection) => {
                plan_projection(projection, false, &mut ops, &mut scope, cx)?;
            }

            Clause::Create { patterns } => {
                for pattern in patterns {
                    validate_create_pattern(pattern, &scope)?;
                }
                let rewritten = patterns
                    .iter()
                    .map(|p| rewrite_pattern_exprs(p.clone(), &scope, cx))
                    .collect::<Result<Vec<_>>>()?;
                for pattern in &rewritten {
                    bind_pattern_vars(pattern, &mut scope);
                }
                ops.push(Op::Create { patterns: rewritten });
            }

            Clause::Merge {
                pattern,
                on_create,
                on_match,
            } => {
                validate_create_pattern(pattern, &scope)?;
                let pattern = rewrite_pattern_exprs(pattern.clone(), &scope, cx)?;
                let mut match_ops = Vec::new();
                let mut match_scope = scope.clone();
                translate_pattern(&pattern, false, &mut match_ops, &mut match_scope, cx)?;
                bind_pattern_vars(&pattern, &mut scope);
                for item in on_create.iter().chain(on_match.iter()) {
                    validate_set_item(item, &scope)?;
                }
                ops.push(Op::Merge {
                    pattern,
                    match_ops,
                    on_create: on_create.clone(),
                    on_match: on_match.clone(),
                });
            }

            Clause::Set { items } => {
                for item in items {
                    validate_set_item(item, &scope)?;
                }
                ops.push(Op::SetProps {
                    items: items.clone(),
                });
            }

            Clause::Remove { items } => {
                for item in items {
                    let var = match item {
                        crate::cypher::ast::RemoveItem::Property { variable, .. }
                        | crate::cypher::ast::RemoveItem::Labels { variable, .. } => variable,
                    };
                    if !scope.bound(var) {
                        return Err(unresolved(var));
                    }
                }
                ops.push(Op::Remove {
                    items: items.clone(),
                });
            }

            Clause::Delete { variables, detach } => {
                for var in variables {
                    if !scope.bound(var) {
                        return Err(unresolved(var));
                    }
                }
                ops.push(Op::Delete {
                    vars: variables.clone(),
                    detach: *detach,
                });
            }
        }
    }

    Ok(ops)
}

fn unresolved(var: &str) -> Error {
    Error::Plan(format!("variable `{var}` is not defined"))
}

// ============================================================================
// RETURN / WITH
// ============================================================================

fn plan_projection(
    projection: &Projection,
    is_with: bool,
    ops: &mut Vec<Op>,
    scope: &mut Scope,
    cx: &mut PlannerCtx,
) -> Result<()> {
    // Expand `*` to the visible variables, then append explicit items.
    let mut items: Vec<ProjectItem> = Vec::new();
    if projection.star {
        for var in scope.visible() {
            items.push(ProjectItem {
                expr: Expr::Variable(var.clone()),
                name: var.clone(),
            });
        }
        if items.is_empty() {
            return Err(Error::Plan("`*` with no variables in scope".into()));
        }
    }
    for item in &projection.items {
        let expr = rewrite_subqueries(item.expr.clone(), scope, cx)?;
        validate_expr(&expr, scope)?;
        let name = item
            .alias
            .clone()
            .unwrap_or_else(|| item.expr.column_name());
        items.push(ProjectItem { expr, name });
    }

    let has_aggregate = items.iter().any(|i| contains_aggregate(&i.expr));

    // Validate and rewrite the modifiers against the post-projection scope.
    let new_names: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
    let mut post_scope = Scope::default();
    post_scope.reset_to(new_names.clone());

    let sort_items = projection
        .order_by
        .iter()
        .map(|item| {
            let expr = rewrite_subqueries(item.expr.clone(), scope, cx)?;
            validate_sort_expr(&expr, scope, &post_scope)?;
            Ok(OrderItem {
                expr,
                ascending: item.ascending,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let skip = projection.skip.clone();
    let limit = projection.limit.clone();
    let where_clause = projection
        .where_clause
        .as_ref()
        .map(|pred| {
            if contains_aggregate(pred) {
                return Err(Error::Plan(
                    "aggregate functions are not allowed in WHERE".into(),
                ));
            }
            let pred = rewrite_subqueries(pred.clone(), &post_scope, cx)?;
            validate_expr(&pred, &post_scope)?;
            Ok(pred)
        })
        .transpose()?;

    if has_aggregate {
        let mut grouping = Vec::new();
        let mut aggregates = Vec::new();
        for item in &items {
            if contains_aggregate(&item.expr) {
                collect_aggregate_calls(&item.expr, &mut aggregates)?;
            } else {
                grouping.push(item.clone());
            }
        }
        for sort in &sort_items {
            if contains_aggregate(&sort.expr) {
                collect_aggregate_calls(&sort.expr, &mut aggregates)?;
            }
        }
        ops.push(Op::Aggregate {
            grouping,
            aggregates,
            items: items.clone(),
        });
        if is_with {
            let identity = new_names
                .iter()
                .map(|n| ProjectItem {
                    expr: Expr::Variable(n.clone()),
                    name: n.clone(),
                })
                .collect();
            ops.push(Op::With {
                items: identity,
                distinct: projection.distinct,
                predicate: where_clause,
                sort: sort_items,
                skip,
                limit,
            });
        } else {
            if projection.distinct {
                let identity = new_names
                    .iter()
                    .map(|n| ProjectItem {
                        expr: Expr::Variable(n.clone()),
                        name: n.clone(),
                    })
                    .collect();
                ops.push(Op::Project {
                    items: identity,
                    distinct: true,
                });
            }
            push_paging(ops, sort_items, skip, limit);
        }
    } else if is_with {
        ops.push(Op::With {
            items,
            distinct: projection.distinct,
            predicate: where_clause,
            sort: sort_items,
            skip,
            limit,
        });
    } else {
        ops.push(Op::Project {
            items,
            distinct: projection.distinct,
        });
        push_paging(ops, sort_items, skip, limit);
    }

    scope.reset_to(new_names);
    Ok(())
}

fn push_paging(ops: &mut Vec<Op>, sort: Vec<OrderItem>, skip: Option<Expr>, limit: Option<Expr>) {
    if !sort.is_empty() {
        ops.push(Op::Sort { items: sort });
    }
    if let Some(count) = skip {
        ops.push(Op::Skip { count });
    }
    if let Some(count) = limit {
        ops.push(Op::Limit { count });
    }
}

// ============================================================================
// Pattern translation
// ============================================================================

fn translate_pattern(
    part: &PatternPart,
    optional: bool,
    ops: &mut Vec<Op>,
    scope: &mut Scope,
    cx: &mut PlannerCtx,
) -> Result<()> {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for element in &part.elements {
        match element {
            PatternElement::Node(n) => nodes.push(n),
            PatternElement::Edge(e) => edges.push(e),
        }
    }

    let has_var_length = edges.iter().any(|e| e.hops.is_some());
    let path_var = part.variable.clone();
    if path_var.is_some() && has_var_length && edges.len() > 1 {
        return Err(Error::Plan(
            "path variables over mixed fixed/variable-length patterns are not supported".into(),
        ));
    }

    // Resolve node variables up front (anonymous positions get fresh names).
    let node_vars: Vec<String> = nodes
        .iter()
        .map(|n| n.variable.clone().unwrap_or_else(|| cx.fresh_var()))
        .collect();

    // Anchor the component on the first node.
    let anchor = &nodes[0];
    let anchor_var = &node_vars[0];
    let anchor_pred = node_match_predicate(anchor, anchor_var, scope, cx)?;
    if scope.bound(anchor_var) {
        if optional {
            ops.push(Op::OptionalScanNodes {
                var: anchor_var.clone(),
                labels: anchor.labels.clone(),
                predicate: anchor_pred,
            });
        } else if !anchor.labels.is_empty() || anchor_pred.is_some() {
            let mut conjuncts = Vec::new();
            if !anchor.labels.is_empty() {
                conjuncts.push(Expr::HasLabel {
                    expr: Box::new(Expr::Variable(anchor_var.clone())),
                    labels: anchor.labels.clone(),
                });
            }
            if let Some(pred) = anchor_pred {
                conjuncts.push(pred);
            }
            if let Some(predicate) = and_all(conjuncts) {
                ops.push(Op::Filter { predicate });
            }
        }
    } else {
        scope.add(anchor_var);
        if optional {
            ops.push(Op::OptionalScanNodes {
                var: anchor_var.clone(),
                labels: anchor.labels.clone(),
                predicate: anchor_pred,
            });
        } else {
            ops.push(Op::ScanNodes {
                var: anchor_var.clone(),
                labels: anchor.labels.clone(),
                predicate: anchor_pred,
            });
        }
    }

    if edges.is_empty() {
        if let Some(pv) = path_var {
            // A single-node path binding: zero-hop multi-hop expansion.
            ops.push(Op::ExpandMultiHop {
                src_var: anchor_var.clone(),
                hops: Vec::new(),
                path_var: Some(pv.clone()),
            });
            scope.add(&pv);
        }
        return Ok(());
    }

    // Fixed-length chains collapse to one ExpandMultiHop when the pattern
    // binds a path variable, or when it is at least two hops and some hop
    // has no user-visible edge variable.
    let all_dsts_fresh = node_vars[1..].iter().all(|v| !scope.bound(v));
    let collapse = !optional
        && !has_var_length
        && all_dsts_fresh
        && (path_var.is_some()
            || (edges.len() >= 2 && edges.iter().any(|e| e.variable.is_none())));

    if collapse {
        let mut hops = Vec::new();
        for (i, edge) in edges.iter().enumerate() {
            let dst = nodes[i + 1];
            let dst_var = &node_vars[i + 1];
            let mut conjuncts = Vec::new();
            if let Some(pred) = edge_match_predicate(edge, scope, cx)? {
                conjuncts.push(pred);
            }
            if let Some(pred) = dst_node_predicate(dst, dst_var, scope, cx)? {
                conjuncts.push(pred);
            }
            hops.push(Hop {
                edge_var: edge.variable.clone(),
                dst_var: dst_var.clone(),
                edge_types: edge.types.clone(),
                direction: edge.direction,
                predicate: and_all(conjuncts),
            });
            scope.add(dst_var);
            if let Some(e) = &edge.variable {
                scope.add(e);
            }
        }
        ops.push(Op::ExpandMultiHop {
            src_var: anchor_var.clone(),
            hops,
            path_var: path_var.clone(),
        });
        if let Some(pv) = path_var {
            scope.add(&pv);
        }
        return Ok(());
    }

    // General case: one expand operator per hop.
    for (i, edge) in edges.iter().enumerate() {
        let src_var = node_vars[i].clone();
        let dst = nodes[i + 1];
        let dst_var = node_vars[i + 1].clone();

        let edge_predicate = edge_match_predicate(edge, scope, cx)?;
        let node_predicate = dst_node_predicate(dst, &dst_var, scope, cx)?;
        let predicate = and_all(
            edge_predicate
                .clone()
                .into_iter()
                .chain(node_predicate.clone())
                .collect(),
        );

        if let Some(hops) = edge.hops {
            ops.push(Op::ExpandVariableLength {
                src_var,
                edge_var: edge.variable.clone(),
                dst_var: dst_var.clone(),
                edge_types: edge.types.clone(),
                direction: edge.direction,
                min_hops: hops.min.unwrap_or(1),
                max_hops: hops.max.unwrap_or(DEFAULT_MAX_HOPS),
                path_var: path_var.clone(),
                edge_predicate,
                node_predicate,
                optional,
            });
            if let Some(pv) = &path_var {
                scope.add(pv);
            }
        } else if optional {
            ops.push(Op::OptionalExpandEdges {
                src_var,
                edge_var: edge.variable.clone(),
                dst_var: dst_var.clone(),
                edge_types: edge.types.clone(),
                direction: edge.direction,
                predicate,
            });
        } else {
            ops.push(Op::ExpandEdges {
                src_var,
                edge_var: edge.variable.clone(),
                dst_var: dst_var.clone(),
                edge_types: edge.types.clone(),
                direction: edge.direction,
                predicate,
            });
        }

        scope.add(&dst_var);
        if let Some(e) = &edge.variable {
            scope.add(e);
        }
    }

    Ok(())
}

/// Inline property/predicate conjunction for a scanned node.
fn node_match_predicate(
    node: &NodePattern,
    var: &str,
    scope: &Scope,
    cx: &mut PlannerCtx,
) -> Result<Option<Expr>> {
    let mut conjuncts = Vec::new();
    for (key, value) in &node.properties {
        conjuncts.push(property_equals(var, key, value.clone()));
    }
    if let Some(pred) = &node.predicate {
        conjuncts.push(pred.clone());
    }
    let combined = and_all(conjuncts);
    combined
        .map(|expr| {
            let mut inner_scope = scope.clone();
            inner_scope.add(var);
            let expr = rewrite_subqueries(expr, &inner_scope, cx)?;
            validate_expr(&expr, &inner_scope)?;
            Ok(expr)
        })
        .transpose()
}

/// Match conditions a destination node contributes to its introducing
/// expand: label membership, inline properties, inline predicate.
fn dst_node_predicate(
    node: &NodePattern,
    var: &str,
    scope: &Scope,
    cx: &mut PlannerCtx,
) -> Result<Option<Expr>> {
    let mut conjuncts = Vec::new();
    if !node.labels.is_empty() {
        conjuncts.push(Expr::HasLabel {
            expr: Box::new(Expr::Variable(var.to_string())),
            labels: node.labels.clone(),
        });
    }
    for (key, value) in &node.properties {
        conjuncts.push(property_equals(var, key, value.clone()));
    }
    if let Some(pred) = &node.predicate {
        conjuncts.push(pred.clone());
    }
    let combined = and_all(conjuncts);
    combined
        .map(|expr| {
            let mut inner_scope = scope.clone();
            inner_scope.add(var);
            let expr = rewrite_subqueries(expr, &inner_scope, cx)?;
            validate_expr(&expr, &inner_scope)?;
            Ok(expr)
        })
        .transpose()
}

fn edge_match_predicate(
    edge: &crate::cypher::ast::EdgePattern,
    scope: &Scope,
    cx: &mut PlannerCtx,
) -> Result<Option<Expr>> {
    let Some(var) = edge
        .variable
        .clone()
        .or_else(|| (!edge.properties.is_empty() || edge.predicate.is_some()).then(|| String::new()))
    else {
        return Ok(None);
    };
    // Anonymous edges with match conditions need a name the predicate can
    // reference; the executor binds `#edge` transiently for that purpose.
    let var = if var.is_empty() { "#edge".to_string() } else { var };

    let mut conjuncts = Vec::new();
    for (key, value) in &edge.properties {
        conjuncts.push(property_equals(&var, key, value.clone()));
    }
    if let Some(pred) = &edge.predicate {
        conjuncts.push(pred.clone());
    }
    let combined = and_all(conjuncts);
    combined
        .map(|expr| {
            let mut inner_scope = scope.clone();
            inner_scope.add(&var);
            let expr = rewrite_subqueries(expr, &inner_scope, cx)?;
            validate_expr(&expr, &inner_scope)?;
            Ok(expr)
        })
        .transpose()
}

fn property_equals(var: &str, key: &str, value: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(Expr::Property {
            expr: Box::new(Expr::Variable(var.to_string())),
            key: key.to_string(),
        }),
        op: crate::cypher::ast::BinaryOp::Eq,
        right: Box::new(value),
    }
}

fn and_all(mut conjuncts: Vec<Expr>) -> Option<Expr> {
    let mut result = conjuncts.pop()?;
    while let Some(next) = conjuncts.pop() {
        result = Expr::Binary {
            left: Box::new(next),
            op: crate::cypher::ast::BinaryOp::And,
            right: Box::new(result),
        };
    }
    Some(result)
}

fn bind_pattern_vars(part: &PatternPart, scope: &mut Scope) {
    for node in part.nodes() {
        if let Some(v) = &node.variable {
            scope.add(v);
        }
    }
    for edge in part.edges() {
        if let Some(v) = &edge.variable {
            scope.add(v);
        }
    }
    if let Some(v) = &part.variable {
        scope.add(v);
    }
}

/// Shared shape checks for patterns that may create entities (CREATE and
/// MERGE): no variable-length hops, a direction and exactly one type per
/// edge, no path variables.
fn validate_create_pattern(part: &PatternPart, _scope: &Scope) -> Result<()> {
    for edge in part.edges() {
        if edge.hops.is_some() {
            return Err(Error::Plan(
                "variable-length patterns cannot be created".into(),
            ));
        }
        if edge.direction == crate::cypher::ast::PatternDirection::Undirected {
            return Err(Error::Plan(
                "creating an edge requires a direction".into(),
            ));
        }
        if edge.types.len() != 1 {
            return Err(Error::Plan(
                "creating an edge requires exactly one type".into(),
            ));
        }
    }
    for node in part.nodes() {
        if node.labels.len() > 1 {
            return Err(Error::Plan(
                "label alternation is not allowed in write patterns".into(),
            ));
        }
    }
    if part.variable.is_some() {
        return Err(Error::Plan(
            "path variables are not supported in write patterns".into(),
        ));
    }
    Ok(())
}

fn validate_set_item(item: &crate::cypher::ast::SetItem, scope: &Scope) -> Result<()> {
    use crate::cypher::ast::SetItem;
    let var = match item {
        SetItem::Property { variable, .. }
        | SetItem::AllProperties { variable, .. }
        | SetItem::MergeProperties { variable, .. }
        | SetItem::Labels { variable, .. } => variable,
    };
    if !scope.bound(var) {
        return Err(unresolved(var));
    }
    Ok(())
}

/// Rewrite property expressions inside a pattern (CREATE/MERGE) so any
/// subquery expressions are lowered before execution.
fn rewrite_pattern_exprs(
    mut part: PatternPart,
    scope: &Scope,
    cx: &mut PlannerCtx,
) -> Result<PatternPart> {
    for element in &mut part.elements {
        match element {
            PatternElement::Node(node) => {
                for (_, value) in &mut node.properties {
                    *value = rewrite_subqueries(value.clone(), scope, cx)?;
                }
            }
            PatternElement::Edge(edge) => {
                for (_, value) in &mut edge.properties {
                    *value = rewrite_subqueries(value.clone(), scope, cx)?;
                }
            }
        }
    }
    Ok(part)
}

// ============================================================================
// Expression validation and aggregate detection
// ============================================================================

fn validate_expr(expr: &Expr, scope: &Scope) -> Result<()> {
    let mut vars = Vec::new();
    collect_expr_vars(expr, &mut vars);
    for var in vars {
        if !scope.bound(var) {
            return Err(unresolved(var));
        }
    }
    Ok(())
}

/// Sort expressions may resolve either against the post-projection scope
/// (aliases, including aliases of aggregates) or as an expression over
/// still-projected variables.
fn validate_sort_expr(expr: &Expr, pre: &Scope, post: &Scope) -> Result<()> {
    if post.bound(&expr.column_name()) {
        return Ok(());
    }
    if validate_expr(expr, post).is_ok() {
        return Ok(());
    }
    if contains_aggregate(expr) {
        // Aggregated sort keys are computed by the Aggregate operator.
        return validate_expr_ignoring_aggregates(expr, pre);
    }
    validate_expr(expr, pre)
}

fn validate_expr_ignoring_aggregates(expr: &Expr, scope: &Scope) -> Result<()> {
    if let Expr::FunctionCall { name, .. } = expr {
        if is_aggregate_function(name) {
            return Ok(());
        }
    }
    validate_expr(expr, scope)
}

pub fn contains_aggregate(expr: &Expr) -> bool {
    match expr {
        Expr::FunctionCall { name, args, .. } => {
            is_aggregate_function(name) || args.iter().any(contains_aggregate)
        }
        Expr::Property { expr, .. }
        | Expr::Unary { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::HasLabel { expr, .. } => contains_aggregate(expr),
        Expr::Binary { left, right, .. } => contains_aggregate(left) || contains_aggregate(right),
        Expr::In { expr, list } => contains_aggregate(expr) || contains_aggregate(list),
        Expr::StringMatch { left, right, .. } => {
            contains_aggregate(left) || contains_aggregate(right)
        }
        Expr::List(items) => items.iter().any(contains_aggregate),
        Expr::Map(entries) => entries.iter().any(|(_, v)| contains_aggregate(v)),
        Expr::Index { expr, index } => contains_aggregate(expr) || contains_aggregate(index),
        Expr::Slice { expr, start, end } => {
            contains_aggregate(expr)
                || start.as_deref().is_some_and(contains_aggregate)
                || end.as_deref().is_some_and(contains_aggregate)
        }
        Expr::Case { operand, whens, else_expr } => {
            operand.as_deref().is_some_and(contains_aggregate)
                || whens
                    .iter()
                    .any(|(w, t)| contains_aggregate(w) || contains_aggregate(t))
                || else_expr.as_deref().is_some_and(contains_aggregate)
        }
        _ => false,
    }
}

/// Collect the aggregate function calls of an expression (deduplicated
/// structurally). Nested aggregates are a plan error.
fn collect_aggregate_calls(expr: &Expr, out: &mut Vec<Expr>) -> Result<()> {
    match expr {
        Expr::FunctionCall { name, args, .. } if is_aggregate_function(name) => {
            if args.iter().any(contains_aggregate) {
                return Err(Error::Plan(format!(
                    "aggregate function {name}() cannot contain another aggregate"
                )));
            }
            if !out.contains(expr) {
                out.push(expr.clone());
            }
            Ok(())
        }
        Expr::FunctionCall { args, .. } => {
            for arg in args {
                collect_aggregate_calls(arg, out)?;
            }
            Ok(())
        }
        Expr::Property { expr, .. }
        | Expr::Unary { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::HasLabel { expr, .. } => collect_aggregate_calls(expr, out),
        Expr::Binary { left, right, .. } => {
            collect_aggregate_calls(left, out)?;
            collect_aggregate_calls(right, out)
        }
        Expr::In { expr, list } => {
            collect_aggregate_calls(expr, out)?;
            collect_aggregate_calls(list, out)
        }
        Expr::StringMatch { left, right, .. } => {
            collect_aggregate_calls(left, out)?;
            collect_aggregate_calls(right, out)
        }
        Expr::List(items) => {
            for item in items {
                collect_aggregate_calls(item, out)?;
            }
            Ok(())
        }
        Expr::Map(entries) => {
            for (_, value) in entries {
                collect_aggregate_calls(value, out)?;
            }
            Ok(())
        }
        Expr::Case { operand, whens, else_expr } => {
            if let Some(op) = operand {
                collect_aggregate_calls(op, out)?;
            }
            for (when, then) in whens {
                collect_aggregate_calls(when, out)?;
                collect_aggregate_calls(then, out)?;
            }
            if let Some(e) = else_expr {
                collect_aggregate_calls(e, out)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Subquery lowering
// ============================================================================

fn rewrite_subqueries(expr: Expr, scope: &Scope, cx: &mut PlannerCtx) -> Result<Expr> {
    Ok(match expr {
        Expr::ExistsSubquery(sub) => {
            let id = lower_pattern_subquery(&sub.patterns, sub.where_clause.as_ref(), None, SubqueryKind::Exists, scope, cx)?;
            Expr::Subquery {
                id,
                kind: SubqueryKind::Exists,
            }
        }
        Expr::CountSubquery(sub) => {
            let id = lower_pattern_subquery(&sub.patterns, sub.where_clause.as_ref(), None, SubqueryKind::Count, scope, cx)?;
            Expr::Subquery {
                id,
                kind: SubqueryKind::Count,
            }
        }
        Expr::PatternPredicate(pattern) => {
            let patterns = vec![(*pattern).clone()];
            let id = lower_pattern_subquery(&patterns, None, None, SubqueryKind::Exists, scope, cx)?;
            Expr::Subquery {
                id,
                kind: SubqueryKind::Exists,
            }
        }
        Expr::PatternComprehension {
            pattern,
            predicate,
            projection,
        } => {
            let patterns = vec![(*pattern).clone()];
            let id = lower_pattern_subquery(
                &patterns,
                predicate.as_deref(),
                Some(&projection),
                SubqueryKind::Collect,
                scope,
                cx,
            )?;
            Expr::Subquery {
                id,
                kind: SubqueryKind::Collect,
            }
        }

        // Structural recursion for everything else.
        Expr::Property { expr, key } => Expr::Property {
            expr: Box::new(rewrite_subqueries(*expr, scope, cx)?),
            key,
        },
        Expr::HasLabel { expr, labels } => Expr::HasLabel {
            expr: Box::new(rewrite_subqueries(*expr, scope, cx)?),
            labels,
        },
        Expr::Binary { left, op, right } => Expr::Binary {
            left: Box::new(rewrite_subqueries(*left, scope, cx)?),
            op,
            right: Box::new(rewrite_subqueries(*right, scope, cx)?),
        },
        Expr::Unary { op, expr } => Expr::Unary {
            op,
            expr: Box::new(rewrite_subqueries(*expr, scope, cx)?),
        },
        Expr::IsNull { expr, negated } => Expr::IsNull {
            expr: Box::new(rewrite_subqueries(*expr, scope, cx)?),
            negated,
        },
        Expr::In { expr, list } => Expr::In {
            expr: Box::new(rewrite_subqueries(*expr, scope, cx)?),
            list: Box::new(rewrite_subqueries(*list, scope, cx)?),
        },
        Expr::StringMatch { left, op, right } => Expr::StringMatch {
            left: Box::new(rewrite_subqueries(*left, scope, cx)?),
            op,
            right: Box::new(rewrite_subqueries(*right, scope, cx)?),
        },
        Expr::FunctionCall { name, args, distinct } => Expr::FunctionCall {
            name,
            args: args
                .into_iter()
                .map(|a| rewrite_subqueries(a, scope, cx))
                .collect::<Result<_>>()?,
            distinct,
        },
        Expr::List(items) => Expr::List(
            items
                .into_iter()
                .map(|i| rewrite_subqueries(i, scope, cx))
                .collect::<Result<_>>()?,
        ),
        Expr::Map(entries) => Expr::Map(
            entries
                .into_iter()
                .map(|(k, v)| Ok((k, rewrite_subqueries(v, scope, cx)?)))
                .collect::<Result<_>>()?,
        ),
        Expr::Index { expr, index } => Expr::Index {
            expr: Box::new(rewrite_subqueries(*expr, scope, cx)?),
            index: Box::new(rewrite_subqueries(*index, scope, cx)?),
        },
        Expr::Slice { expr, start, end } => Expr::Slice {
            expr: Box::new(rewrite_subqueries(*expr, scope, cx)?),
            start: start
                .map(|s| Ok::<_, Error>(Box::new(rewrite_subqueries(*s, scope, cx)?)))
                .transpose()?,
            end: end
                .map(|e| Ok::<_, Error>(Box::new(rewrite_subqueries(*e, scope, cx)?)))
                .transpose()?,
        },
        Expr::ListComprehension {
            variable,
            list,
            predicate,
            projection,
        } => {
            let mut inner_scope = scope.clone();
            inner_scope.add(&variable);
            Expr::ListComprehension {
                list: Box::new(rewrite_subqueries(*list, scope, cx)?),
                predicate: predicate
                    .map(|p| Ok::<_, Error>(Box::new(rewrite_subqueries(*p, &inner_scope, cx)?)))
                    .transpose()?,
                projection: projection
                    .map(|p| Ok::<_, Error>(Box::new(rewrite_subqueries(*p, &inner_scope, cx)?)))
                    .transpose()?,
                variable,
            }
        }
        Expr::Quantified {
            quantifier,
            variable,
            list,
            predicate,
        } => {
            let mut inner_scope = scope.clone();
            inner_scope.add(&variable);
            Expr::Quantified {
                quantifier,
                list: Box::new(rewrite_subqueries(*list, scope, cx)?),
                predicate: Box::new(rewrite_subqueries(*predicate, &inner_scope, cx)?),
                variable,
            }
        }
        Expr::Case {
            operand,
            whens,
            else_expr,
        } => Expr::Case {
            operand: operand
                .map(|o| Ok::<_, Error>(Box::new(rewrite_subqueries(*o, scope, cx)?)))
                .transpose()?,
            whens: whens
                .into_iter()
                .map(|(w, t)| {
                    Ok((
                        rewrite_subqueries(w, scope, cx)?,
                        rewrite_subqueries(t, scope, cx)?,
                    ))
                })
                .collect::<Result<_>>()?,
            else_expr: else_expr
                .map(|e| Ok::<_, Error>(Box::new(rewrite_subqueries(*e, scope, cx)?)))
                .transpose()?,
        },

        leaf @ (Expr::Literal(_)
        | Expr::Variable(_)
        | Expr::Parameter(_)
        | Expr::Subquery { .. }) => leaf,
    })
}

/// Plan a pattern subquery into the catalog and return its id.
fn lower_pattern_subquery(
    patterns: &[PatternPart],
    where_clause: Option<&Expr>,
    projection: Option<&Expr>,
    kind: SubqueryKind,
    scope: &Scope,
    cx: &mut PlannerCtx,
) -> Result<usize> {
    let mut sub_ops = Vec::new();
    let mut sub_scope = scope.clone();
    for pattern in patterns {
        translate_pattern(pattern, false, &mut sub_ops, &mut sub_scope, cx)?;
    }
    if let Some(pred) = where_clause {
        let pred = rewrite_subqueries(pred.clone(), &sub_scope, cx)?;
        validate_expr(&pred, &sub_scope)?;
        sub_ops.push(Op::Filter { predicate: pred });
    }
    if let Some(proj) = projection {
        let proj = rewrite_subqueries(proj.clone(), &sub_scope, cx)?;
        validate_expr(&proj, &sub_scope)?;
        sub_ops.push(Op::Project {
            items: vec![ProjectItem {
                expr: proj,
                name: "#value".into(),
            }],
            distinct: false,
        });
    }

    // Correlated variables: pattern variables already bound outside.
    let mut correlated = Vec::new();
    for pattern in patterns {
        for node in pattern.nodes() {
            if let Some(v) = &node.variable {
                if scope.bound(v) && !correlated.contains(v) {
                    correlated.push(v.clone());
                }
            }
        }
    }

    cx.subqueries.push(SubPlan {
        ops: sub_ops,
        kind,
        correlated,
    });
    Ok(cx.subqueries.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher;

    fn plan_src(src: &str) -> Plan {
        plan(&cypher::parse(src).unwrap()).unwrap()
    }

    fn plan_err(src: &str) -> Error {
        plan(&cypher::parse(src).unwrap()).unwrap_err()
    }

    #[test]
    fn test_scan_project() {
        let p = plan_src("MATCH (n:Person) RETURN n");
        assert!(matches!(p.ops[0], Op::ScanNodes { .. }));
        assert!(matches!(p.ops[1], Op::Project { .. }));
    }

    #[test]
    fn test_inline_properties_become_scan_predicate() {
        let p = plan_src("MATCH (n:Person {name: 'Ada'}) RETURN n");
        let Op::ScanNodes { predicate, .. } = &p.ops[0] else {
            panic!()
        };
        assert!(predicate.is_some());
    }

    #[test]
    fn test_where_becomes_filter() {
        let p = plan_src("MATCH (n:Person) WHERE n.age > 30 RETURN n");
        assert!(matches!(p.ops[1], Op::Filter { .. }));
    }

    #[test]
    fn test_expand_chain() {
        let p = plan_src("MATCH (a:Person)-[r:KNOWS]->(b) RETURN a, b");
        assert!(matches!(p.ops[0], Op::ScanNodes { .. }));
        let Op::ExpandEdges { edge_var, .. } = &p.ops[1] else {
            panic!("expected ExpandEdges, got {:?}", p.ops[1]);
        };
        assert_eq!(edge_var.as_deref(), Some("r"));
    }

    #[test]
    fn test_multi_hop_collapse_without_edge_vars() {
        let p = plan_src("MATCH (a:Person)-[:KNOWS]->(b)-[:KNOWS]->(c) RETURN c");
        let Op::ExpandMultiHop { hops, .. } = &p.ops[1] else {
            panic!("expected ExpandMultiHop, got {:?}", p.ops[1]);
        };
        assert_eq!(hops.len(), 2);
    }

    #[test]
    fn test_no_collapse_when_all_edges_named() {
        let p = plan_src("MATCH (a)-[r1:KNOWS]->(b)-[r2:KNOWS]->(c) RETURN c");
        assert!(matches!(p.ops[1], Op::ExpandEdges { .. }));
        assert!(matches!(p.ops[2], Op::ExpandEdges { .. }));
    }

    #[test]
    fn test_variable_length() {
        let p = plan_src("MATCH (a)-[:R*1..3]-(x) RETURN x");
        let Op::ExpandVariableLength { min_hops, max_hops, .. } = &p.ops[1] else {
            panic!()
        };
        assert_eq!((*min_hops, *max_hops), (1, 3));
    }

    #[test]
    fn test_path_variable_binds_multi_hop() {
        let p = plan_src("MATCH p = (a)-[:R]->(b) RETURN p");
        let Op::ExpandMultiHop { path_var, hops, .. } = &p.ops[1] else {
            panic!("expected ExpandMultiHop, got {:?}", p.ops[1]);
        };
        assert_eq!(path_var.as_deref(), Some("p"));
        assert_eq!(hops.len(), 1);
    }

    #[test]
    fn test_optional_match() {
        let p = plan_src("MATCH (a:Person) OPTIONAL MATCH (a)-[:KNOWS]->(f) RETURN a, f");
        assert!(matches!(p.ops[1], Op::OptionalExpandEdges { .. }));
    }

    #[test]
    fn test_aggregate_detection() {
        let p = plan_src("MATCH (n:Person) RETURN n.city, count(n) AS c");
        let Op::Aggregate { grouping, aggregates, items } = &p.ops[1] else {
            panic!("expected Aggregate, got {:?}", p.ops[1]);
        };
        assert_eq!(grouping.len(), 1);
        assert_eq!(aggregates.len(), 1);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_order_skip_limit() {
        let p = plan_src("MATCH (n) RETURN n.age ORDER BY n.age SKIP 1 LIMIT 2");
        let names: Vec<_> = p.ops.iter().map(|o| o.name()).collect();
        assert_eq!(
            names,
            vec!["ScanNodes", "Project", "Sort", "Skip", "Limit"]
        );
    }

    #[test]
    fn test_with_boundary() {
        let p = plan_src("MATCH (n:Person) WITH n.age AS age WHERE age > 10 RETURN age");
        let Op::With { predicate, items, .. } = &p.ops[1] else {
            panic!()
        };
        assert!(predicate.is_some());
        assert_eq!(items[0].name, "age");
    }

    #[test]
    fn test_union_plan() {
        let p = plan_src("MATCH (a:A) RETURN a.x AS x UNION MATCH (b:B) RETURN b.x AS x");
        let Op::Union { branches, all } = &p.ops[0] else {
            panic!()
        };
        assert_eq!(branches.len(), 2);
        assert!(!all);
    }

    #[test]
    fn test_union_column_mismatch() {
        let err = plan_err("MATCH (a:A) RETURN a.x AS x UNION MATCH (b:B) RETURN b.y AS y");
        assert!(matches!(err, Error::Plan(_)));
    }

    #[test]
    fn test_unresolved_variable() {
        let err = plan_err("MATCH (n) RETURN m");
        assert!(matches!(err, Error::Plan(_)));
    }

    #[test]
    fn test_aggregate_in_where_rejected() {
        let err = plan_err("MATCH (n) WHERE count(n) > 1 RETURN n");
        assert!(matches!(err, Error::Plan(_)));
    }

    #[test]
    fn test_exists_subquery_lowered() {
        let p = plan_src("MATCH (a:Person) WHERE EXISTS { (a)-[:KNOWS]->(:Person) } RETURN a");
        assert_eq!(p.subqueries.len(), 1);
        assert_eq!(p.subqueries[0].kind, SubqueryKind::Exists);
        assert_eq!(p.subqueries[0].correlated, vec!["a"]);
        let Op::Filter { predicate } = &p.ops[1] else {
            panic!()
        };
        assert!(matches!(predicate, Expr::Subquery { .. }));
    }

    #[test]
    fn test_pattern_comprehension_lowered() {
        let p = plan_src("MATCH (a:Person) RETURN [(a)-[:KNOWS]->(b) | b.name] AS names");
        assert_eq!(p.subqueries.len(), 1);
        assert_eq!(p.subqueries[0].kind, SubqueryKind::Collect);
    }

    #[test]
    fn test_merge_has_match_pipeline() {
        let p = plan_src("MERGE (n:Person {name: 'Ada'})");
        let Op::Merge { match_ops, .. } = &p.ops[0] else {
            panic!()
        };
        assert!(matches!(match_ops[0], Op::ScanNodes { .. }));
    }

    #[test]
    fn test_create_undirected_rejected() {
        let err = plan_err("CREATE (a)-[:R]-(b)");
        assert!(matches!(err, Error::Plan(_)));
    }

    #[test]
    fn test_columns() {
        let p = plan_src("MATCH (n:Person) RETURN n.name AS name, n.age");
        assert_eq!(pipeline_columns(&p.ops), vec!["name", "n.age"]);
    }

    #[test]
    fn test_bound_variable_revalidated() {
        // Second MATCH on an already-bound variable becomes a Filter, not a
        // second scan.
        let p = plan_src("MATCH (n:Person) MATCH (n:Employee) RETURN n");
        let names: Vec<_> = p.ops.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["ScanNodes", "Filter", "Project"]);
    }
}
