//! Logical plan operators.
//!
//! A plan is an ordered sequence of operators; each operator consumes a
//! stream of bindings (rows) and produces a stream of bindings. The
//! executor dispatches on the variant, the optimizer rewrites the
//! sequence in place.

use crate::cypher::ast::{
    Expr, OrderItem, PatternDirection, PatternPart, RemoveItem, SetItem, SubqueryKind,
};

/// A full query plan: the operator pipeline plus the catalog of subquery
/// pipelines referenced from expressions via `Expr::Subquery`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub ops: Vec<Op>,
    pub subqueries: Vec<SubPlan>,
}

/// A pre-planned subquery pipeline, evaluated per outer row with the outer
/// binding as seed. Correlated variables are carried in from the outer
/// binding.
#[derive(Debug, Clone, PartialEq)]
pub struct SubPlan {
    pub ops: Vec<Op>,
    pub kind: SubqueryKind,
    pub correlated: Vec<String>,
}

/// One projected column: expression plus result name.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItem {
    pub expr: Expr,
    pub name: String,
}

/// One hop of a compiled fixed-length multi-hop expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub edge_var: Option<String>,
    pub dst_var: String,
    pub edge_types: Vec<String>,
    pub direction: PatternDirection,
    pub predicate: Option<Expr>,
}

/// Logical pipeline operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Emit every node matching the label DNF and predicate, bound to `var`.
    /// If `var` is already bound, validate instead of scanning.
    ScanNodes {
        var: String,
        labels: Vec<Vec<String>>,
        predicate: Option<Expr>,
    },
    /// Left-outer scan: preserves each input row, binding `var` to NULL when
    /// nothing matches. The predicate is part of the match, not a filter.
    OptionalScanNodes {
        var: String,
        labels: Vec<Vec<String>>,
        predicate: Option<Expr>,
    },
    /// For each input row, for each qualifying edge from `src_var`, bind
    /// `edge_var`/`dst_var` and emit.
    ExpandEdges {
        src_var: String,
        edge_var: Option<String>,
        dst_var: String,
        edge_types: Vec<String>,
        direction: PatternDirection,
        predicate: Option<Expr>,
    },
    /// Left-outer variant of `ExpandEdges`. The predicate is part of the
    /// match, not a filter.
    OptionalExpandEdges {
        src_var: String,
        edge_var: Option<String>,
        dst_var: String,
        edge_types: Vec<String>,
        direction: PatternDirection,
        predicate: Option<Expr>,
    },
    /// Enumerate paths of length in `[min_hops, max_hops]`; an edge may not
    /// repeat within a single path. `edge_predicate` is checked on every
    /// traversed edge, `node_predicate` on the destination at emission.
    ExpandVariableLength {
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
    },
    /// Compiled form of a fixed-length multi-hop pattern, planned as one
    /// unit so the optimizer reorders it atomically. Zero hops binds a
    /// single-node path.
    ExpandMultiHop {
        src_var: String,
        hops: Vec<Hop>,
        path_var: Option<String>,
    },
    Filter {
        predicate: Expr,
    },
    Project {
        items: Vec<ProjectItem>,
        distinct: bool,
    },
    Sort {
        items: Vec<OrderItem>,
    },
    Skip {
        count: Expr,
    },
    Limit {
        count: Expr,
    },
    /// Group input rows by the grouping expressions (NULL equals NULL for
    /// grouping), accumulate each aggregate per group, then project `items`.
    Aggregate {
        grouping: Vec<ProjectItem>,
        aggregates: Vec<Expr>,
        items: Vec<ProjectItem>,
    },
    /// Pipeline boundary: projects a new scope and applies its own
    /// filter/sort/pagination.
    With {
        items: Vec<ProjectItem>,
        distinct: bool,
        predicate: Option<Expr>,
        sort: Vec<OrderItem>,
        skip: Option<Expr>,
        limit: Option<Expr>,
    },
    /// Expand a list into rows. An empty list produces zero rows; NULL
    /// produces one row with `var` bound to NULL.
    Unwind {
        expr: Expr,
        var: String,
    },
    /// Concatenate branch pipelines; deduplicate unless `all`.
    Union {
        branches: Vec<Vec<Op>>,
        all: bool,
    },
    Create {
        patterns: Vec<PatternPart>,
    },
    /// Match-or-create. `match_ops` is the pre-planned matching pipeline
    /// for the pattern, run per input row.
    Merge {
        pattern: PatternPart,
        match_ops: Vec<Op>,
        on_create: Vec<SetItem>,
        on_match: Vec<SetItem>,
    },
    SetProps {
        items: Vec<SetItem>,
    },
    Remove {
        items: Vec<RemoveItem>,
    },
    Delete {
        vars: Vec<String>,
        detach: bool,
    },
}

impl Op {
    /// Variables this operator introduces into the binding.
    pub fn bound_vars(&self) -> Vec<&str> {
        match self {
            Op::ScanNodes { var, .. } | Op::OptionalScanNodes { var, .. } => vec![var.as_str()],
            Op::ExpandEdges { edge_var, dst_var, .. }
            | Op::OptionalExpandEdges { edge_var, dst_var, .. } => {
                let mut vars = vec![dst_var.as_str()];
                if let Some(e) = edge_var {
                    vars.push(e);
                }
                vars
            }
            Op::ExpandVariableLength { edge_var, dst_var, path_var, .. } => {
                let mut vars = vec![dst_var.as_str()];
                if let Some(e) = edge_var {
                    vars.push(e);
                }
                if let Some(p) = path_var {
                    vars.push(p);
                }
                vars
            }
            Op::ExpandMultiHop { hops, path_var, .. } => {
                let mut vars = Vec::new();
                for hop in hops {
                    vars.push(hop.dst_var.as_str());
                    if let Some(e) = &hop.edge_var {
                        vars.push(e);
                    }
                }
                if let Some(p) = path_var {
                    vars.push(p);
                }
                vars
            }
            Op::Unwind { var, .. } => vec![var.as_str()],
            Op::Project { items, .. } | Op::With { items, .. } => {
                items.iter().map(|i| i.name.as_str()).collect()
            }
            Op::Aggregate { items, .. } => items.iter().map(|i| i.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Variables this operator requires to be bound before it runs.
    pub fn required_vars(&self) -> Vec<&str> {
        match self {
            Op::ExpandEdges { src_var, .. }
            | Op::OptionalExpandEdges { src_var, .. }
            | Op::ExpandVariableLength { src_var, .. }
            | Op::ExpandMultiHop { src_var, .. } => vec![src_var.as_str()],
            Op::Filter { predicate } => {
                let mut vars = Vec::new();
                collect_expr_vars(predicate, &mut vars);
                vars
            }
            Op::Delete { vars, .. } => vars.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether the optimizer may attach pushed-down predicates here.
    /// Optional operators never accept them — that would alter their NULL
    /// semantics.
    pub fn supports_predicates(&self) -> bool {
        matches!(
            self,
            Op::ScanNodes { .. } | Op::ExpandEdges { .. } | Op::ExpandVariableLength { .. }
        )
    }

    /// Access the predicate slot pushdown may attach to. For
    /// variable-length expansion that is the emission-time node predicate.
    pub fn predicate_mut(&mut self) -> Option<&mut Option<Expr>> {
        match self {
            Op::ScanNodes { predicate, .. } | Op::ExpandEdges { predicate, .. } => Some(predicate),
            Op::ExpandVariableLength { node_predicate, .. } => Some(node_predicate),
            _ => None,
        }
    }

    /// Operators with observable side effects.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Op::Create { .. }
                | Op::Merge { .. }
                | Op::SetProps { .. }
                | Op::Remove { .. }
                | Op::Delete { .. }
        )
    }

    /// Pipeline boundaries: rewrites must not move predicates or reorder
    /// operators across these.
    pub fn is_boundary(&self) -> bool {
        self.is_mutation()
            || matches!(
                self,
                Op::With { .. } | Op::Union { .. } | Op::Aggregate { .. } | Op::Project { .. }
            )
    }

    /// Operators that introduce pattern rows (targets of join reordering).
    pub fn is_pattern_source(&self) -> bool {
        matches!(
            self,
            Op::ScanNodes { .. }
                | Op::ExpandEdges { .. }
                | Op::ExpandVariableLength { .. }
                | Op::ExpandMultiHop { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::ScanNodes { .. } => "ScanNodes",
            Op::OptionalScanNodes { .. } => "OptionalScanNodes",
            Op::ExpandEdges { .. } => "ExpandEdges",
            Op::OptionalExpandEdges { .. } => "OptionalExpandEdges",
            Op::ExpandVariableLength { .. } => "ExpandVariableLength",
            Op::ExpandMultiHop { .. } => "ExpandMultiHop",
            Op::Filter { .. } => "Filter",
            Op::Project { .. } => "Project",
            Op::Sort { .. } => "Sort",
            Op::Skip { .. } => "Skip",
            Op::Limit { .. } => "Limit",
            Op::Aggregate { .. } => "Aggregate",
            Op::With { .. } => "With",
            Op::Unwind { .. } => "Unwind",
            Op::Union { .. } => "Union",
            Op::Create { .. } => "Create",
            Op::Merge { .. } => "Merge",
            Op::SetProps { .. } => "Set",
            Op::Remove { .. } => "Remove",
            Op::Delete { .. } => "Delete",
        }
    }
}

/// Collect every variable referenced by an expression. Local variables of
/// comprehensions and quantifiers are introduced by the construct itself
/// and excluded.
pub fn collect_expr_vars<'e>(expr: &'e Expr, out: &mut Vec<&'e str>) {
    match expr {
        Expr::Variable(name) => {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        Expr::Property { expr, .. }
        | Expr::Unary { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::HasLabel { expr, .. } => collect_expr_vars(expr, out),
        Expr::Binary { left, right, .. } => {
            collect_expr_vars(left, out);
            collect_expr_vars(right, out);
        }
        Expr::In { expr, list } => {
            collect_expr_vars(expr, out);
            collect_expr_vars(list, out);
        }
        Expr::StringMatch { left, right, .. } => {
            collect_expr_vars(left, out);
            collect_expr_vars(right, out);
        }
        Expr::FunctionCall { args, .. } => {
            for arg in args {
                collect_expr_vars(arg, out);
            }
        }
        Expr::List(items) => {
            for item in items {
                collect_expr_vars(item, out);
            }
        }
        Expr::Map(entries) => {
            for (_, value) in entries {
                collect_expr_vars(value, out);
            }
        }
        Expr::Index { expr, index } => {
            collect_expr_vars(expr, out);
            collect_expr_vars(index, out);
        }
        Expr::Slice { expr, start, end } => {
            collect_expr_vars(expr, out);
            if let Some(s) = start {
                collect_expr_vars(s, out);
            }
            if let Some(e) = end {
                collect_expr_vars(e, out);
            }
        }
        Expr::ListComprehension { variable, list, predicate, projection } => {
            collect_expr_vars(list, out);
            let mut inner = Vec::new();
            if let Some(p) = predicate {
                collect_expr_vars(p, &mut inner);
            }
            if let Some(p) = projection {
                collect_expr_vars(p, &mut inner);
            }
            for v in inner {
                if v != variable.as_str() && !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        Expr::Quantified { variable, list, predicate, .. } => {
            collect_expr_vars(list, out);
            let mut inner = Vec::new();
            collect_expr_vars(predicate, &mut inner);
            for v in inner {
                if v != variable.as_str() && !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        Expr::Case { operand, whens, else_expr } => {
            if let Some(op) = operand {
                collect_expr_vars(op, out);
            }
            for (when, then) in whens {
                collect_expr_vars(when, out);
                collect_expr_vars(then, out);
            }
            if let Some(e) = else_expr {
                collect_expr_vars(e, out);
            }
        }
        Expr::PatternComprehension { pattern, predicate, projection } => {
            let mut locals: Vec<&str> = Vec::new();
            for node in pattern.nodes() {
                if let Some(v) = &node.variable {
                    locals.push(v);
                }
            }
            for edge in pattern.edges() {
                if let Some(v) = &edge.variable {
                    locals.push(v);
                }
            }
            let mut inner = Vec::new();
            if let Some(p) = predicate {
                collect_expr_vars(p, &mut inner);
            }
            collect_expr_vars(projection, &mut inner);
            for v in inner {
                if !locals.contains(&v) && !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        Expr::PatternPredicate(pattern) => {
            // Only variables on the pattern's nodes can correlate outward.
            for node in pattern.nodes() {
                if let Some(v) = &node.variable {
                    if !out.contains(&v.as_str()) {
                        out.push(v);
                    }
                }
            }
        }
        Expr::ExistsSubquery(sub) | Expr::CountSubquery(sub) => {
            for part in &sub.patterns {
                for node in part.nodes() {
                    if let Some(v) = &node.variable {
                        if !out.contains(&v.as_str()) {
                            out.push(v);
                        }
                    }
                }
            }
        }
        Expr::Literal(_) | Expr::Parameter(_) | Expr::Subquery { .. } => {}
    }
}
