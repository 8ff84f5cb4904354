//! Cypher AST.
//!
//! Tagged variants for every clause, pattern and expression kind. These
//! types are pure data — no behavior beyond construction helpers, no
//! storage references, no execution logic.

/// A complete query: one singular query plus any number of UNION branches.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub first: SingleQuery,
    /// `(all, branch)` pairs in source order.
    pub unions: Vec<(bool, SingleQuery)>,
}

/// An ordered list of clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleQuery {
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match {
        optional: bool,
        patterns: Vec<PatternPart>,
        where_clause: Option<Expr>,
    },
    Unwind {
        expr: Expr,
        variable: String,
    },
    With(Projection),
    Return(Projection),
    Create {
        patterns: Vec<PatternPart>,
    },
    Merge {
        pattern: PatternPart,
        on_create: Vec<SetItem>,
        on_match: Vec<SetItem>,
    },
    Set {
        items: Vec<SetItem>,
    },
    Remove {
        items: Vec<RemoveItem>,
    },
    Delete {
        variables: Vec<String>,
        detach: bool,
    },
}

/// Shared body of RETURN and WITH: projection items plus the trailing
/// modifiers. `where_clause` is only ever populated for WITH.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub distinct: bool,
    /// `RETURN *` / `WITH *`; may be combined with explicit items.
    pub star: bool,
    pub items: Vec<ProjectionItem>,
    pub order_by: Vec<OrderItem>,
    pub skip: Option<Expr>,
    pub limit: Option<Expr>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub ascending: bool,
}

// ============================================================================
// Patterns
// ============================================================================

/// One comma-separated pattern, optionally bound to a path variable:
/// `p = (a)-[:KNOWS]->(b)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternPart {
    pub variable: Option<String>,
    pub elements: Vec<PatternElement>,
}

impl PatternPart {
    /// Node patterns in order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodePattern> {
        self.elements.iter().filter_map(|e| match e {
            PatternElement::Node(n) => Some(n),
            PatternElement::Edge(_) => None,
        })
    }

    /// Edge patterns in order.
    pub fn edges(&self) -> impl Iterator<Item = &EdgePattern> {
        self.elements.iter().filter_map(|e| match e {
            PatternElement::Edge(r) => Some(r),
            PatternElement::Node(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    Node(NodePattern),
    Edge(EdgePattern),
}

/// Node pattern: `(v:A:B|C {prop: expr} WHERE pred)`.
///
/// Labels are kept in disjunctive normal form: the outer Vec is OR-ed, each
/// inner Vec is an AND-ed conjunction of labels. `(:A:B)` is `[[A, B]]`,
/// `(:A|B)` is `[[A], [B]]`, and no label section is `[]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<Vec<String>>,
    pub properties: Vec<(String, Expr)>,
    pub predicate: Option<Expr>,
}

/// Direction of an edge pattern, relative to source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDirection {
    Out,
    In,
    Undirected,
}

/// Hop range of a variable-length edge pattern `*min..max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// Edge pattern: `-[v:T1|T2 *1..3 {prop: expr} WHERE pred]->`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePattern {
    pub variable: Option<String>,
    pub types: Vec<String>,
    pub direction: PatternDirection,
    pub properties: Vec<(String, Expr)>,
    pub predicate: Option<Expr>,
    /// None for a single-hop pattern.
    pub hops: Option<HopRange>,
}

// ============================================================================
// Write items
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SetItem {
    /// SET n.prop = expr
    Property {
        variable: String,
        key: String,
        value: Expr,
    },
    /// SET n = {map}
    AllProperties { variable: String, value: Expr },
    /// SET n += {map}
    MergeProperties { variable: String, value: Expr },
    /// SET n:Label1:Label2
    Labels {
        variable: String,
        labels: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveItem {
    /// REMOVE n.prop
    Property { variable: String, key: String },
    /// REMOVE n:Label1:Label2
    Labels {
        variable: String,
        labels: Vec<String>,
    },
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Variable reference: `n`, `r`, `p`
    Variable(String),
    /// Parameter: `$name`
    Parameter(String),
    /// Property access: `n.name`
    Property { expr: Box<Expr>, key: String },
    /// Binary operation: `a + b`, `a = b`, `a AND b`
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Unary operation: `NOT a`, `-a`
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },
    /// Membership: `x IN list`
    In { expr: Box<Expr>, list: Box<Expr> },
    /// STARTS WITH / ENDS WITH / CONTAINS
    StringMatch {
        left: Box<Expr>,
        op: StringMatchOp,
        right: Box<Expr>,
    },
    /// Label check: `n:Person`, `n:A|B` (DNF like node patterns)
    HasLabel {
        expr: Box<Expr>,
        labels: Vec<Vec<String>>,
    },
    /// Function call; `distinct` is meaningful for aggregates only.
    FunctionCall {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    /// List literal: `[1, 2, 3]`
    List(Vec<Expr>),
    /// Map literal (insertion order preserved): `{name: 'Ada'}`
    Map(Vec<(String, Expr)>),
    /// Indexing: `list[0]`, `map['key']`
    Index { expr: Box<Expr>, index: Box<Expr> },
    /// Slicing: `list[1..3]`
    Slice {
        expr: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    /// `[x IN list WHERE pred | projection]`
    ListComprehension {
        variable: String,
        list: Box<Expr>,
        predicate: Option<Box<Expr>>,
        projection: Option<Box<Expr>>,
    },
    /// `[(a)-[:R]->(b) WHERE pred | projection]`
    PatternComprehension {
        pattern: Box<PatternPart>,
        predicate: Option<Box<Expr>>,
        projection: Box<Expr>,
    },
    /// A bare pattern used as a boolean: `WHERE (a)-[:KNOWS]->(b)`
    PatternPredicate(Box<PatternPart>),
    /// `all/any/none/single(x IN list WHERE pred)`
    Quantified {
        quantifier: Quantifier,
        variable: String,
        list: Box<Expr>,
        predicate: Box<Expr>,
    },
    /// `CASE [operand] WHEN .. THEN .. [ELSE ..] END`
    Case {
        operand: Option<Box<Expr>>,
        whens: Vec<(Expr, Expr)>,
        else_expr: Option<Box<Expr>>,
    },
    /// `EXISTS { pattern [WHERE pred] }`
    ExistsSubquery(Box<PatternSubquery>),
    /// `COUNT { pattern [WHERE pred] }`
    CountSubquery(Box<PatternSubquery>),
    /// Planner-lowered subquery reference into the plan's catalog. Never
    /// produced by the parser.
    Subquery { id: usize, kind: SubqueryKind },
}

/// Body of an EXISTS/COUNT subquery expression.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternSubquery {
    pub patterns: Vec<PatternPart>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMatchOp {
    StartsWith,
    EndsWith,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    All,
    Any,
    None,
    Single,
}

/// What a lowered subquery evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    /// True iff at least one row is produced; short-circuits.
    Exists,
    /// Full enumeration, returns the row count.
    Count,
    /// Collects the single projected column into a list.
    Collect,
}

impl Expr {
    /// Render an expression the way it appeared in source, used for result
    /// column naming.
    pub fn column_name(&self) -> String {
        match self {
            Expr::Literal(Literal::Null) => "null".into(),
            Expr::Literal(Literal::Bool(b)) => b.to_string(),
            Expr::Literal(Literal::Int(i)) => i.to_string(),
            Expr::Literal(Literal::Float(f)) => f.to_string(),
            Expr::Literal(Literal::String(s)) => format!("'{s}'"),
            Expr::Variable(name) => name.clone(),
            Expr::Parameter(name) => format!("${name}"),
            Expr::Property { expr, key } => format!("{}.{key}", expr.column_name()),
            Expr::FunctionCall { name, args, distinct } => {
                let inner = if args.is_empty() {
                    "*".to_string()
                } else {
                    args.iter()
                        .map(Expr::column_name)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                if *distinct {
                    format!("{name}(DISTINCT {inner})")
                } else {
                    format!("{name}({inner})")
                }
            }
            Expr::Index { expr, index } => {
                format!("{}[{}]", expr.column_name(), index.column_name())
            }
            other => format!("{other:?}"),
        }
    }
}
