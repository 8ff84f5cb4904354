//! Cypher recursive descent parser.
//!
//! Parses token streams into AST nodes. Supports:
//! - MATCH / OPTIONAL MATCH with node/edge patterns, variable-length hops,
//!   inline property maps and inline WHERE predicates
//! - WHERE, WITH, RETURN, ORDER BY, SKIP, LIMIT, DISTINCT
//! - CREATE, MERGE (ON CREATE SET / ON MATCH SET), SET, REMOVE,
//!   DELETE / DETACH DELETE, UNWIND, UNION / UNION ALL
//! - Full expression parsing with the documented precedence table

use super::ast::*;
use super::lexer::{Token, TokenKind};
use crate::{Error, Result};

/// Parser state — wraps a token slice with a cursor.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_ahead(&self, n: usize) -> TokenKind {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(&[kind]))
        }
    }

    /// Error carrying the current position and a short expected-token list.
    fn expected(&self, kinds: &[TokenKind]) -> Error {
        let tok = self.peek();
        let list = kinds
            .iter()
            .map(|k| k.describe())
            .collect::<Vec<_>>()
            .join(", ");
        Error::Parse {
            line: tok.span.line,
            column: tok.span.column,
            message: format!("expected {list}, found {}", describe_token(tok)),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        let tok = self.peek();
        Error::Parse {
            line: tok.span.line,
            column: tok.span.column,
            message: message.into(),
        }
    }

    /// A name position: identifiers, or any keyword used as a plain name
    /// (property keys like `n.type`, map keys like `{count: 1}`).
    fn expect_name(&mut self) -> Result<String> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Identifier
            | TokenKind::Count
            | TokenKind::Exists
            | TokenKind::All
            | TokenKind::Any
            | TokenKind::NoneKw
            | TokenKind::Single
            | TokenKind::Contains
            | TokenKind::Starts
            | TokenKind::Ends
            | TokenKind::On
            | TokenKind::By => Ok(self.advance().text.clone()),
            _ => Err(self.expected(&[TokenKind::Identifier])),
        }
    }

    fn expect_variable(&mut self) -> Result<String> {
        Ok(self.expect(TokenKind::Identifier)?.text.clone())
    }
}

fn describe_token(tok: &Token) -> String {
    if tok.kind == TokenKind::Eof {
        "end of input".to_string()
    } else {
        format!("'{}'", tok.text)
    }
}

/// Parse a complete query from tokens.
pub fn parse_query(tokens: &[Token]) -> Result<Query> {
    let mut p = Parser::new(tokens);

    let first = parse_single_query(&mut p)?;
    let mut unions = Vec::new();
    while p.eat(TokenKind::Union) {
        let all = p.eat(TokenKind::All);
        unions.push((all, parse_single_query(&mut p)?));
    }

    p.eat(TokenKind::Semicolon);
    if !p.at(TokenKind::Eof) {
        return Err(p.error(format!(
            "unexpected {} after end of query",
            describe_token(p.peek())
        )));
    }

    Ok(Query { first, unions })
}

fn parse_single_query(p: &mut Parser) -> Result<SingleQuery> {
    let mut clauses = Vec::new();

    loop {
        match p.peek_kind() {
            TokenKind::Match => {
                p.advance();
                clauses.push(parse_match(p, false)?);
            }
            TokenKind::Optional => {
                p.advance();
                p.expect(TokenKind::Match)?;
                clauses.push(parse_match(p, true)?);
            }
            TokenKind::Unwind => {
                p.advance();
                let expr = parse_expr(p)?;
                p.expect(TokenKind::As)?;
                let variable = p.expect_variable()?;
                clauses.push(Clause::Unwind { expr, variable });
            }
            TokenKind::With => {
                p.advance();
                clauses.push(Clause::With(parse_projection(p, true)?));
            }
            TokenKind::Return => {
                p.advance();
                clauses.push(Clause::Return(parse_projection(p, false)?));
            }
            TokenKind::Create => {
                p.advance();
                clauses.push(Clause::Create {
                    patterns: parse_pattern_list(p)?,
                });
            }
            TokenKind::Merge => {
                p.advance();
                clauses.push(parse_merge(p)?);
            }
            TokenKind::Set => {
                p.advance();
                clauses.push(Clause::Set {
                    items: parse_set_items(p)?,
                });
            }
            TokenKind::Remove => {
                p.advance();
                clauses.push(Clause::Remove {
                    items: parse_remove_items(p)?,
                });
            }
            TokenKind::Delete | TokenKind::Detach => {
                let detach = p.eat(TokenKind::Detach);
                p.expect(TokenKind::Delete)?;
                let mut variables = vec![p.expect_variable()?];
                while p.eat(TokenKind::Comma) {
                    variables.push(p.expect_variable()?);
                }
                clauses.push(Clause::Delete { variables, detach });
            }
            _ => break,
        }
    }

    if clauses.is_empty() {
        return Err(p.expected(&[
            TokenKind::Match,
            TokenKind::Create,
            TokenKind::Merge,
            TokenKind::Unwind,
            TokenKind::Return,
            TokenKind::With,
        ]));
    }

    Ok(SingleQuery { clauses })
}

fn parse_match(p: &mut Parser, optional: bool) -> Result<Clause> {
    let patterns = parse_pattern_list(p)?;
    let where_clause = if p.eat(TokenKind::Where) {
        Some(parse_expr(p)?)
    } else {
        None
    };
    Ok(Clause::Match {
        optional,
        patterns,
        where_clause,
    })
}

fn parse_merge(p: &mut Parser) -> Result<Clause> {
    let pattern = parse_pattern_part(p)?;

    let mut on_create = Vec::new();
    let mut on_match = Vec::new();
    while p.at(TokenKind::On) {
        p.advance();
        if p.eat(TokenKind::Create) {
            p.expect(TokenKind::Set)?;
            on_create.extend(parse_set_items(p)?);
        } else if p.eat(TokenKind::Match) {
            p.expect(TokenKind::Set)?;
            on_match.extend(parse_set_items(p)?);
        } else {
            return Err(p.expected(&[TokenKind::Create, TokenKind::Match]));
        }
    }

    Ok(Clause::Merge {
        pattern,
        on_create,
        on_match,
    })
}

// ============================================================================
// RETURN / WITH projections
// ============================================================================

fn parse_projection(p: &mut Parser, allow_where: bool) -> Result<Projection> {
    let distinct = p.eat(TokenKind::Distinct);

    let mut star = false;
    let mut items = Vec::new();
    if p.at(TokenKind::Star) {
        p.advance();
        star = true;
        while p.eat(TokenKind::Comma) {
            items.push(parse_projection_item(p)?);
        }
    } else {
        items.push(parse_projection_item(p)?);
        while p.eat(TokenKind::Comma) {
            items.push(parse_projection_item(p)?);
        }
    }

    // WHERE may come directly after the items (common form) or after the
    // paging modifiers (openCypher's grammar position).
    let mut where_clause = if allow_where && p.eat(TokenKind::Where) {
        Some(parse_expr(p)?)
    } else {
        None
    };

    let mut order_by = Vec::new();
    if p.eat(TokenKind::Order) {
        p.expect(TokenKind::By)?;
        order_by.push(parse_order_item(p)?);
        while p.eat(TokenKind::Comma) {
            order_by.push(parse_order_item(p)?);
        }
    }

    let skip = if p.eat(TokenKind::Skip) {
        Some(parse_expr(p)?)
    } else {
        None
    };
    let limit = if p.eat(TokenKind::Limit) {
        Some(parse_expr(p)?)
    } else {
        None
    };

    if where_clause.is_none() && allow_where && p.eat(TokenKind::Where) {
        where_clause = Some(parse_expr(p)?);
    }

    Ok(Projection {
        distinct,
        star,
        items,
        order_by,
        skip,
        limit,
        where_clause,
    })
}

fn parse_projection_item(p: &mut Parser) -> Result<ProjectionItem> {
    let expr = parse_expr(p)?;
    let alias = if p.eat(TokenKind::As) {
        Some(p.expect_name()?)
    } else {
        None
    };
    Ok(ProjectionItem { expr, alias })
}

fn parse_order_item(p: &mut Parser) -> Result<OrderItem> {
    let expr = parse_expr(p)?;
    let ascending = if p.eat(TokenKind::Desc) {
        false
    } else {
        p.eat(TokenKind::Asc);
        true
    };
    Ok(OrderItem { expr, ascending })
}

// ============================================================================
// SET / REMOVE items
// ============================================================================

fn parse_set_items(p: &mut Parser) -> Result<Vec<SetItem>> {
    let mut items = vec![parse_set_item(p)?];
    while p.eat(TokenKind::Comma) {
        items.push(parse_set_item(p)?);
    }
    Ok(items)
}

fn parse_set_item(p: &mut Parser) -> Result<SetItem> {
    let variable = p.expect_variable()?;

    if p.eat(TokenKind::Dot) {
        let key = p.expect_name()?;
        p.expect(TokenKind::Eq)?;
        let value = parse_expr(p)?;
        Ok(SetItem::Property { variable, key, value })
    } else if p.eat(TokenKind::PlusEq) {
        let value = parse_expr(p)?;
        Ok(SetItem::MergeProperties { variable, value })
    } else if p.eat(TokenKind::Eq) {
        let value = parse_expr(p)?;
        Ok(SetItem::AllProperties { variable, value })
    } else if p.at(TokenKind::Colon) {
        let labels = parse_label_conjunction(p)?;
        Ok(SetItem::Labels { variable, labels })
    } else {
        Err(p.expected(&[
            TokenKind::Dot,
            TokenKind::Eq,
            TokenKind::PlusEq,
            TokenKind::Colon,
        ]))
    }
}

fn parse_remove_items(p: &mut Parser) -> Result<Vec<RemoveItem>> {
    let mut items = vec![parse_remove_item(p)?];
    while p.eat(TokenKind::Comma) {
        items.push(parse_remove_item(p)?);
    }
    Ok(items)
}

fn parse_remove_item(p: &mut Parser) -> Result<RemoveItem> {
    let variable = p.expect_variable()?;
    if p.eat(TokenKind::Dot) {
        let key = p.expect_name()?;
        Ok(RemoveItem::Property { variable, key })
    } else if p.at(TokenKind::Colon) {
        let labels = parse_label_conjunction(p)?;
        Ok(RemoveItem::Labels { variable, labels })
    } else {
        Err(p.expected(&[TokenKind::Dot, TokenKind::Colon]))
    }
}

/// `:A:B:C` — a plain conjunction, used by SET/REMOVE.
fn parse_label_conjunction(p: &mut Parser) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    while p.eat(TokenKind::Colon) {
        labels.push(p.expect_name()?);
    }
    if labels.is_empty() {
        return Err(p.expected(&[TokenKind::Colon]));
    }
    Ok(labels)
}

// ============================================================================
// Pattern parsing
// ============================================================================

fn parse_pattern_list(p: &mut Parser) -> Result<Vec<PatternPart>> {
    let mut patterns = vec![parse_pattern_part(p)?];
    while p.eat(TokenKind::Comma) {
        patterns.push(parse_pattern_part(p)?);
    }
    Ok(patterns)
}

fn parse_pattern_part(p: &mut Parser) -> Result<PatternPart> {
    // Optional path variable: `p = (...)`
    let variable = if p.at(TokenKind::Identifier) && p.peek_ahead(1) == TokenKind::Eq {
        let name = p.advance().text.clone();
        p.advance(); // =
        Some(name)
    } else {
        None
    };

    let mut elements = vec![PatternElement::Node(parse_node_pattern(p)?)];
    while p.at(TokenKind::Dash) || p.at(TokenKind::LeftArrow) {
        elements.push(PatternElement::Edge(parse_edge_pattern(p)?));
        elements.push(PatternElement::Node(parse_node_pattern(p)?));
    }

    Ok(PatternPart { variable, elements })
}

fn parse_node_pattern(p: &mut Parser) -> Result<NodePattern> {
    p.expect(TokenKind::LParen)?;

    let variable = if p.at(TokenKind::Identifier) {
        Some(p.advance().text.clone())
    } else {
        None
    };

    let labels = if p.at(TokenKind::Colon) {
        parse_label_dnf(p)?
    } else {
        Vec::new()
    };

    let properties = if p.at(TokenKind::LBrace) {
        parse_property_map(p)?
    } else {
        Vec::new()
    };

    let predicate = if p.eat(TokenKind::Where) {
        Some(parse_expr(p)?)
    } else {
        None
    };

    p.expect(TokenKind::RParen)?;

    Ok(NodePattern {
        variable,
        labels,
        properties,
        predicate,
    })
}

/// Label expression in disjunctive normal form. `:A:B` is one conjunct
/// `[A, B]`; `:A|B` (or `:A|:B`) is two conjuncts `[A]`, `[B]`.
fn parse_label_dnf(p: &mut Parser) -> Result<Vec<Vec<String>>> {
    p.expect(TokenKind::Colon)?;
    let mut disjuncts = Vec::new();
    let mut conjunct = vec![p.expect_name()?];
    loop {
        if p.at(TokenKind::Colon) && p.peek_ahead(1) != TokenKind::Identifier {
            break;
        }
        if p.eat(TokenKind::Colon) {
            conjunct.push(p.expect_name()?);
        } else if p.eat(TokenKind::Pipe) {
            p.eat(TokenKind::Colon);
            disjuncts.push(std::mem::take(&mut conjunct));
            conjunct.push(p.expect_name()?);
        } else {
            break;
        }
    }
    disjuncts.push(conjunct);
    Ok(disjuncts)
}

fn parse_edge_pattern(p: &mut Parser) -> Result<EdgePattern> {
    let left_arrow = p.eat(TokenKind::LeftArrow);
    if !left_arrow {
        p.expect(TokenKind::Dash)?;
    }

    let mut variable = None;
    let mut types = Vec::new();
    let mut properties = Vec::new();
    let mut predicate = None;
    let mut hops = None;

    if p.eat(TokenKind::LBracket) {
        if p.at(TokenKind::Identifier) {
            variable = Some(p.advance().text.clone());
        }

        if p.eat(TokenKind::Colon) {
            types.push(p.expect_name()?);
            while p.eat(TokenKind::Pipe) {
                p.eat(TokenKind::Colon);
                types.push(p.expect_name()?);
            }
        }

        if p.eat(TokenKind::Star) {
            hops = Some(parse_hop_range(p)?);
        }

        if p.at(TokenKind::LBrace) {
            properties = parse_property_map(p)?;
        }

        if p.eat(TokenKind::Where) {
            predicate = Some(parse_expr(p)?);
        }

        p.expect(TokenKind::RBracket)?;
    }

    let direction = if p.eat(TokenKind::Arrow) {
        if left_arrow {
            return Err(p.error("edge pattern cannot point both ways"));
        }
        PatternDirection::Out
    } else {
        p.expect(TokenKind::Dash)?;
        if left_arrow {
            PatternDirection::In
        } else {
            PatternDirection::Undirected
        }
    };

    Ok(EdgePattern {
        variable,
        types,
        direction,
        properties,
        predicate,
        hops,
    })
}

fn parse_hop_range(p: &mut Parser) -> Result<HopRange> {
    let min = if p.at(TokenKind::Integer) {
        Some(parse_hop_bound(p)?)
    } else {
        None
    };
    if p.eat(TokenKind::DotDot) {
        let max = if p.at(TokenKind::Integer) {
            Some(parse_hop_bound(p)?)
        } else {
            None
        };
        Ok(HopRange { min, max })
    } else {
        // `*n` means exactly n; bare `*` means the default range
        Ok(HopRange { min, max: min })
    }
}

fn parse_hop_bound(p: &mut Parser) -> Result<u32> {
    let tok = p.expect(TokenKind::Integer)?;
    tok.text
        .parse::<u32>()
        .map_err(|_| Error::Parse {
            line: tok.span.line,
            column: tok.span.column,
            message: format!("hop bound out of range: {}", tok.text),
        })
}

fn parse_property_map(p: &mut Parser) -> Result<Vec<(String, Expr)>> {
    p.expect(TokenKind::LBrace)?;
    let mut entries = Vec::new();
    if !p.at(TokenKind::RBrace) {
        loop {
            let key = p.expect_name()?;
            p.expect(TokenKind::Colon)?;
            entries.push((key, parse_expr(p)?));
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
    }
    p.expect(TokenKind::RBrace)?;
    Ok(entries)
}

// ============================================================================
// Expression parsing (precedence climbing)
// ============================================================================
//
// Precedence, loosest first: OR; AND; NOT; comparisons / IS NULL / IN;
// STARTS WITH / ENDS WITH / CONTAINS; + -; * / %; unary -; postfix
// (property access, indexing, label check); primary.

fn parse_expr(p: &mut Parser) -> Result<Expr> {
    parse_or(p)
}

fn parse_or(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_and(p)?;
    while p.eat(TokenKind::Or) {
        let right = parse_and(p)?;
        left = Expr::Binary {
            left: Box::new(left),
            op: BinaryOp::Or,
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn parse_and(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_not(p)?;
    while p.eat(TokenKind::And) {
        let right = parse_not(p)?;
        left = Expr::Binary {
            left: Box::new(left),
            op: BinaryOp::And,
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn parse_not(p: &mut Parser) -> Result<Expr> {
    if p.eat(TokenKind::Not) {
        let expr = parse_not(p)?;
        Ok(Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(expr),
        })
    } else {
        parse_comparison(p)
    }
}

fn parse_comparison(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_string_match(p)?;

    loop {
        if p.at(TokenKind::Is) {
            p.advance();
            let negated = p.eat(TokenKind::Not);
            p.expect(TokenKind::Null)?;
            left = Expr::IsNull {
                expr: Box::new(left),
                negated,
            };
            continue;
        }
        if p.eat(TokenKind::In) {
            let list = parse_string_match(p)?;
            left = Expr::In {
                expr: Box::new(left),
                list: Box::new(list),
            };
            continue;
        }

        let op = match p.peek_kind() {
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Neq => BinaryOp::Neq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Lte => BinaryOp::Lte,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Gte => BinaryOp::Gte,
            _ => break,
        };
        p.advance();
        let right = parse_string_match(p)?;
        left = Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        };
    }

    Ok(left)
}

fn parse_string_match(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_additive(p)?;
    loop {
        let op = if p.at(TokenKind::Starts) {
            p.advance();
            p.expect(TokenKind::With)?;
            StringMatchOp::StartsWith
        } else if p.at(TokenKind::Ends) {
            p.advance();
            p.expect(TokenKind::With)?;
            StringMatchOp::EndsWith
        } else if p.at(TokenKind::Contains) {
            p.advance();
            StringMatchOp::Contains
        } else {
            break;
        };
        let right = parse_additive(p)?;
        left = Expr::StringMatch {
            left: Box::new(left),
            op,
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn parse_additive(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_multiplicative(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Dash => BinaryOp::Sub,
            _ => break,
        };
        p.advance();
        let right = parse_multiplicative(p)?;
        left = Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn parse_multiplicative(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_unary(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            _ => break,
        };
        p.advance();
        let right = parse_unary(p)?;
        left = Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn parse_unary(p: &mut Parser) -> Result<Expr> {
    if p.at(TokenKind::Dash) {
        p.advance();
        let expr = parse_unary(p)?;
        Ok(Expr::Unary {
            op: UnaryOp::Negate,
            expr: Box::new(expr),
        })
    } else if p.eat(TokenKind::Plus) {
        parse_unary(p)
    } else {
        parse_postfix(p)
    }
}

fn parse_postfix(p: &mut Parser) -> Result<Expr> {
    let mut expr = parse_primary(p)?;

    loop {
        if p.at(TokenKind::Dot) {
            p.advance();
            let key = p.expect_name()?;
            expr = Expr::Property {
                expr: Box::new(expr),
                key,
            };
        } else if p.at(TokenKind::LBracket) {
            p.advance();
            // `[..b]`, `[a..b]`, `[a..]` are slices; `[i]` is an index
            let start = if p.at(TokenKind::DotDot) {
                None
            } else {
                Some(Box::new(parse_expr(p)?))
            };
            if p.eat(TokenKind::DotDot) {
                let end = if p.at(TokenKind::RBracket) {
                    None
                } else {
                    Some(Box::new(parse_expr(p)?))
                };
                p.expect(TokenKind::RBracket)?;
                expr = Expr::Slice {
                    expr: Box::new(expr),
                    start,
                    end,
                };
            } else {
                p.expect(TokenKind::RBracket)?;
                let index = start.ok_or_else(|| p.error("expected index expression"))?;
                expr = Expr::Index {
                    expr: Box::new(expr),
                    index,
                };
            }
        } else if p.at(TokenKind::Colon) && matches!(expr, Expr::Variable(_)) {
            let labels = parse_label_dnf(p)?;
            expr = Expr::HasLabel {
                expr: Box::new(expr),
                labels,
            };
        } else {
            break;
        }
    }

    Ok(expr)
}

fn parse_primary(p: &mut Parser) -> Result<Expr> {
    match p.peek_kind() {
        TokenKind::Integer => {
            let tok = p.advance();
            let val = tok.text.parse::<i64>().map_err(|_| Error::Parse {
                line: tok.span.line,
                column: tok.span.column,
                message: format!("integer literal out of range: {}", tok.text),
            })?;
            Ok(Expr::Literal(Literal::Int(val)))
        }
        TokenKind::Float => {
            let tok = p.advance();
            let val = tok.text.parse::<f64>().map_err(|_| Error::Parse {
                line: tok.span.line,
                column: tok.span.column,
                message: format!("malformed float literal: {}", tok.text),
            })?;
            Ok(Expr::Literal(Literal::Float(val)))
        }
        TokenKind::StringLiteral => {
            let text = p.advance().text.clone();
            Ok(Expr::Literal(Literal::String(text)))
        }
        TokenKind::True => {
            p.advance();
            Ok(Expr::Literal(Literal::Bool(true)))
        }
        TokenKind::False => {
            p.advance();
            Ok(Expr::Literal(Literal::Bool(false)))
        }
        TokenKind::Null => {
            p.advance();
            Ok(Expr::Literal(Literal::Null))
        }
        TokenKind::Parameter => {
            let name = p.advance().text.clone();
            Ok(Expr::Parameter(name))
        }

        TokenKind::LParen => parse_paren_or_pattern(p),
        TokenKind::LBracket => parse_bracketed(p),

        TokenKind::LBrace => {
            let entries = parse_property_map(p)?;
            Ok(Expr::Map(entries))
        }

        TokenKind::Case => parse_case(p),
        TokenKind::Exists => parse_exists(p),
        TokenKind::Count => parse_count(p),

        TokenKind::All | TokenKind::Any | TokenKind::NoneKw | TokenKind::Single => {
            parse_quantified(p)
        }

        TokenKind::Identifier => {
            let name = p.advance().text.clone();
            if p.at(TokenKind::LParen) {
                parse_function_call(p, name)
            } else {
                Ok(Expr::Variable(name))
            }
        }

        _ => Err(p.error(format!(
            "unexpected {} in expression",
            describe_token(p.peek())
        ))),
    }
}

/// `(` either opens a parenthesized expression or starts a pattern
/// predicate such as `(a)-[:KNOWS]->(b)`. Try the pattern first and fall
/// back on the expression; a single parenthesized node is not a pattern.
fn parse_paren_or_pattern(p: &mut Parser) -> Result<Expr> {
    let saved = p.pos;
    if let Ok(pattern) = parse_pattern_part(p) {
        if pattern.edges().count() > 0 {
            return Ok(Expr::PatternPredicate(Box::new(pattern)));
        }
    }
    p.pos = saved;

    p.expect(TokenKind::LParen)?;
    let expr = parse_expr(p)?;
    p.expect(TokenKind::RParen)?;
    Ok(expr)
}

/// `[` opens a list literal, a list comprehension, or a pattern
/// comprehension.
fn parse_bracketed(p: &mut Parser) -> Result<Expr> {
    // List comprehension: [x IN list ...]
    if p.peek_ahead(1) == TokenKind::Identifier && p.peek_ahead(2) == TokenKind::In {
        p.advance(); // [
        let variable = p.expect_variable()?;
        p.expect(TokenKind::In)?;
        let list = parse_expr(p)?;
        let predicate = if p.eat(TokenKind::Where) {
            Some(Box::new(parse_expr(p)?))
        } else {
            None
        };
        let projection = if p.eat(TokenKind::Pipe) {
            Some(Box::new(parse_expr(p)?))
        } else {
            None
        };
        p.expect(TokenKind::RBracket)?;
        return Ok(Expr::ListComprehension {
            variable,
            list: Box::new(list),
            predicate,
            projection,
        });
    }

    // Pattern comprehension: [(a)-[:R]->(b) WHERE pred | proj]
    if p.peek_ahead(1) == TokenKind::LParen {
        let saved = p.pos;
        p.advance(); // [
        if let Ok(pattern) = parse_pattern_part(p) {
            if pattern.edges().count() > 0 {
                let predicate = if p.eat(TokenKind::Where) {
                    Some(Box::new(parse_expr(p)?))
                } else {
                    None
                };
                p.expect(TokenKind::Pipe)?;
                let projection = Box::new(parse_expr(p)?);
                p.expect(TokenKind::RBracket)?;
                return Ok(Expr::PatternComprehension {
                    pattern: Box::new(pattern),
                    predicate,
                    projection,
                });
            }
        }
        p.pos = saved;
    }

    // Plain list literal
    p.expect(TokenKind::LBracket)?;
    let mut items = Vec::new();
    if !p.at(TokenKind::RBracket) {
        items.push(parse_expr(p)?);
        while p.eat(TokenKind::Comma) {
            items.push(parse_expr(p)?);
        }
    }
    p.expect(TokenKind::RBracket)?;
    Ok(Expr::List(items))
}

fn parse_case(p: &mut Parser) -> Result<Expr> {
    p.expect(TokenKind::Case)?;
    let operand = if !p.at(TokenKind::When) {
        Some(Box::new(parse_expr(p)?))
    } else {
        None
    };
    let mut whens = Vec::new();
    while p.eat(TokenKind::When) {
        let when = parse_expr(p)?;
        p.expect(TokenKind::Then)?;
        let then = parse_expr(p)?;
        whens.push((when, then));
    }
    if whens.is_empty() {
        return Err(p.expected(&[TokenKind::When]));
    }
    let else_expr = if p.eat(TokenKind::Else) {
        Some(Box::new(parse_expr(p)?))
    } else {
        None
    };
    p.expect(TokenKind::End)?;
    Ok(Expr::Case {
        operand,
        whens,
        else_expr,
    })
}

fn parse_exists(p: &mut Parser) -> Result<Expr> {
    p.expect(TokenKind::Exists)?;

    // EXISTS { pattern [WHERE pred] }
    if p.eat(TokenKind::LBrace) {
        p.eat(TokenKind::Match);
        let patterns = parse_pattern_list(p)?;
        let where_clause = if p.eat(TokenKind::Where) {
            Some(parse_expr(p)?)
        } else {
            None
        };
        p.expect(TokenKind::RBrace)?;
        return Ok(Expr::ExistsSubquery(Box::new(PatternSubquery {
            patterns,
            where_clause,
        })));
    }

    // exists(pattern) or exists(n.prop)
    p.expect(TokenKind::LParen)?;
    let saved = p.pos;
    if let Ok(pattern) = parse_pattern_part(p) {
        if pattern.edges().count() > 0 && p.at(TokenKind::RParen) {
            p.advance();
            return Ok(Expr::ExistsSubquery(Box::new(PatternSubquery {
                patterns: vec![pattern],
                where_clause: None,
            })));
        }
    }
    p.pos = saved;
    let arg = parse_expr(p)?;
    p.expect(TokenKind::RParen)?;
    Ok(Expr::FunctionCall {
        name: "exists".into(),
        args: vec![arg],
        distinct: false,
    })
}

fn parse_count(p: &mut Parser) -> Result<Expr> {
    p.expect(TokenKind::Count)?;

    // COUNT { pattern [WHERE pred] }
    if p.eat(TokenKind::LBrace) {
        p.eat(TokenKind::Match);
        let patterns = parse_pattern_list(p)?;
        let where_clause = if p.eat(TokenKind::Where) {
            Some(parse_expr(p)?)
        } else {
            None
        };
        p.expect(TokenKind::RBrace)?;
        return Ok(Expr::CountSubquery(Box::new(PatternSubquery {
            patterns,
            where_clause,
        })));
    }

    // count(*) / count(expr) / count(DISTINCT expr)
    p.expect(TokenKind::LParen)?;
    let distinct = p.eat(TokenKind::Distinct);
    let args = if p.eat(TokenKind::Star) {
        Vec::new()
    } else {
        vec![parse_expr(p)?]
    };
    p.expect(TokenKind::RParen)?;
    Ok(Expr::FunctionCall {
        name: "count".into(),
        args,
        distinct,
    })
}

fn parse_quantified(p: &mut Parser) -> Result<Expr> {
    let quantifier = match p.advance().kind {
        TokenKind::All => Quantifier::All,
        TokenKind::Any => Quantifier::Any,
        TokenKind::NoneKw => Quantifier::None,
        TokenKind::Single => Quantifier::Single,
        _ => unreachable!("caller checked"),
    };
    p.expect(TokenKind::LParen)?;
    let variable = p.expect_variable()?;
    p.expect(TokenKind::In)?;
    let list = parse_expr(p)?;
    p.expect(TokenKind::Where)?;
    let predicate = parse_expr(p)?;
    p.expect(TokenKind::RParen)?;
    Ok(Expr::Quantified {
        quantifier,
        variable,
        list: Box::new(list),
        predicate: Box::new(predicate),
    })
}

fn parse_function_call(p: &mut Parser, name: String) -> Result<Expr> {
    p.expect(TokenKind::LParen)?;
    let distinct = p.eat(TokenKind::Distinct);
    let mut args = Vec::new();
    if !p.at(TokenKind::RParen) {
        args.push(parse_expr(p)?);
        while p.eat(TokenKind::Comma) {
            args.push(parse_expr(p)?);
        }
    }
    p.expect(TokenKind::RParen)?;
    Ok(Expr::FunctionCall {
        name,
        args,
        distinct,
    })
}

// ============================================================================
// Tests
// ============================================================================
