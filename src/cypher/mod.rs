//! # Cypher Language Front End
//!
//! Lexer and recursive-descent parser producing a clean AST.
//! Pure functions — no I/O, no state, no storage dependency.

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::Result;
use ast::Query;

/// Parse a Cypher query string into an AST.
pub fn parse(source: &str) -> Result<Query> {
    let tokens = lexer::tokenize(source)?;
    parser::parse_query(&tokens)
}
