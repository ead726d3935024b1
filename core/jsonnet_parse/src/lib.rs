//! Jsonnet parser.
//!
//! Hand-written recursive descent over the token stream from
//! `jsonnet_lexer`. The output is already desugared to the node set the
//! analysis layer consumes:
//!
//! - dotted access lowers to string indexing,
//! - `e { … }` template application lowers to `e + { … }`,
//! - array comprehensions lower to `$std.flatMap` chains,
//! - object comprehensions lower to `$std.$objectFlatMerge`,
//! - slices lower to `$std.slice`,
//! - expression-level `assert cond; rest` lowers to a conditional whose
//!   false branch is an `error` node,
//! - `local f(x) = …` and field methods lower to `function` nodes.
//!
//! Parse failures produce a single located [`ParseError`]; there is no
//! in-parser recovery (the overlay keeps the previous good tree and the
//! session layer retries with small remedial edits while the user types).

mod parser;

use std::fmt;
use std::sync::Arc;

use jsonnet_ast::{Ast, LocationRange};

/// A parse failure at a source range.
#[derive(Clone, Debug)]
pub struct ParseError {
    pub message: String,
    pub range: LocationRange,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.range, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse `source` into a desugared document tree.
pub fn parse(filename: &str, source: &str) -> Result<Arc<Ast>, ParseError> {
    let filename: Arc<str> = Arc::from(filename);
    let tokens = jsonnet_lexer::lex(source).map_err(|e| ParseError {
        message: e.message,
        range: LocationRange {
            filename: filename.clone(),
            begin: e.location,
            end: e.location,
        },
    })?;
    parser::Parser::new(filename, tokens).parse_document()
}

#[cfg(test)]
mod tests;
