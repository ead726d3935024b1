//! Type-annotation comments.
//!
//! Jsonnet has no type syntax, so hints live in specially delimited
//! comments: `/*: string | null */`. This module owns the mini-language:
//! token set, parser, and printable AST. Failures never block analysis —
//! the caller downgrades them to a `hint_error` on the value.

mod ast;
mod lexer;
mod parser;

pub use ast::{Node, ParamNode};
pub use parser::parse;
