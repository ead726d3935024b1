//! Desugared Jsonnet AST.
//!
//! Documents are parsed into a flat arena ([`Ast`]) of [`ExprKind`] nodes
//! addressed by [`ExprId`]. Node references that must outlive a query hold
//! the document via [`NodeRef`]. Locations are 1-based line/column pairs;
//! see [`location`] for the containment conventions.

mod expr;
mod location;
mod printer;

pub use expr::{
    Ast, AstBuilder, BinaryOp, Expr, ExprId, ExprKind, FieldHide, LocalBind, NamedArg, NodeRef,
    ObjectField, Param, UnaryOp,
};
pub use location::{Location, LocationRange, Range};
pub use printer::{children, fmt_node, print_ast};
