//! Analysis core: value/type deduction over the Jsonnet AST.
//!
//! The building blocks, leaves first:
//!
//! - [`annotation`]: the `/*: … */` type-hint mini-language.
//! - [`walk`]/[`stack_vars`]: traversal with parent stacks and the scope
//!   model (locals, object locals, parameters, `std`/`self`/`$`).
//! - [`node_to_value`]: the deducer, mapping AST nodes to structured
//!   [`Value`]s with inferred types, hints, object shapes, and function
//!   signatures; resolves imports, indexing, application, and single-level
//!   generics over `function` types.
//! - [`stdlib_value`]: the typed, documented `std` catalogue.
//! - [`Resolver`]: the query seam the session layer implements.

pub mod annotation;
mod resolver;
mod stdlib;
mod typehint;
mod value;
mod vars;
mod walk;

pub use resolver::Resolver;
pub use stdlib::{stdlib_field_value, stdlib_value};
pub use typehint::{
    annotation_to_type_info, infer_type_parameters, is_type_decl_comments,
    solve_type_param, solve_type_parameter_info, type_hint_comments_to_info, TypeInfo,
};
pub use value::{
    node_to_value, simple_value_type, Field, Function, Object, Param, Value, ValueType,
    MAX_DEDUCTION_DEPTH,
};
pub use vars::{safe_ident, stack_vars, unwind_locals_vars, Var, VarMap};
pub use walk::{loc_in_node, stack_at_loc, stack_at_node, unwind_locals, walk};

#[cfg(test)]
mod testutil;
#[cfg(test)]
mod tests;
