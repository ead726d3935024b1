//! The resolver interface.
//!
//! Everything the deducer needs from its surroundings: visible variables
//! at a node, node lookup by position, and lazy import resolution. The
//! concrete implementation lives in the session layer; tests use small
//! single-document resolvers.

use jsonnet_ast::{Location, NodeRef};

use crate::vars::VarMap;

/// Query interface over a root AST, its imports, and scopes.
///
/// Implementations are expected to cache the stack of any node returned by
/// `node_at` so a follow-up `vars` call on the same node is cheap.
pub trait Resolver {
    /// The variables visible at `from`. The available bindings change with
    /// the position of the node in the tree.
    fn vars(&self, from: &NodeRef) -> VarMap;

    /// The node at a source location together with its ancestor stack
    /// (innermost last).
    fn node_at(&self, loc: Location) -> Option<(NodeRef, Vec<NodeRef>)>;

    /// Resolve an import, returning the imported document's root. Lazy:
    /// implementations only touch the session/importer on first use.
    fn import(&self, from: &str, path: &str) -> Option<NodeRef>;
}
