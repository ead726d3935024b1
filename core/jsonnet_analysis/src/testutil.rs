//! Single-document resolver for tests.

use std::sync::Arc;

use jsonnet_ast::{Ast, Location, NodeRef};

use crate::resolver::Resolver;
use crate::vars::{stack_vars, VarMap};
use crate::walk::{stack_at_loc, stack_at_node, unwind_locals};

pub(crate) struct MockResolver {
    root: Arc<Ast>,
}

impl MockResolver {
    /// Parse an anonymous snippet; returns the resolver and the document's
    /// trailing expression (locals unwound).
    pub(crate) fn parse(source: &str) -> (MockResolver, NodeRef) {
        let root = jsonnet_parse::parse("anon.jsonnet", source).expect("test source must parse");
        let root_ref = NodeRef::root(&root);
        let (_, out) = unwind_locals(&root_ref);
        (MockResolver { root }, out)
    }

    fn refs(&self, stack: Vec<jsonnet_ast::ExprId>) -> Vec<NodeRef> {
        stack
            .into_iter()
            .map(|id| NodeRef::new(self.root.clone(), id))
            .collect()
    }
}

impl Resolver for MockResolver {
    fn vars(&self, from: &NodeRef) -> VarMap {
        let stack = self.refs(stack_at_node(&self.root, from.id));
        stack_vars(&stack)
    }

    fn node_at(&self, loc: Location) -> Option<(NodeRef, Vec<NodeRef>)> {
        let stack = self.refs(stack_at_loc(&self.root, loc));
        let node = stack.last()?.clone();
        Some((node, stack))
    }

    fn import(&self, _from: &str, _path: &str) -> Option<NodeRef> {
        None
    }
}
