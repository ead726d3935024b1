//! The resolver over the active document.
//!
//! Holds a snapshot of the active root plus a map of `filename → root` for
//! every import discovered during the query. Stacks computed by `node_at`
//! are cached so the usual follow-up (`vars` on the returned node) is a
//! lookup, not a second walk. The session is only grabbed when an import
//! actually needs resolving, which avoids thrashing the single-session
//! cache from queries that never leave the file.

use std::cell::RefCell;
use std::sync::Arc;

use jsonnet_ast::{Ast, ExprId, Location, NodeRef};
use jsonnet_analysis::{stack_at_loc, stack_at_node, stack_vars, Resolver, VarMap};
use rustc_hash::FxHashMap;
use tracing::error;
use url::Url;

use crate::session::{Session, SessionState};

pub struct SessionResolver<'a> {
    uri: Url,
    root: Arc<Ast>,
    session: &'a Session,
    state: RefCell<ResolverState>,
}

#[derive(Default)]
struct ResolverState {
    roots: FxHashMap<String, Arc<Ast>>,
    stack_cache: FxHashMap<(Arc<str>, ExprId), Vec<ExprId>>,
    session: Option<Arc<SessionState>>,
}

impl<'a> SessionResolver<'a> {
    pub fn new(uri: Url, root: Arc<Ast>, session: &'a Session) -> Self {
        let mut roots = FxHashMap::default();
        roots.insert(root.filename().to_string(), root.clone());
        SessionResolver {
            uri,
            root,
            session,
            state: RefCell::new(ResolverState {
                roots,
                ..ResolverState::default()
            }),
        }
    }

    pub fn root(&self) -> &Arc<Ast> {
        &self.root
    }

    fn refs(ast: &Arc<Ast>, stack: Vec<ExprId>) -> Vec<NodeRef> {
        stack
            .into_iter()
            .map(|id| NodeRef::new(ast.clone(), id))
            .collect()
    }
}

impl Resolver for SessionResolver<'_> {
    fn vars(&self, from: &NodeRef) -> VarMap {
        let filename = from.filename().clone();
        let root = {
            let state = self.state.borrow();
            state.roots.get(&*filename).cloned()
        };
        let Some(root) = root else {
            // resolving a var from a file no root was imported for
            error!(file = %filename, "variable resolution outside any known root");
            return VarMap::new();
        };

        let cached = {
            let state = self.state.borrow();
            state.stack_cache.get(&(filename.clone(), from.id)).cloned()
        };
        let stack = match cached {
            Some(stack) => stack,
            None => stack_at_node(&root, from.id),
        };
        stack_vars(&Self::refs(&root, stack))
    }

    fn node_at(&self, loc: Location) -> Option<(NodeRef, Vec<NodeRef>)> {
        let stack = stack_at_loc(&self.root, loc);
        let &node_id = stack.last()?;
        self.state
            .borrow_mut()
            .stack_cache
            .insert((self.root.filename().clone(), node_id), stack.clone());
        let refs = Self::refs(&self.root, stack);
        Some((NodeRef::new(self.root.clone(), node_id), refs))
    }

    fn import(&self, from: &str, path: &str) -> Option<NodeRef> {
        // grab the session lazily: queries that never import stay cheap
        let session = {
            let mut state = self.state.borrow_mut();
            if state.session.is_none() {
                state.session = Some(self.session.get(&self.uri));
            }
            state.session.as_ref().unwrap().clone()
        };

        let root = session.import_ast(from, path)?;
        self.state
            .borrow_mut()
            .roots
            .insert(root.filename().to_string(), root.ast.clone());
        Some(root)
    }
}
