//! The single-session cache.
//!
//! At most one live import/evaluation session exists, tied to the active
//! URI. Switching files flushes and rebuilds it: this keeps memory flat
//! (no session per open file) at the cost of sub-second rebuild latency on
//! file switch, which only shows when a user edits after switching.

use std::sync::Arc;

use jsonnet_ast::{Ast, NodeRef};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};
use url::Url;

use crate::importer::{CachingImporter, Importer};

/// One session bound to a URI: a memoising importer plus the parsed roots
/// of everything imported through it.
pub struct SessionState {
    uri: Url,
    importer: CachingImporter,
    roots: Mutex<FxHashMap<String, Arc<Ast>>>,
}

impl SessionState {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Resolve and parse an import. Parsed roots are cached by resolved
    /// filename; the underlying content is frozen by the caching importer.
    pub fn import_ast(&self, from: &str, path: &str) -> Option<NodeRef> {
        let imported = match self.importer.import(from, path) {
            Ok(imported) => imported,
            Err(err) => {
                trace!(from, path, %err, "import failed");
                return None;
            }
        };

        {
            let roots = self.roots.lock();
            if let Some(root) = roots.get(&imported.found_at) {
                return Some(NodeRef::root(root));
            }
        }

        let root = match jsonnet_parse::parse(&imported.found_at, &imported.contents) {
            Ok(root) => root,
            Err(err) => {
                trace!(found_at = imported.found_at, %err, "imported file does not parse");
                return None;
            }
        };
        self.roots
            .lock()
            .insert(imported.found_at.clone(), root.clone());
        Some(NodeRef::root(&root))
    }
}

/// Owner of the single active session.
pub struct Session {
    importer: Arc<dyn Importer>,
    active: Mutex<Option<Arc<SessionState>>>,
}

impl Session {
    pub fn new(importer: Arc<dyn Importer>) -> Self {
        Session {
            importer,
            active: Mutex::new(None),
        }
    }

    /// The session for `uri`, flushing the previous one when the active
    /// URI changes.
    pub fn get(&self, uri: &Url) -> Arc<SessionState> {
        let mut active = self.active.lock();
        if let Some(state) = active.as_ref() {
            if state.uri == *uri {
                return state.clone();
            }
        }
        debug!(%uri, "flushing session cache (active file changed)");
        let state = Arc::new(SessionState {
            uri: uri.clone(),
            importer: CachingImporter::new(self.importer.clone()),
            roots: Mutex::new(FxHashMap::default()),
        });
        *active = Some(state.clone());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{ImportError, Imported};

    struct StaticImporter;

    impl Importer for StaticImporter {
        fn import(&self, _from: &str, path: &str) -> Result<Imported, ImportError> {
            if path == "lib.libsonnet" {
                Ok(Imported {
                    contents: Arc::from("{a: 1}"),
                    found_at: "/ws/lib.libsonnet".to_string(),
                })
            } else {
                Err(ImportError {
                    message: "not found".to_string(),
                })
            }
        }
    }

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///ws/{name}")).unwrap()
    }

    #[test]
    fn same_uri_reuses_the_session() {
        let session = Session::new(Arc::new(StaticImporter));
        let a = session.get(&uri("main.jsonnet"));
        let b = session.get(&uri("main.jsonnet"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn switching_uri_flushes() {
        let session = Session::new(Arc::new(StaticImporter));
        let a = session.get(&uri("main.jsonnet"));
        let b = session.get(&uri("other.jsonnet"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn imported_roots_are_shared() {
        let session = Session::new(Arc::new(StaticImporter));
        let state = session.get(&uri("main.jsonnet"));
        let first = state.import_ast("main.jsonnet", "lib.libsonnet").unwrap();
        let second = state.import_ast("main.jsonnet", "lib.libsonnet").unwrap();
        assert!(first.same_node(&second));
        assert!(state.import_ast("main.jsonnet", "nope.libsonnet").is_none());
    }
}
