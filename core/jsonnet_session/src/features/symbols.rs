//! Document symbols: the file's top-level bindings.

use jsonnet_ast::{LocationRange, NodeRef};
use jsonnet_analysis::unwind_locals_vars;

#[derive(Clone, Debug)]
pub struct SymbolInfo {
    pub name: String,
    pub detail: String,
    pub range: LocationRange,
}

pub fn document_symbols(root: &NodeRef) -> Vec<SymbolInfo> {
    let (vars, _) = unwind_locals_vars(root);
    let mut res = Vec::new();
    for name in vars.names() {
        let Some(var) = vars.get(&name) else { continue };
        if var.node.is_none() {
            // the implicit std binding has no location to show
            continue;
        }
        res.push(SymbolInfo {
            name,
            detail: var.ty.to_string(),
            range: var.range.clone(),
        });
    }
    res
}
