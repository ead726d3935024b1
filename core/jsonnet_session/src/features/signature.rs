//! Signature help for the call under the cursor.

use jsonnet_ast::{ExprKind, Location};
use jsonnet_analysis::{node_to_value, Param, Resolver};
use rustc_hash::FxHashSet;

#[derive(Clone, Debug)]
pub struct ParamInfo {
    pub label: String,
    pub documentation: String,
}

#[derive(Clone, Debug)]
pub struct SignatureHelp {
    pub label: String,
    pub documentation: String,
    pub params: Vec<ParamInfo>,
    pub active_param: usize,
}

pub fn signature_help(resolver: &dyn Resolver, pos: Location) -> Option<SignatureHelp> {
    let (node, _) = resolver.node_at(pos)?;
    let ExprKind::Apply {
        target,
        positional,
        named,
        ..
    } = node.kind()
    else {
        return None;
    };

    let target_node = node.child(*target);
    let target_val = node_to_value(&target_node, resolver);
    let func = target_val.function()?.clone();

    // Each positional argument claims a parameter slot in order; the active
    // parameter is the first one not yet covered by a positional or named
    // argument. Partial named arguments don't parse, so this is as precise
    // as the tree allows.
    let mut active_param = 0;
    if positional.len() < func.params.len() {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for param in func.params.iter().take(positional.len()) {
            seen.insert(param.name.as_str());
        }
        for arg in named {
            seen.insert(arg.name.as_str());
        }
        for (i, param) in func.params.iter().enumerate() {
            if !seen.contains(param.name.as_str()) {
                active_param = i;
                break;
            }
        }
    }

    let fn_name = match target_node.kind() {
        ExprKind::Index { index, .. } => match target_node.ast.kind(*index) {
            ExprKind::LiteralString { value } => value.clone(),
            _ => "function".to_string(),
        },
        ExprKind::Var { name } => name.clone(),
        _ => "function".to_string(),
    };

    let params = func
        .params
        .iter()
        .map(|param: &Param| ParamInfo {
            label: param.label(),
            documentation: param.comment.join("\n"),
        })
        .collect();

    Some(SignatureHelp {
        label: format!("{fn_name}{}", func.signature()),
        documentation: target_val.comment.join("\n"),
        params,
        active_param,
    })
}
