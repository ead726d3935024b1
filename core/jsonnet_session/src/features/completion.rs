//! Completion.
//!
//! Four policies, checked in order:
//!
//! 1. Inside an `import` path: directory entries for the path's parent
//!    under the root and each search path.
//! 2. After `.`: the left-hand value's fields, with the stdlib fast path.
//! 3. Inside an object literal that is the right operand of `+` over a
//!    known object template: the template's unassigned, visible fields as
//!    snippets.
//! 4. Otherwise: visible variables, innermost scope first.

use jsonnet_ast::{ExprKind, Location, NodeRef};
use jsonnet_analysis::{
    node_to_value, safe_ident, stdlib_value, Resolver, Value, ValueType,
};
use once_cell::sync::Lazy;

use super::value_to_detail;
use crate::importer::WorkspaceDirs;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CompletionKind {
    Field,
    File,
    Folder,
    Function,
    Struct,
    Variable,
}

#[derive(Clone, Debug)]
pub struct CompletionItem {
    pub label: String,
    pub insert_text: Option<String>,
    /// When set, `insert_text` is a snippet with tab stops.
    pub snippet: bool,
    pub detail: Option<String>,
    pub documentation: Option<String>,
    pub kind: CompletionKind,
    pub sort_text: Option<String>,
}

/// How the completion was triggered.
#[derive(Copy, Clone, Default, Debug)]
pub struct CompletionContext {
    pub dot: bool,
    pub slash: bool,
}

fn kind_for(ty: ValueType) -> CompletionKind {
    match ty {
        ValueType::Function => CompletionKind::Function,
        ValueType::Object => CompletionKind::Struct,
        _ => CompletionKind::Variable,
    }
}

static STDLIB_COMPLETIONS: Lazy<Vec<CompletionItem>> = Lazy::new(|| {
    let Some(object) = stdlib_value().object() else {
        return Vec::new();
    };
    object
        .fields
        .iter()
        .map(|field| {
            let detail = field
                .ty
                .function()
                .map(|f| format!("{}{}", field.name, f.signature()))
                .unwrap_or_else(|| field.ty.value_type().to_string());
            CompletionItem {
                label: field.name.clone(),
                insert_text: None,
                snippet: false,
                detail: Some(detail),
                documentation: Some(field.comment.join("\n")),
                kind: CompletionKind::Function,
                sort_text: None,
            }
        })
        .collect()
});

pub fn completion(
    resolver: &dyn Resolver,
    pos: Location,
    ctx: CompletionContext,
    dirs: &dyn WorkspaceDirs,
) -> Vec<CompletionItem> {
    let mut pos = pos;
    if ctx.dot {
        pos.column = pos.column.saturating_sub(1);
    }
    let Some((node, stack)) = resolver.node_at(pos) else {
        return Vec::new();
    };

    // import-path completion
    if let ExprKind::Import { path, .. } = node.kind() {
        let dir = match path.rfind('/') {
            Some(i) => &path[..i],
            None => "",
        };
        return dirs
            .list_dir(dir)
            .into_iter()
            .map(|entry| CompletionItem {
                label: entry.name,
                insert_text: None,
                snippet: false,
                detail: None,
                documentation: None,
                kind: if entry.is_dir {
                    CompletionKind::Folder
                } else {
                    CompletionKind::File
                },
                sort_text: None,
            })
            .collect();
    }
    // only imports complete on '/'
    if ctx.slash {
        return Vec::new();
    }

    if ctx.dot {
        return dot_completion(resolver, &node);
    }

    if let Some(items) = template_field_completion(resolver, &stack) {
        return items;
    }

    variable_completion(resolver, &node)
}

fn dot_completion(resolver: &dyn Resolver, node: &NodeRef) -> Vec<CompletionItem> {
    let value = node_to_value(node, resolver);
    if value.is_stdlib() {
        return STDLIB_COMPLETIONS.clone();
    }
    let Some(object) = value.object() else {
        return Vec::new();
    };

    object
        .fields
        .iter()
        .map(|field| {
            let field_value = match &field.node {
                Some(n) => node_to_value(n, resolver),
                None => Value::default(),
            };
            CompletionItem {
                label: field.name.clone(),
                insert_text: Some(safe_ident(&field.name)),
                snippet: false,
                detail: Some(value_to_detail(&field_value)),
                documentation: Some(field.comment.join("\n")),
                kind: kind_for(field.ty.value_type()),
                sort_text: None,
            }
        })
        .collect()
}

/// Completion inside `template + { … }` (or the `template { … }` sugar):
/// offer the template's fields not yet assigned and not hidden, inserted as
/// snippets.
fn template_field_completion(
    resolver: &dyn Resolver,
    stack: &[NodeRef],
) -> Option<Vec<CompletionItem>> {
    if stack.len() < 2 {
        return None;
    }
    let obj_node = &stack[stack.len() - 1];
    let bin_node = &stack[stack.len() - 2];

    let ExprKind::Binary {
        op: jsonnet_ast::BinaryOp::Plus,
        left,
        ..
    } = bin_node.kind()
    else {
        return None;
    };
    let ExprKind::Object { fields, .. } = obj_node.kind() else {
        return None;
    };

    let lhs = node_to_value(&bin_node.child(*left), resolver);
    let template = lhs.object()?;
    if template.fields.is_empty() {
        return None;
    }

    let mut already: Vec<&str> = Vec::new();
    for field in fields {
        if let ExprKind::LiteralString { value } = obj_node.ast.kind(field.name) {
            already.push(value);
        }
    }

    let items: Vec<CompletionItem> = template
        .fields
        .iter()
        .filter(|f| !f.hidden && !already.contains(&f.name.as_str()))
        .map(|field| CompletionItem {
            label: field.name.clone(),
            insert_text: Some(format!("{}: $1,$0", safe_ident(&field.name))),
            snippet: true,
            detail: Some(field.ty.to_string()),
            documentation: Some(field.comment.join("\n")),
            kind: CompletionKind::Field,
            sort_text: None,
        })
        .collect();
    Some(items)
}

fn variable_completion(resolver: &dyn Resolver, node: &NodeRef) -> Vec<CompletionItem> {
    let vars = resolver.vars(node);
    let mut items = Vec::with_capacity(vars.len());
    for var in vars.iter() {
        // innermost bindings first
        let sort_text = format!("{:03}_{}", 999usize.saturating_sub(var.stack_pos), var.name);
        match &var.node {
            Some(bound) => {
                let value = node_to_value(bound, resolver);
                items.push(CompletionItem {
                    label: var.name.clone(),
                    insert_text: Some(var.name.clone()),
                    snippet: false,
                    detail: Some(value.value_type().to_string()),
                    documentation: Some(value.comment.join("\n")),
                    kind: kind_for(value.value_type()),
                    sort_text: Some(sort_text),
                });
            }
            None => {
                items.push(CompletionItem {
                    label: var.name.clone(),
                    insert_text: None,
                    snippet: false,
                    detail: None,
                    documentation: None,
                    kind: CompletionKind::Variable,
                    sort_text: Some(sort_text),
                });
            }
        }
    }
    items
}
