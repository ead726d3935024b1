//! Debug rendering of nodes and trees, used in logs and test output.

use std::fmt::Write;

use crate::expr::{Ast, ExprId, ExprKind};

/// One-line summary of a node: kind, payload, and location.
pub fn fmt_node(ast: &Ast, id: ExprId) -> String {
    let loc = ast.range(id);
    match ast.kind(id) {
        ExprKind::Var { name } => format!("(var={name})[{loc}]"),
        ExprKind::LiteralString { value } => format!("string:{value:?}"),
        ExprKind::LiteralNumber { original, .. } => format!("number:{original}"),
        ExprKind::LiteralBoolean(v) => format!("boolean:{v}"),
        ExprKind::LiteralNull => "null".to_string(),
        ExprKind::Import { path, .. } => format!("(import={path:?})[{loc}]"),
        other => format!("({})[{loc}]", kind_name(other)),
    }
}

fn kind_name(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Apply { .. } => "apply",
        ExprKind::Array { .. } => "array",
        ExprKind::Binary { .. } => "binary",
        ExprKind::Conditional { .. } => "conditional",
        ExprKind::Dollar => "dollar",
        ExprKind::Error { .. } => "error",
        ExprKind::Function { .. } => "function",
        ExprKind::Import { .. } => "import",
        ExprKind::ImportStr { .. } => "importstr",
        ExprKind::ImportBin { .. } => "importbin",
        ExprKind::Index { .. } => "index",
        ExprKind::InSuper { .. } => "insuper",
        ExprKind::LiteralBoolean(_) => "boolean",
        ExprKind::LiteralNull => "null",
        ExprKind::LiteralNumber { .. } => "number",
        ExprKind::LiteralString { .. } => "string",
        ExprKind::Local { .. } => "local",
        ExprKind::Object { .. } => "object",
        ExprKind::SelfExpr => "self",
        ExprKind::SuperIndex { .. } => "superindex",
        ExprKind::Unary { .. } => "unary",
        ExprKind::Var { .. } => "var",
    }
}

/// Render the whole tree, one node per line, indented by depth.
pub fn print_ast(ast: &Ast) -> String {
    let mut out = String::new();
    print_node(ast, ast.root(), 0, &mut out);
    out
}

fn print_node(ast: &Ast, id: ExprId, depth: usize, out: &mut String) {
    let _ = writeln!(out, "{:indent$}{}", "", fmt_node(ast, id), indent = depth * 2);
    for child in children(ast, id) {
        print_node(ast, child, depth + 1, out);
    }
}

/// Children in source order; mirrors the walker's traversal.
pub fn children(ast: &Ast, id: ExprId) -> Vec<ExprId> {
    match ast.kind(id) {
        ExprKind::Apply {
            target,
            positional,
            named,
            ..
        } => {
            let mut res = vec![*target];
            res.extend(positional.iter().copied());
            res.extend(named.iter().map(|n| n.arg));
            res
        }
        ExprKind::Array { elements } => elements.clone(),
        ExprKind::Binary { left, right, .. } => vec![*left, *right],
        ExprKind::Conditional {
            cond,
            branch_true,
            branch_false,
        } => vec![*cond, *branch_true, *branch_false],
        ExprKind::Error { expr } | ExprKind::Unary { expr, .. } => vec![*expr],
        ExprKind::Function { body, .. } => vec![*body],
        ExprKind::InSuper { index } | ExprKind::SuperIndex { index } => vec![*index],
        ExprKind::Index { target, index } => vec![*target, *index],
        ExprKind::Local { binds, body } => {
            let mut res: Vec<ExprId> = binds.iter().map(|b| b.body).collect();
            res.push(*body);
            res
        }
        ExprKind::Object {
            locals,
            fields,
            asserts,
        } => {
            let mut res: Vec<ExprId> = locals.iter().map(|b| b.body).collect();
            res.extend(fields.iter().map(|f| f.body));
            res.extend(asserts.iter().copied());
            res
        }
        ExprKind::Dollar
        | ExprKind::Import { .. }
        | ExprKind::ImportStr { .. }
        | ExprKind::ImportBin { .. }
        | ExprKind::LiteralBoolean(_)
        | ExprKind::LiteralNull
        | ExprKind::LiteralNumber { .. }
        | ExprKind::LiteralString { .. }
        | ExprKind::SelfExpr
        | ExprKind::Var { .. } => vec![],
    }
}
