//! Depth-first traversal with parent stacks.
//!
//! Every operation here works on one document's arena; node references
//! crossing documents are handled a level up, in the resolver.

use jsonnet_ast::{Ast, ExprId, ExprKind, Location, NodeRef};

/// Walk the tree depth first. The visitor sees each node with the stack of
/// its ancestors (innermost last, the node itself included). Returning
/// `false` skips the node's subtree.
pub fn walk<F>(ast: &Ast, visitor: &mut F)
where
    F: FnMut(ExprId, &[ExprId]) -> bool,
{
    let mut stack = Vec::with_capacity(32);
    walk_inner(ast, ast.root(), &mut stack, visitor);
}

fn walk_inner<F>(ast: &Ast, id: ExprId, stack: &mut Vec<ExprId>, visitor: &mut F)
where
    F: FnMut(ExprId, &[ExprId]) -> bool,
{
    stack.push(id);
    if visitor(id, stack) {
        for child in jsonnet_ast::children(ast, id) {
            walk_inner(ast, child, stack, visitor);
        }
    }
    stack.pop();
}

/// Containment check: inclusive at `begin`, and also inclusive at the `end`
/// boundary column so a cursor sitting right after the last character (the
/// common completion position) still counts as inside.
pub fn loc_in_node(ast: &Ast, id: ExprId, pos: Location) -> bool {
    let range = ast.range(id);
    let (begin, end) = (range.begin, range.end);
    if pos.line < begin.line || pos.line > end.line {
        return false;
    }
    if pos.line == begin.line && pos.column < begin.column {
        return false;
    }
    if pos.line == end.line && pos.column > end.column {
        return false;
    }
    true
}

/// The deepest stack whose innermost node contains `loc`; ties broken by
/// maximal depth.
pub fn stack_at_loc(ast: &Ast, loc: Location) -> Vec<ExprId> {
    let mut res: Vec<ExprId> = Vec::new();
    walk(ast, &mut |id, stack| {
        if !loc_in_node(ast, id, loc) {
            return false;
        }
        if stack.len() > res.len() {
            res.clear();
            res.extend_from_slice(stack);
        }
        true
    });
    res
}

/// The stack ending at `target`: exact arena identity first, falling back
/// to the deepest stack at the node's end position.
pub fn stack_at_node(ast: &Ast, target: ExprId) -> Vec<ExprId> {
    let mut res: Vec<ExprId> = Vec::new();
    let mut found = false;
    walk(ast, &mut |id, stack| {
        if found {
            return false;
        }
        if id == target {
            res.extend_from_slice(stack);
            found = true;
            return false;
        }
        true
    });
    if found {
        return res;
    }
    stack_at_loc(ast, ast.range(target).end)
}

/// Descend through local wrappers and assertions (conditionals whose false
/// branch is an explicit `error`), returning the accumulated local nodes and
/// the trailing expression.
pub fn unwind_locals(root: &NodeRef) -> (Vec<NodeRef>, NodeRef) {
    let mut locals = Vec::new();
    let mut cur = root.clone();
    loop {
        match cur.kind() {
            ExprKind::Local { body, .. } => {
                let body = *body;
                locals.push(cur.clone());
                cur = cur.child(body);
            }
            ExprKind::Conditional {
                branch_true,
                branch_false,
                ..
            } => {
                if matches!(cur.ast.kind(*branch_false), ExprKind::Error { .. }) {
                    // it's an assertion
                    let next = *branch_true;
                    cur = cur.child(next);
                } else {
                    // it's an actual value
                    return (locals, cur);
                }
            }
            _ => return (locals, cur),
        }
    }
}
