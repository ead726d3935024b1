//! Linter.
//!
//! A single walk over the AST collects per-binding usage counts and checks
//! calls, indexing, and operators against deduced value types. The walk is
//! O(n) in AST size; all type information comes from the resolver-backed
//! deducer, which never parses or imports more than the resolver lazily
//! provides. For a fixed AST the emitted diagnostic sequence is
//! deterministic: diagnostics are sorted before being returned.

mod diag;

use jsonnet_ast::{BinaryOp, ExprId, ExprKind, LocationRange, NodeRef, UnaryOp};
use jsonnet_analysis::{node_to_value, Param, Resolver, TypeInfo, Value, ValueType};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

pub use diag::{
    fmt_diag, has_errors, pos_to_diag, range_to_diag, sort_diags, DiagCode, DiagRange, Diagnostic,
    Position, Severity,
};

struct BindInfo {
    refs: usize,
    loc: LocationRange,
    param: bool,
}

/// Lint a document. `root` must be the document root of its AST.
pub fn lint_ast(root: &NodeRef, resolver: &dyn Resolver) -> Vec<Diagnostic> {
    let ast = &root.ast;
    let mut diags: Vec<Diagnostic> = Vec::new();
    let mut declared: FxHashMap<(ExprId, String), BindInfo> = FxHashMap::default();

    jsonnet_analysis::walk(ast, &mut |id, stack| {
        let node = root.child(id);
        match node.kind() {
            ExprKind::Local { binds, .. } => {
                for bind in binds {
                    declared.insert(
                        (id, bind.var.clone()),
                        BindInfo {
                            refs: 0,
                            loc: LocationRange::new(ast.filename().clone(), bind.var_range),
                            param: false,
                        },
                    );
                }
            }
            ExprKind::Object { locals, .. } => {
                declared.insert(
                    (id, "self".to_string()),
                    BindInfo {
                        refs: 0,
                        loc: node.loc_range(),
                        param: false,
                    },
                );
                for bind in locals {
                    declared.insert(
                        (id, bind.var.clone()),
                        BindInfo {
                            refs: 0,
                            loc: LocationRange::new(ast.filename().clone(), bind.var_range),
                            param: false,
                        },
                    );
                }
            }
            ExprKind::Function { params, .. } => {
                for param in params {
                    declared.insert(
                        (id, param.name.clone()),
                        BindInfo {
                            refs: 0,
                            loc: LocationRange::new(ast.filename().clone(), param.name_range),
                            param: true,
                        },
                    );
                }
            }
            ExprKind::Var { name } => {
                // unknown references fail at evaluation; here we only count
                if let Some(decl) = find_bind_in_stack(&node, name, stack) {
                    if let Some(info) = declared.get_mut(&(decl, name.clone())) {
                        info.refs += 1;
                    }
                }
            }
            ExprKind::Import { path, .. } => {
                let value = node_to_value(&node, resolver);
                if value.node.is_none() && value.value_type() == ValueType::Any {
                    diags.push(Diagnostic {
                        range: range_to_diag(&node.loc_range()),
                        code: Some(DiagCode::ImportNotFound),
                        severity: Severity::Warning,
                        message: format!("import not found: '{path}'"),
                        source: None,
                    });
                }
            }
            ExprKind::Apply {
                target,
                positional,
                named,
                ..
            } => {
                let target_fn = node_to_value(&node.child(*target), resolver);
                check_function_call(
                    &target_fn,
                    &node,
                    positional,
                    named,
                    resolver,
                    &mut diags,
                );
            }
            ExprKind::Index { target, index } => {
                let target_val = node_to_value(&node.child(*target), resolver);
                let index_val = node_to_value(&node.child(*index), resolver);
                check_index(&target_val, &index_val, &node, &mut diags);
            }
            ExprKind::Unary { op, expr } => {
                let operand = node_to_value(&node.child(*expr), resolver);
                check_unary_op(&operand, *op, &node, &mut diags);
            }
            ExprKind::Binary { op, left, right } => {
                let lhs = node_to_value(&node.child(*left), resolver);
                let rhs = node_to_value(&node.child(*right), resolver);
                check_binary_op(&lhs, &rhs, *op, &node, &mut diags);
            }
            _ => {}
        }
        true
    });

    for ((_, name), info) in &declared {
        if info.refs == 0 && !info.param && !name.starts_with('$') && name != "self" {
            diags.push(Diagnostic {
                range: range_to_diag(&info.loc),
                code: Some(DiagCode::UnusedVar),
                severity: Severity::Warning,
                message: format!("unused local variable '{name}'"),
                source: None,
            });
        }
    }

    sort_diags(&mut diags);
    trace!(count = diags.len(), "lint finished");
    diags
}

/// Innermost declaration of `name` in the stack, if any.
fn find_bind_in_stack(node: &NodeRef, name: &str, stack: &[ExprId]) -> Option<ExprId> {
    for &id in stack.iter().rev() {
        match node.ast.kind(id) {
            ExprKind::Local { binds, .. } => {
                if binds.iter().any(|b| b.var == name) {
                    return Some(id);
                }
            }
            ExprKind::Object { locals, .. } => {
                if locals.iter().any(|b| b.var == name) {
                    return Some(id);
                }
            }
            ExprKind::Function { params, .. } => {
                if params.iter().any(|p| p.name == name) {
                    return Some(id);
                }
            }
            _ => {}
        }
    }
    None
}

fn call_diag(
    call: &NodeRef,
    code: DiagCode,
    severity: Severity,
    message: String,
) -> Diagnostic {
    Diagnostic {
        range: range_to_diag(&call.loc_range()),
        code: Some(code),
        severity,
        message,
        source: None,
    }
}

fn check_function_call(
    target: &Value,
    call: &NodeRef,
    positional: &[ExprId],
    named: &[jsonnet_ast::NamedArg],
    resolver: &dyn Resolver,
    diags: &mut Vec<Diagnostic>,
) {
    let func = target.function().cloned();

    // without signature information only duplicate named args are checkable
    if func.is_none() {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for arg in named {
            if !seen.insert(arg.name.as_str()) {
                diags.push(call_diag(
                    call,
                    DiagCode::ArgumentCardinality,
                    Severity::Warning,
                    "duplicate named argument".to_string(),
                ));
            }
        }
    }

    let target_ty = target.value_type();
    if target_ty != ValueType::Any && target_ty != ValueType::Function {
        diags.push(call_diag(
            call,
            DiagCode::TypeMismatch,
            Severity::Error,
            format!("calling non-function type '{target_ty}'"),
        ));
        return;
    }
    let Some(func) = func else { return };

    let args = positional.len() + named.len();
    let nparams = func.params.len();
    if args > nparams {
        diags.push(call_diag(
            call,
            DiagCode::ArgumentCardinality,
            Severity::Error,
            format!("too many arguments in function call ({args} arguments for {nparams} parameters)"),
        ));
    }

    let required = func.params.iter().filter(|p| !p.has_default).count();
    if args < required {
        diags.push(call_diag(
            call,
            DiagCode::ArgumentCardinality,
            Severity::Error,
            format!("too few arguments in function call ({args} arguments for {required} required parameters)"),
        ));
    }

    let mut used: FxHashSet<&str> = FxHashSet::default();
    for (idx, &arg) in positional.iter().enumerate() {
        let Some(param) = func.params.get(idx) else {
            break;
        };
        used.insert(param.name.as_str());
        check_argument_type(param, &call.child(arg), false, call, resolver, diags);
    }

    for arg in named {
        if !used.insert(arg.name.as_str()) {
            diags.push(call_diag(
                call,
                DiagCode::ArgumentCardinality,
                Severity::Warning,
                format!("duplicate named argument '{}'", arg.name),
            ));
        }

        let Some(param) = func.params.iter().find(|p| p.name == arg.name) else {
            diags.push(call_diag(
                call,
                DiagCode::UnknownArgument,
                Severity::Error,
                format!("unknown named argument '{}'", arg.name),
            ));
            continue;
        };
        check_argument_type(param, &call.child(arg.arg), true, call, resolver, diags);
    }
}

/// Compare a parameter's declared type against the argument's inferred
/// type. Either side being `any` skips the check; an explicit `null` named
/// argument is allowed for a null-typed parameter.
fn check_argument_type(
    param: &Param,
    arg: &NodeRef,
    is_named: bool,
    call: &NodeRef,
    resolver: &dyn Resolver,
    diags: &mut Vec<Diagnostic>,
) {
    let hint = if param.ty != ValueType::Any {
        Some(TypeInfo::from_value_type(param.ty))
    } else {
        param.type_hint.clone()
    };
    let Some(hint) = hint else { return };
    if hint.value_type() == ValueType::Any {
        return;
    }

    let arg_val = node_to_value(arg, resolver);
    if arg_val.value_type() == ValueType::Any {
        return;
    }

    if is_named
        && hint.value_type() == ValueType::Null
        && matches!(arg.kind(), ExprKind::LiteralNull)
    {
        return;
    }

    if !arg_val.ty.is_subtype_of(&hint) {
        diags.push(call_diag(
            call,
            DiagCode::TypeMismatch,
            Severity::Warning,
            format!(
                "mismatched argument type for '{}' expected '{}' got '{}'",
                param.name,
                hint.value_type(),
                arg_val.value_type()
            ),
        ));
    }
}

fn value_range(value: &Value, fallback: &NodeRef) -> DiagRange {
    match &value.range {
        Some(range) => range_to_diag(range),
        None => range_to_diag(&fallback.loc_range()),
    }
}

fn check_unary_op(operand: &Value, op: UnaryOp, node: &NodeRef, diags: &mut Vec<Diagnostic>) {
    if operand.value_type() == ValueType::Any {
        return;
    }
    let expected = match op {
        UnaryOp::Not => ValueType::Boolean,
        UnaryOp::BitwiseNot | UnaryOp::Plus | UnaryOp::Minus => ValueType::Number,
    };
    if operand.value_type() != expected {
        diags.push(Diagnostic {
            range: range_to_diag(&node.loc_range()),
            code: Some(DiagCode::TypeMismatch),
            severity: Severity::Warning,
            message: format!(
                "expected {expected} for operand of unary operator '{op}' but got type '{}'",
                operand.value_type()
            ),
            source: None,
        });
    }
}

fn check_index(target: &Value, index: &Value, node: &NodeRef, diags: &mut Vec<Diagnostic>) {
    let target_ty = target.value_type();
    let index_ty = index.value_type();
    if target_ty == ValueType::Any || index_ty == ValueType::Any || target_ty == ValueType::Null {
        return;
    }

    match target_ty {
        ValueType::Array => {
            if index_ty != ValueType::Number {
                diags.push(Diagnostic {
                    range: range_to_diag(&node.loc_range()),
                    code: Some(DiagCode::TypeMismatch),
                    severity: Severity::Error,
                    message: format!("cannot index array with type '{index_ty}' (expected number)"),
                    source: None,
                });
            }
        }
        ValueType::Object => {
            if index_ty != ValueType::String {
                diags.push(Diagnostic {
                    range: range_to_diag(&node.loc_range()),
                    code: Some(DiagCode::TypeMismatch),
                    severity: Severity::Error,
                    message: format!("cannot index object with type '{index_ty}' (expected string)"),
                    source: None,
                });
            }
            let field_name = index.node.as_ref().and_then(|n| match n.kind() {
                ExprKind::LiteralString { value } => Some(value.clone()),
                _ => None,
            });
            if let (Some(name), Some(object)) = (field_name, target.object()) {
                if object.all_fields_known && object.get_field(&name).is_none() {
                    diags.push(Diagnostic {
                        range: range_to_diag(&node.loc_range()),
                        code: Some(DiagCode::UnknownField),
                        severity: Severity::Warning,
                        message: format!("object has no field '{name}'"),
                        source: None,
                    });
                }
            }
        }
        ValueType::String => {
            if index_ty != ValueType::Number {
                diags.push(Diagnostic {
                    range: range_to_diag(&node.loc_range()),
                    code: Some(DiagCode::TypeMismatch),
                    severity: Severity::Error,
                    message: format!("cannot index string with type '{index_ty}' (expected number)"),
                    source: None,
                });
            }
        }
        other => {
            diags.push(Diagnostic {
                range: value_range(target, node),
                code: Some(DiagCode::TypeMismatch),
                severity: Severity::Error,
                message: format!("cannot index type '{other}'"),
                source: None,
            });
        }
    }
}

fn check_binary_op(
    lhs: &Value,
    rhs: &Value,
    op: BinaryOp,
    node: &NodeRef,
    diags: &mut Vec<Diagnostic>,
) {
    let (lt, rt) = (lhs.value_type(), rhs.value_type());
    if lt == ValueType::Any || rt == ValueType::Any {
        return;
    }

    let mut side_check = |value: &Value, ty: ValueType, side: &str, allowed: &[ValueType], expected: &str| {
        if !allowed.contains(&ty) {
            diags.push(Diagnostic {
                range: value_range(value, node),
                code: Some(DiagCode::TypeMismatch),
                severity: Severity::Warning,
                message: format!(
                    "expected {expected} for {side} of operator '{op}' but got type '{ty}'"
                ),
                source: None,
            });
        }
    };

    match op {
        BinaryOp::Div
        | BinaryOp::Mult
        | BinaryOp::Minus
        | BinaryOp::ShiftL
        | BinaryOp::ShiftR
        | BinaryOp::BitwiseAnd
        | BinaryOp::BitwiseOr
        | BinaryOp::BitwiseXor => {
            side_check(lhs, lt, "lhs", &[ValueType::Number], "number");
            side_check(rhs, rt, "rhs", &[ValueType::Number], "number");
        }
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            let comparable = [ValueType::Array, ValueType::String, ValueType::Number];
            side_check(lhs, lt, "lhs", &comparable, "number, array, or string");
            side_check(rhs, rt, "rhs", &comparable, "number, array, or string");
            if lt != rt {
                diags.push(Diagnostic {
                    range: range_to_diag(&node.loc_range()),
                    code: Some(DiagCode::TypeMismatch),
                    severity: Severity::Warning,
                    message: format!(
                        "{op} operator cannot compare different types '{lt}' and '{rt}'"
                    ),
                    source: None,
                });
            }
        }
        BinaryOp::ManifestEqual => {
            if lt != rt {
                diags.push(Diagnostic {
                    range: range_to_diag(&node.loc_range()),
                    code: Some(DiagCode::TypeMismatch),
                    severity: Severity::Warning,
                    message: format!(
                        "equal comparison is never true for different types '{lt}' and '{rt}'"
                    ),
                    source: None,
                });
            }
        }
        BinaryOp::ManifestUnequal => {
            if lt != rt {
                diags.push(Diagnostic {
                    range: range_to_diag(&node.loc_range()),
                    code: Some(DiagCode::TypeMismatch),
                    severity: Severity::Warning,
                    message: format!(
                        "not equal comparison is always true for different types '{lt}' and '{rt}'"
                    ),
                    source: None,
                });
            }
        }
        BinaryOp::Plus => {
            if lt != rt {
                diags.push(Diagnostic {
                    range: range_to_diag(&node.loc_range()),
                    code: Some(DiagCode::TypeMismatch),
                    severity: Severity::Warning,
                    message: format!("+ operator cannot add different types '{lt}' and '{rt}'"),
                    source: None,
                });
            }
        }
        BinaryOp::Percent | BinaryOp::In | BinaryOp::And | BinaryOp::Or => {}
    }
}

#[cfg(test)]
mod tests;
