//! Visible-variable extraction.
//!
//! `stack_vars` turns a parent stack into the set of bindings visible at
//! its innermost node: locals, object locals, function parameters, plus the
//! implicit `std`, `self` (innermost object), and `$` (outermost object).

use jsonnet_ast::{ExprKind, LocationRange, NodeRef};
use rustc_hash::FxHashMap;

use crate::value::{simple_value_type, ValueType};

/// One visible binding.
#[derive(Clone, Debug)]
pub struct Var {
    pub name: String,
    pub range: LocationRange,
    pub node: Option<NodeRef>,
    pub ty: ValueType,
    /// Index in the stack at which this binding was introduced; deeper
    /// bindings rank higher in completion.
    pub stack_pos: usize,
    /// Set when the binding is a function parameter: the function node and
    /// the parameter index, used to read its annotation.
    pub param_fn: Option<(NodeRef, usize)>,
}

/// Name → binding map with stable insertion order (outer scopes first),
/// shadowing by replacement in place.
#[derive(Clone, Debug, Default)]
pub struct VarMap {
    vars: Vec<Var>,
    index: FxHashMap<String, usize>,
}

impl VarMap {
    pub fn new() -> Self {
        VarMap::default()
    }

    pub fn insert(&mut self, var: Var) {
        match self.index.get(&var.name) {
            Some(&i) => self.vars[i] = var,
            None => {
                self.index.insert(var.name.clone(), self.vars.len());
                self.vars.push(var);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        self.index.get(name).map(|&i| &self.vars[i])
    }

    /// All names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.iter().map(|v| v.name.clone()).collect();
        names.sort();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Var> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Extract the bindings visible at the innermost node of `stack`.
pub fn stack_vars(stack: &[NodeRef]) -> VarMap {
    let mut res = VarMap::new();
    res.insert(Var {
        name: "std".to_string(),
        range: LocationRange::default(),
        node: None,
        ty: ValueType::Object,
        stack_pos: 0,
        param_fn: None,
    });

    let mut first_object: Option<&NodeRef> = None;
    for (pos, node) in stack.iter().enumerate() {
        match node.kind() {
            ExprKind::Local { binds, .. } => {
                for bind in binds {
                    let body = node.child(bind.body);
                    let (ty, _) = simple_value_type(&body);
                    res.insert(Var {
                        name: bind.var.clone(),
                        range: LocationRange::new(node.filename().clone(), bind.var_range),
                        node: Some(body),
                        ty,
                        stack_pos: pos,
                        param_fn: None,
                    });
                }
            }
            ExprKind::Object { locals, .. } => {
                for bind in locals {
                    let body = node.child(bind.body);
                    let (ty, _) = simple_value_type(&body);
                    res.insert(Var {
                        name: bind.var.clone(),
                        range: LocationRange::new(node.filename().clone(), bind.var_range),
                        node: Some(body),
                        ty,
                        stack_pos: pos,
                        param_fn: None,
                    });
                }
                if first_object.is_none() {
                    first_object = Some(node);
                }
                res.insert(Var {
                    name: "self".to_string(),
                    range: node.loc_range(),
                    node: Some(node.clone()),
                    ty: ValueType::Object,
                    stack_pos: pos,
                    param_fn: None,
                });
            }
            ExprKind::Function { params, .. } => {
                for (i, param) in params.iter().enumerate() {
                    res.insert(Var {
                        name: param.name.clone(),
                        range: LocationRange::new(node.filename().clone(), param.name_range),
                        node: param.default.map(|d| node.child(d)),
                        ty: ValueType::Any,
                        stack_pos: pos,
                        param_fn: Some((node.clone(), i)),
                    });
                }
            }
            _ => {}
        }
    }

    if let Some(obj) = first_object {
        res.insert(Var {
            name: "$".to_string(),
            range: obj.loc_range(),
            node: Some(obj.clone()),
            ty: ValueType::Object,
            stack_pos: 1,
            param_fn: None,
        });
    }
    res
}

/// Unwind a document's leading locals and assertions into a `VarMap` plus
/// the trailing expression.
pub fn unwind_locals_vars(root: &NodeRef) -> (VarMap, NodeRef) {
    let (locals, last) = crate::walk::unwind_locals(root);
    (stack_vars(&locals), last)
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "assert"
            | "else"
            | "error"
            | "false"
            | "for"
            | "function"
            | "if"
            | "import"
            | "importstr"
            | "in"
            | "local"
            | "null"
            | "tailstrict"
            | "then"
            | "self"
            | "super"
            | "true"
    )
}

fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Quote a field name for insertion unless it is a plain identifier.
pub fn safe_ident(name: &str) -> String {
    if is_keyword(name) || !is_plain_ident(name) {
        format!("[{name:?}]")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::{stack_at_loc, walk};
    use jsonnet_ast::{Ast, ExprId, Location};
    use std::sync::Arc;

    fn parse(src: &str) -> Arc<Ast> {
        jsonnet_parse::parse("vars.jsonnet", src).unwrap()
    }

    fn stack_refs(ast: &Arc<Ast>, stack: Vec<ExprId>) -> Vec<NodeRef> {
        stack.iter().map(|&id| NodeRef::new(ast.clone(), id)).collect()
    }

    #[test]
    fn std_is_always_visible() {
        let ast = parse("1");
        let stack = stack_refs(&ast, stack_at_loc(&ast, Location::new(1, 1)));
        let vars = stack_vars(&stack);
        let std_var = vars.get("std").unwrap();
        assert_eq!(std_var.ty, ValueType::Object);
        assert_eq!(std_var.stack_pos, 0);
    }

    #[test]
    fn locals_params_and_object_locals() {
        let src = "local a = 1;\n{\n  local b = 'x',\n  f: function(c, d=2) c + a,\n}";
        let ast = parse(src);
        // inside the function body, at `c + a`
        let stack = stack_refs(&ast, stack_at_loc(&ast, Location::new(4, 23)));
        let vars = stack_vars(&stack);

        assert_eq!(vars.get("a").unwrap().ty, ValueType::Number);
        assert_eq!(vars.get("b").unwrap().ty, ValueType::String);
        let c = vars.get("c").unwrap();
        assert!(c.node.is_none());
        assert!(c.param_fn.is_some());
        let d = vars.get("d").unwrap();
        assert!(d.node.is_some());

        // inner bindings sit deeper in the stack
        assert!(c.stack_pos > vars.get("a").unwrap().stack_pos);
    }

    #[test]
    fn self_and_dollar_point_at_objects() {
        let src = "{ a: { b: self.a } }";
        let ast = parse(src);
        let stack = stack_refs(&ast, stack_at_loc(&ast, Location::new(1, 13)));
        let vars = stack_vars(&stack);

        let self_var = vars.get("self").unwrap();
        let dollar = vars.get("$").unwrap();
        assert_eq!(self_var.ty, ValueType::Object);
        assert_eq!(dollar.ty, ValueType::Object);
        // `$` is the outermost object, `self` the innermost
        let self_node = self_var.node.as_ref().unwrap();
        let dollar_node = dollar.node.as_ref().unwrap();
        assert!(dollar_node.range().begin <= self_node.range().begin);
    }

    #[test]
    fn shadowing_replaces_in_place() {
        let src = "local x = 1; local x = 'two'; x";
        let ast = parse(src);
        let mut var_use = None;
        walk(&ast, &mut |id, _| {
            if matches!(ast.kind(id), ExprKind::Var { .. }) {
                var_use = Some(id);
            }
            true
        });
        let stack = stack_refs(&ast, crate::walk::stack_at_node(&ast, var_use.unwrap()));
        let vars = stack_vars(&stack);
        assert_eq!(vars.get("x").unwrap().ty, ValueType::String);
        // only std and the single (shadowed) binding
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn safe_ident_quotes_when_needed() {
        assert_eq!(safe_ident("foo"), "foo");
        assert_eq!(safe_ident("_foo9"), "_foo9");
        assert_eq!(safe_ident("foo-bar"), "[\"foo-bar\"]");
        assert_eq!(safe_ident("error"), "[\"error\"]");
        assert_eq!(safe_ident("9lives"), "[\"9lives\"]");
    }
}
