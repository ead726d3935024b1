//! Value deduction.
//!
//! `node_to_value` maps an AST node to a structured summary of what it
//! evaluates to: inferred type, declared hint, object shape, function
//! signature, origin node, and the doc comments around it. It is total and
//! never panics; recursion is capped so pathological inputs (self-referring
//! locals, deep templates) still return a well-formed `any` value.

use std::fmt;
use std::sync::Arc;

use jsonnet_ast::{BinaryOp, ExprKind, LocationRange, NodeRef};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::resolver::Resolver;
use crate::stdlib;
use crate::typehint::{
    infer_type_parameters, solve_type_parameter_info, type_hint_comments_to_info, TypeInfo,
};
use crate::vars::VarMap;
use crate::walk::unwind_locals;

/// Deduction recursion cap. Beyond this the deducer returns `any`.
pub const MAX_DEDUCTION_DEPTH: usize = 300;

/// Coarse value classification.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ValueType {
    #[default]
    Any,
    Function,
    Object,
    Array,
    Boolean,
    Number,
    String,
    Null,
    TypeParameter,
    Union,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::Function => "function",
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Null => "null",
            ValueType::TypeParameter => "typeparam",
            ValueType::Union => "union",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A function parameter as the analysis sees it.
#[derive(Clone, Debug, Default)]
pub struct Param {
    pub name: String,
    pub comment: Vec<String>,
    pub range: Option<LocationRange>,
    pub ty: ValueType,
    pub default: Option<NodeRef>,
    /// True when the parameter may be omitted. Catalogue entries have no
    /// default node but still mark optional parameters.
    pub has_default: bool,
    pub type_hint: Option<TypeInfo>,
}

impl Param {
    /// Signature-help label: `name`, `name: type`, `name=null`.
    pub fn label(&self) -> String {
        let mut res = self.name.clone();
        if self.ty != ValueType::Any {
            res.push_str(": ");
            res.push_str(self.ty.name());
        }
        if self.has_default {
            res.push_str("=null");
        }
        res
    }
}

/// A deduced function signature.
#[derive(Clone, Debug, Default)]
pub struct Function {
    pub comment: Vec<String>,
    pub params: Vec<Param>,
    /// The trailing return expression, if the function has a body.
    pub ret: Option<NodeRef>,
    pub return_type: ValueType,
    pub return_hint: Option<TypeInfo>,
}

impl Function {
    /// `(a, b: string)` plus ` -> type` when the return type is known.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(Param::label).collect();
        let mut res = format!("({})", params.join(", "));
        if self.return_type != ValueType::Any {
            res.push_str(" -> ");
            res.push_str(self.return_type.name());
        }
        res
    }
}

/// A known object field.
#[derive(Clone, Debug, Default)]
pub struct Field {
    pub name: String,
    pub ty: TypeInfo,
    pub type_hint: Option<TypeInfo>,
    pub range: Option<LocationRange>,
    pub comment: Vec<String>,
    pub hidden: bool,
    pub node: Option<NodeRef>,
}

/// A deduced object shape. Lookups consult own fields first, then supers in
/// reverse order (right-biased `+` templating without cycles).
#[derive(Clone, Debug, Default)]
pub struct Object {
    pub fields: Vec<Field>,
    pub(crate) index: FxHashMap<String, usize>,
    pub all_fields_known: bool,
    pub supers: Vec<Value>,
}

impl Object {
    pub fn push_field(&mut self, field: Field) {
        match self.index.get(&field.name) {
            Some(&i) => self.fields[i] = field,
            None => {
                self.index.insert(field.name.clone(), self.fields.len());
                self.fields.push(field);
            }
        }
    }

    pub fn has_own_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        if let Some(&i) = self.index.get(name) {
            return Some(&self.fields[i]);
        }
        for sup in self.supers.iter().rev() {
            if let Some(obj) = sup.ty.object() {
                if let Some(&i) = obj.index.get(name) {
                    return Some(&obj.fields[i]);
                }
            }
        }
        None
    }
}

/// A structured summary of what an expression evaluates to.
#[derive(Clone, Debug, Default)]
pub struct Value {
    pub range: Option<LocationRange>,
    pub comment: Vec<String>,
    pub node: Option<NodeRef>,
    /// What we infer from the expression itself.
    pub ty: TypeInfo,
    /// What annotations claim, possibly propagated from a return hint or an
    /// object field.
    pub type_hint: Option<TypeInfo>,
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        self.ty.value_type()
    }

    pub fn function(&self) -> Option<&Arc<Function>> {
        self.ty.function()
    }

    pub fn object(&self) -> Option<&Arc<Object>> {
        self.ty.object()
    }

    /// Identity check against the standard-library singleton.
    pub fn is_stdlib(&self) -> bool {
        match (self.object(), stdlib::stdlib_value().object()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Binary operators with a fixed result type: comparisons and logical
/// connectives yield booleans; `%` over a string left operand formats to a
/// string.
fn binary_known_type(node: &NodeRef, op: BinaryOp, left: jsonnet_ast::ExprId) -> (ValueType, bool) {
    match op {
        BinaryOp::And
        | BinaryOp::Or
        | BinaryOp::Greater
        | BinaryOp::GreaterEq
        | BinaryOp::In
        | BinaryOp::Less
        | BinaryOp::LessEq
        | BinaryOp::ManifestEqual
        | BinaryOp::ManifestUnequal => (ValueType::Boolean, true),
        BinaryOp::Percent => {
            if matches!(node.ast.kind(left), ExprKind::LiteralString { .. }) {
                (ValueType::String, true)
            } else {
                (ValueType::Any, false)
            }
        }
        _ => (ValueType::Any, false),
    }
}

/// Intrinsic `$std` calls produced by desugaring, with their known result
/// types: object comprehension merge, array comprehension, `%` formatting,
/// and slicing.
fn known_apply(node: &NodeRef, target: jsonnet_ast::ExprId) -> (ValueType, bool) {
    let ExprKind::Index {
        target: idx_target,
        index,
    } = node.ast.kind(target)
    else {
        return (ValueType::Any, false);
    };
    let (ExprKind::Var { name: module }, ExprKind::LiteralString { value: func }) =
        (node.ast.kind(*idx_target), node.ast.kind(*index))
    else {
        return (ValueType::Any, false);
    };
    if module != "$std" {
        return (ValueType::Any, false);
    }
    match func.as_str() {
        "$objectFlatMerge" => (ValueType::Object, true),
        "flatMap" | "slice" => (ValueType::Array, true),
        "mod" => (ValueType::String, true),
        _ => (ValueType::Any, false),
    }
}

/// Map a node to its coarse type without recursion. The second value marks
/// terminal nodes whose type fully determines the value.
pub fn simple_value_type(node: &NodeRef) -> (ValueType, bool) {
    match node.kind() {
        ExprKind::LiteralNull => (ValueType::Null, true),
        ExprKind::ImportStr { .. } | ExprKind::ImportBin { .. } => (ValueType::String, true),
        ExprKind::Apply { target, .. } => known_apply(node, *target),
        ExprKind::Binary { op, left, .. } => binary_known_type(node, *op, *left),
        ExprKind::LiteralBoolean(_) => (ValueType::Boolean, false),
        ExprKind::LiteralNumber { .. } => (ValueType::Number, false),
        ExprKind::LiteralString { .. } => (ValueType::String, false),
        ExprKind::Array { .. } => (ValueType::Array, false),
        ExprKind::Object { .. } => (ValueType::Object, false),
        ExprKind::Function { .. } => (ValueType::Function, false),
        _ => (ValueType::Any, false),
    }
}

fn default_value(node: &NodeRef) -> Value {
    let (ty, _) = simple_value_type(node);
    Value {
        range: Some(node.loc_range()),
        comment: node.open_comments().to_vec(),
        node: None,
        ty: TypeInfo::from_value_type(ty),
        type_hint: None,
    }
}

/// Deduce the value of `node`. Total; see [`MAX_DEDUCTION_DEPTH`].
pub fn node_to_value(node: &NodeRef, resolver: &dyn Resolver) -> Value {
    node_to_value_at(node, resolver, 0)
}

pub(crate) fn node_to_value_at(node: &NodeRef, resolver: &dyn Resolver, depth: usize) -> Value {
    if depth >= MAX_DEDUCTION_DEPTH {
        trace!("value deduction depth cap reached");
        return default_value(node);
    }
    let depth = depth + 1;

    // short circuit nodes whose type cannot carry more structure
    if simple_value_type(node).1 {
        return default_value(node);
    }

    match node.kind() {
        ExprKind::Array { .. } => Value {
            ty: TypeInfo::Array(None),
            node: Some(node.clone()),
            range: Some(node.loc_range()),
            comment: node.open_comments().to_vec(),
            type_hint: None,
        },
        ExprKind::LiteralString { value } => Value {
            ty: TypeInfo::String,
            node: Some(node.clone()),
            range: Some(node.loc_range()),
            comment: vec![value.clone()],
            type_hint: None,
        },
        ExprKind::LiteralNumber { original, .. } => Value {
            ty: TypeInfo::Number,
            node: Some(node.clone()),
            range: Some(node.loc_range()),
            comment: vec![original.clone()],
            type_hint: None,
        },
        ExprKind::LiteralBoolean(value) => Value {
            ty: TypeInfo::Boolean,
            node: Some(node.clone()),
            range: Some(node.loc_range()),
            comment: vec![value.to_string()],
            type_hint: None,
        },
        ExprKind::Local { binds, .. } => {
            let Some(bind) = binds.first() else {
                return default_value(node);
            };
            let mut value = node_to_value_at(&node.child(bind.body), resolver, depth);
            // the local definition eats comments we'd expect on the child
            value.comment.extend(node.comments().iter().cloned());
            value.comment.extend(bind.comments.iter().cloned());
            value
        }
        ExprKind::Var { name } => {
            if name == "std" {
                return stdlib::stdlib_value().clone();
            }
            if name == "$std" {
                return default_value(node);
            }
            let vars: VarMap = resolver.vars(node);
            let Some(var) = vars.get(name) else {
                return default_value(node);
            };
            // a parameter binding relies on its annotation for a type
            if let Some((param_fn, idx)) = &var.param_fn {
                let hint = param_hint(param_fn, *idx, resolver, depth);
                return Value {
                    node: var.node.clone(),
                    range: Some(var.range.clone()),
                    ty: TypeInfo::from_value_type(var.ty),
                    type_hint: hint,
                    comment: vec![],
                };
            }
            match &var.node {
                Some(bound) => node_to_value_at(bound, resolver, depth),
                None => default_value(node),
            }
        }
        ExprKind::Apply {
            target, positional, ..
        } => {
            let target_fn = node_to_value_at(&node.child(*target), resolver, depth);
            let Some(func) = target_fn.function().cloned() else {
                return default_value(node);
            };

            let mut value = match &func.ret {
                Some(ret) => node_to_value_at(ret, resolver, depth),
                None => Value {
                    ty: TypeInfo::from_value_type(func.return_type),
                    range: Some(node.loc_range()),
                    ..Value::default()
                },
            };

            let Some(return_hint) = &func.return_hint else {
                return value;
            };
            if !return_hint.has_type_param() {
                value.type_hint = Some(return_hint.clone());
                return value;
            }

            // the return hint mentions a type parameter: solve for it
            let positional: Vec<NodeRef> =
                positional.iter().map(|&arg| node.child(arg)).collect();
            let solutions = match infer_type_parameters(&positional, &func, resolver, depth) {
                Ok(solutions) => solutions,
                Err(err) => {
                    value.type_hint = Some(TypeInfo::HintError(err));
                    return value;
                }
            };
            match solve_type_parameter_info(return_hint, &solutions) {
                Ok(solved) => value.type_hint = Some(solved),
                Err(err) => value.type_hint = Some(TypeInfo::HintError(err)),
            }
            value
        }
        ExprKind::Index { target, index } => {
            match node.ast.kind(*index) {
                ExprKind::LiteralNumber { original, .. } => {
                    // numeric index of a literal array
                    let target_val = node_to_value_at(&node.child(*target), resolver, depth);
                    let Ok(idx) = original.parse::<usize>() else {
                        return default_value(node);
                    };
                    let Some(arr_node) = &target_val.node else {
                        return default_value(node);
                    };
                    let ExprKind::Array { elements } = arr_node.kind() else {
                        return default_value(node);
                    };
                    match elements.get(idx) {
                        Some(&elem) => {
                            node_to_value_at(&arr_node.child(elem), resolver, depth)
                        }
                        None => default_value(node),
                    }
                }
                ExprKind::LiteralString { value: field_name } => {
                    // string index of an object
                    let lhs = node_to_value_at(&node.child(*target), resolver, depth);

                    if lhs.is_stdlib() {
                        return stdlib::stdlib_field_value(field_name)
                            .unwrap_or_else(|| default_value(node));
                    }

                    if let Some(obj) = lhs.object() {
                        if let Some(field) = obj.get_field(field_name) {
                            if let Some(field_node) = &field.node {
                                return node_to_value_at(field_node, resolver, depth);
                            }
                        }
                    }
                    default_value(node)
                }
                _ => default_value(node),
            }
        }
        ExprKind::Binary { op, left, right } => {
            if *op == BinaryOp::Plus {
                // object templates: the right side wins, the left becomes a super
                let lhs = node_to_value_at(&node.child(*left), resolver, depth);
                let mut rhs = node_to_value_at(&node.child(*right), resolver, depth);
                if lhs.value_type() == ValueType::Object {
                    if let TypeInfo::Object {
                        object: Some(obj), ..
                    } = &mut rhs.ty
                    {
                        Arc::make_mut(obj).supers.push(lhs);
                        return rhs;
                    }
                }
            }
            default_value(node)
        }
        ExprKind::Object { .. } => object_to_value(node, resolver, depth),
        ExprKind::Function { .. } => function_to_value(node, resolver, depth),
        ExprKind::Import { path, .. } => {
            let path = path.clone();
            import_to_value(node, &path, resolver, depth)
        }
        _ => default_value(node),
    }
}

fn param_hint(
    param_fn: &NodeRef,
    idx: usize,
    resolver: &dyn Resolver,
    depth: usize,
) -> Option<TypeInfo> {
    let ExprKind::Function { params, .. } = param_fn.kind() else {
        return None;
    };
    let param = params.get(idx)?;
    type_hint_comments_to_info(param_fn, resolver, &param.hint_comments, depth)
}

fn function_to_value(node: &NodeRef, resolver: &dyn Resolver, depth: usize) -> Value {
    let ExprKind::Function { params, body } = node.kind() else {
        return default_value(node);
    };

    let body_ref = node.child(*body);
    let (_, ret) = unwind_locals(&body_ref);
    let (return_type, _) = simple_value_type(&ret);

    let mut func = Function {
        comment: vec![],
        params: Vec::with_capacity(params.len()),
        return_hint: type_hint_comments_to_info(node, resolver, body_ref.open_comments(), depth),
        ret: Some(ret),
        return_type,
    };

    for param in params {
        func.params.push(Param {
            name: param.name.clone(),
            default: param.default.map(|d| node.child(d)),
            has_default: param.default.is_some(),
            range: Some(LocationRange::new(
                node.filename().clone(),
                param.name_range,
            )),
            comment: param.comments.clone(),
            ty: ValueType::Any,
            type_hint: type_hint_comments_to_info(node, resolver, &param.hint_comments, depth),
        });
    }

    let ty = TypeInfo::Function(Some(Arc::new(func)));
    Value {
        // for functions the inferred type and the hint are the same thing
        type_hint: Some(ty.clone()),
        ty,
        range: Some(node.loc_range()),
        node: Some(node.clone()),
        comment: node.open_comments().to_vec(),
    }
}

fn object_to_value(node: &NodeRef, resolver: &dyn Resolver, depth: usize) -> Value {
    let ExprKind::Object { fields, .. } = node.kind() else {
        return default_value(node);
    };

    let mut object = Object {
        all_fields_known: true,
        ..Object::default()
    };

    for field in fields {
        let ExprKind::LiteralString { value: name } = node.ast.kind(field.name) else {
            // computed field name; the shape is open
            object.all_fields_known = false;
            continue;
        };
        let body = node.child(field.body);
        let (field_ty, _) = simple_value_type(&body);
        let mut comment = body.open_comments().to_vec();
        comment.extend(field.name_comments.iter().cloned());
        object.push_field(Field {
            name: name.clone(),
            ty: TypeInfo::from_value_type(field_ty),
            type_hint: type_hint_comments_to_info(&body, resolver, body.open_comments(), depth),
            comment,
            range: Some(LocationRange::new(node.filename().clone(), field.range)),
            node: Some(body),
            hidden: field.hide == jsonnet_ast::FieldHide::Hidden,
        });
    }

    Value {
        ty: TypeInfo::Object {
            element: None,
            object: Some(Arc::new(object)),
        },
        range: Some(node.loc_range()),
        node: Some(node.clone()),
        comment: node.open_comments().to_vec(),
        type_hint: None,
    }
}

fn import_to_value(node: &NodeRef, path: &str, resolver: &dyn Resolver, depth: usize) -> Value {
    let from = node.filename().to_string();
    if let Some(root) = resolver.import(&from, path) {
        // an import evaluates to the file's trailing expression
        let (_, ret) = unwind_locals(&root);
        return node_to_value_at(&ret, resolver, depth);
    }
    Value {
        ty: TypeInfo::Any,
        range: Some(node.loc_range()),
        ..Value::default()
    }
}
