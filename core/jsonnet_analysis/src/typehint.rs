//! Structured type information and the hint engine.
//!
//! `TypeInfo` is the bridge between three worlds: types inferred from AST
//! shapes, types declared in annotation comments, and generic inference at
//! call sites. Hint failures are values (`TypeInfo::HintError`), never
//! errors: they ride along and surface only on hover/signature output.

use std::fmt;
use std::sync::Arc;

use jsonnet_ast::NodeRef;
use rustc_hash::FxHashMap;

use crate::annotation;
use crate::resolver::Resolver;
use crate::value::{node_to_value_at, Field, Function, Object, Param, ValueType};

/// Structured type of a value or hint.
///
/// `Array`/`Object` may carry an element type (from `array[T]`-style hints);
/// objects may additionally carry a concrete shape. A `Function(None)` is
/// the bare `function` hint with no known signature.
#[derive(Clone, Debug, Default)]
pub enum TypeInfo {
    #[default]
    Any,
    Null,
    Boolean,
    Number,
    String,
    Array(Option<Box<TypeInfo>>),
    Object {
        element: Option<Box<TypeInfo>>,
        object: Option<Arc<Object>>,
    },
    Function(Option<Arc<Function>>),
    Union(Vec<TypeInfo>),
    TypeParameter(String),
    HintError(String),
}

impl TypeInfo {
    pub fn from_value_type(ty: ValueType) -> TypeInfo {
        match ty {
            ValueType::Any => TypeInfo::Any,
            ValueType::Null => TypeInfo::Null,
            ValueType::Boolean => TypeInfo::Boolean,
            ValueType::Number => TypeInfo::Number,
            ValueType::String => TypeInfo::String,
            ValueType::Array => TypeInfo::Array(None),
            ValueType::Object => TypeInfo::Object {
                element: None,
                object: None,
            },
            ValueType::Function => TypeInfo::Function(None),
            ValueType::Union => TypeInfo::Union(vec![]),
            ValueType::TypeParameter => TypeInfo::Any,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            TypeInfo::Any | TypeInfo::HintError(_) => ValueType::Any,
            TypeInfo::Null => ValueType::Null,
            TypeInfo::Boolean => ValueType::Boolean,
            TypeInfo::Number => ValueType::Number,
            TypeInfo::String => ValueType::String,
            TypeInfo::Array(_) => ValueType::Array,
            TypeInfo::Object { .. } => ValueType::Object,
            TypeInfo::Function(_) => ValueType::Function,
            TypeInfo::Union(_) => ValueType::Union,
            TypeInfo::TypeParameter(_) => ValueType::TypeParameter,
        }
    }

    pub fn object(&self) -> Option<&Arc<Object>> {
        match self {
            TypeInfo::Object {
                object: Some(obj), ..
            } => Some(obj),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<&Arc<Function>> {
        match self {
            TypeInfo::Function(Some(f)) => Some(f),
            _ => None,
        }
    }

    pub fn hint_error(&self) -> Option<&str> {
        match self {
            TypeInfo::HintError(msg) => Some(msg),
            _ => None,
        }
    }

    /// Does a type parameter occur anywhere in this type?
    pub fn has_type_param(&self) -> bool {
        match self {
            TypeInfo::TypeParameter(_) => true,
            TypeInfo::Union(members) => members.iter().any(TypeInfo::has_type_param),
            TypeInfo::Array(element)
            | TypeInfo::Object { element, .. } => {
                element.as_deref().is_some_and(TypeInfo::has_type_param)
            }
            TypeInfo::Function(Some(f)) => {
                f.return_hint.as_ref().is_some_and(TypeInfo::has_type_param)
                    || f.params
                        .iter()
                        .any(|p| p.type_hint.as_ref().is_some_and(TypeInfo::has_type_param))
            }
            _ => false,
        }
    }

    /// Structural sub-typing: `any` is universal, unions accept by
    /// membership, arrays/objects compare element-wise only when both sides
    /// declare an element, functions compare arity and per-slot hints.
    pub fn is_subtype_of(&self, other: &TypeInfo) -> bool {
        if matches!(self, TypeInfo::Any | TypeInfo::HintError(_))
            || matches!(other, TypeInfo::Any | TypeInfo::HintError(_))
        {
            return true;
        }
        if let TypeInfo::Union(members) = other {
            return members.iter().any(|m| self.is_subtype_of(m));
        }
        match other {
            TypeInfo::String | TypeInfo::Null | TypeInfo::Boolean | TypeInfo::Number => {
                self.value_type() == other.value_type()
            }
            TypeInfo::Array(other_elem) => {
                if let (TypeInfo::Array(Some(se)), Some(oe)) = (self, other_elem) {
                    return se.is_subtype_of(oe);
                }
                self.value_type() == other.value_type()
            }
            TypeInfo::Object {
                element: other_elem,
                ..
            } => {
                if let (
                    TypeInfo::Object {
                        element: Some(se), ..
                    },
                    Some(oe),
                ) = (self, other_elem)
                {
                    return se.is_subtype_of(oe);
                }
                self.value_type() == other.value_type()
            }
            TypeInfo::Function(other_fn) => {
                let (Some(sf), Some(of)) = (self.function(), other_fn.as_ref()) else {
                    return self.value_type() == other.value_type();
                };
                if sf.params.len() != of.params.len() {
                    return false;
                }
                for (sp, op) in sf.params.iter().zip(of.params.iter()) {
                    let (Some(sh), Some(oh)) = (&sp.type_hint, &op.type_hint) else {
                        continue;
                    };
                    if !sh.is_subtype_of(oh) {
                        return false;
                    }
                }
                if let (Some(sr), Some(or)) = (&sf.return_hint, &of.return_hint) {
                    return sr.is_subtype_of(or);
                }
                true
            }
            TypeInfo::TypeParameter(_) => true,
            TypeInfo::Any | TypeInfo::HintError(_) | TypeInfo::Union(_) => true,
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::HintError(msg) => write!(f, "error {msg:?}"),
            TypeInfo::Any => f.write_str("any"),
            TypeInfo::Null => f.write_str("null"),
            TypeInfo::Boolean => f.write_str("boolean"),
            TypeInfo::Number => f.write_str("number"),
            TypeInfo::String => f.write_str("string"),
            TypeInfo::Array(None) => f.write_str("array"),
            TypeInfo::Array(Some(elem)) => write!(f, "array[{elem}]"),
            TypeInfo::Object {
                element: Some(elem),
                ..
            } => write!(f, "object[{elem}]"),
            TypeInfo::Object { element: None, .. } => f.write_str("object"),
            TypeInfo::TypeParameter(name) => f.write_str(name),
            TypeInfo::Union(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" | "))
            }
            TypeInfo::Function(None) => f.write_str("function"),
            TypeInfo::Function(Some(func)) => {
                let params: Vec<String> = func
                    .params
                    .iter()
                    .map(|p| match &p.type_hint {
                        Some(hint) => format!("{}: {hint}", p.name),
                        None => p.name.clone(),
                    })
                    .collect();
                write!(f, "function({})", params.join(", "))?;
                if let Some(ret) = &func.return_hint {
                    write!(f, " -> {ret}")?;
                }
                Ok(())
            }
        }
    }
}

/// If `comments` start with an annotation comment, return its trimmed body.
pub fn is_type_decl_comments(comments: &[String]) -> Option<String> {
    let first = comments.first()?;
    let body = first.strip_prefix("/*:")?.strip_suffix("*/")?;
    Some(body.trim().to_string())
}

/// Parse and resolve an annotation out of a comment list. `None` when there
/// is no annotation; `Some(HintError)` when there is one but it is broken.
pub fn type_hint_comments_to_info(
    orig: &NodeRef,
    resolver: &dyn Resolver,
    comments: &[String],
    depth: usize,
) -> Option<TypeInfo> {
    let hint = is_type_decl_comments(comments)?;
    let node = match annotation::parse(&hint) {
        Ok(node) => node,
        Err(err) => return Some(TypeInfo::HintError(err)),
    };
    match annotation_to_type_info(Some(orig), &node, Some(resolver), depth) {
        Ok(info) => Some(info),
        Err(err) => Some(TypeInfo::HintError(err)),
    }
}

/// Convert an annotation AST into `TypeInfo`, resolving identifier
/// references through the scope of `orig`. The resolver may be absent for
/// context-free signatures (the stdlib catalogue).
pub fn annotation_to_type_info(
    orig: Option<&NodeRef>,
    node: &annotation::Node,
    resolver: Option<&dyn Resolver>,
    depth: usize,
) -> Result<TypeInfo, String> {
    match node {
        annotation::Node::Null => Ok(TypeInfo::Null),
        annotation::Node::String => Ok(TypeInfo::String),
        annotation::Node::Boolean => Ok(TypeInfo::Boolean),
        annotation::Node::Number => Ok(TypeInfo::Number),
        annotation::Node::TypeParameter(name) => Ok(TypeInfo::TypeParameter(name.clone())),
        annotation::Node::Array(None) => Ok(TypeInfo::Array(None)),
        annotation::Node::Array(Some(elem)) => {
            let elem = annotation_to_type_info(orig, elem, resolver, depth)?;
            Ok(TypeInfo::Array(Some(Box::new(elem))))
        }
        annotation::Node::Union(members) => {
            let mut converted = Vec::with_capacity(members.len());
            for member in members {
                converted.push(annotation_to_type_info(orig, member, resolver, depth)?);
            }
            Ok(TypeInfo::Union(converted))
        }
        annotation::Node::Function { params, ret } => {
            let Some(params) = params else {
                return Ok(TypeInfo::Function(None));
            };
            let mut func = Function {
                params: Vec::with_capacity(params.len()),
                ..Function::default()
            };
            if let Some(ret) = ret {
                func.return_hint = Some(annotation_to_type_info(orig, ret, resolver, depth)?);
            }
            for param in params {
                let type_hint = match &param.ty {
                    Some(ty) => Some(annotation_to_type_info(orig, ty, resolver, depth)?),
                    None => None,
                };
                func.params.push(Param {
                    name: param.name.clone(),
                    type_hint,
                    ..Param::default()
                });
            }
            Ok(TypeInfo::Function(Some(Arc::new(func))))
        }
        annotation::Node::Object { element, fields } => {
            if let Some(elem) = element {
                let elem = annotation_to_type_info(orig, elem, resolver, depth)?;
                return Ok(TypeInfo::Object {
                    element: Some(Box::new(elem)),
                    object: Some(Arc::new(Object::default())),
                });
            }
            if let Some(fields) = fields {
                let mut object = Object {
                    all_fields_known: true,
                    ..Object::default()
                };
                for field in fields {
                    let type_hint = match &field.ty {
                        Some(ty) => Some(annotation_to_type_info(orig, ty, resolver, depth)?),
                        None => None,
                    };
                    object.push_field(Field {
                        name: field.name.clone(),
                        type_hint,
                        ..Field::default()
                    });
                }
                return Ok(TypeInfo::Object {
                    element: None,
                    object: Some(Arc::new(object)),
                });
            }
            Ok(TypeInfo::Object {
                element: None,
                object: Some(Arc::new(Object::default())),
            })
        }
        annotation::Node::Ident(name) => {
            resolve_hint_object(orig, resolver, std::slice::from_ref(name), name, depth)
        }
        annotation::Node::DottedIdent(names) => {
            let dotted = names.join(".");
            resolve_hint_object(orig, resolver, names, &dotted, depth)
        }
    }
}

/// Resolve a (possibly dotted) identifier hint to an object type. Every
/// step must deduce to an object; anything else is a hint error.
fn resolve_hint_object(
    orig: Option<&NodeRef>,
    resolver: Option<&dyn Resolver>,
    names: &[String],
    display: &str,
    depth: usize,
) -> Result<TypeInfo, String> {
    // Context-free resolution (stdlib startup) treats references as any.
    let (Some(orig), Some(resolver)) = (orig, resolver) else {
        return Ok(TypeInfo::Any);
    };

    let first = &names[0];
    let var = resolver
        .vars(orig)
        .get(first)
        .cloned()
        .ok_or_else(|| format!("unknown variable in type hint '{display}'"))?;
    let node = var
        .node
        .ok_or_else(|| format!("unknown variable in type hint '{display}'"))?;
    let mut value = node_to_value_at(&node, resolver, depth + 1);

    for name in &names[1..] {
        let object = value
            .ty
            .object()
            .ok_or_else(|| format!("cannot use non-object variable in type hint '{display}'"))?;
        let field = object
            .get_field(name)
            .ok_or_else(|| format!("unknown field '{name}' in type hint '{display}'"))?;
        let node = field
            .node
            .clone()
            .ok_or_else(|| format!("unknown field '{name}' in type hint '{display}'"))?;
        value = node_to_value_at(&node, resolver, depth + 1);
    }

    match &value.ty {
        TypeInfo::Object { object, .. } => Ok(TypeInfo::Object {
            element: None,
            object: object.clone(),
        }),
        _ => Err(format!(
            "cannot use non-object variable in type hint '{display}'"
        )),
    }
}

/// Unify a caller-side type against a declared parameter type, recording a
/// solution for every type parameter encountered.
pub fn solve_type_param(caller: &TypeInfo, param: &TypeInfo) -> FxHashMap<String, TypeInfo> {
    let mut solutions = FxHashMap::default();

    if let TypeInfo::TypeParameter(name) = param {
        // the whole type is a parameter; direct solution
        solutions.insert(name.clone(), caller.clone());
        return solutions;
    }

    if param.value_type() != caller.value_type() {
        return solutions;
    }

    match (caller, param) {
        (TypeInfo::Array(Some(ce)), TypeInfo::Array(Some(pe))) => {
            solutions.extend(solve_type_param(ce, pe));
        }
        (
            TypeInfo::Object {
                element: Some(ce), ..
            },
            TypeInfo::Object {
                element: Some(pe), ..
            },
        ) => {
            solutions.extend(solve_type_param(ce, pe));
        }
        (TypeInfo::Function(Some(cf)), TypeInfo::Function(Some(pf))) => {
            if let (Some(cr), Some(pr)) = (&cf.return_hint, &pf.return_hint) {
                solutions.extend(solve_type_param(cr, pr));
            }
            for (i, pp) in pf.params.iter().enumerate() {
                let (Some(cp), Some(ph)) = (cf.params.get(i), &pp.type_hint) else {
                    continue;
                };
                if let Some(ch) = &cp.type_hint {
                    solutions.extend(solve_type_param(ch, ph));
                }
            }
        }
        _ => {}
    }

    solutions
}

/// Infer type-parameter solutions for a call. Positional arguments are
/// unified against the declared parameter hints; inconsistent solutions
/// (differing by textual form) are an error.
pub fn infer_type_parameters(
    positional: &[NodeRef],
    target: &Function,
    resolver: &dyn Resolver,
    depth: usize,
) -> Result<FxHashMap<String, TypeInfo>, String> {
    let mut solutions: FxHashMap<String, TypeInfo> = FxHashMap::default();

    for (i, arg) in positional.iter().enumerate() {
        let Some(param) = target.params.get(i) else {
            return Err("too many arguments for function".to_string());
        };
        let Some(param_hint) = &param.type_hint else {
            continue;
        };
        if !param_hint.has_type_param() {
            continue;
        }

        let arg_val = node_to_value_at(arg, resolver, depth + 1);
        let caller_side = arg_val.type_hint.as_ref().unwrap_or(&arg_val.ty);
        for (name, solution) in solve_type_param(caller_side, param_hint) {
            match solutions.get(&name) {
                Some(seen) if seen.to_string() != solution.to_string() => {
                    return Err(format!(
                        "type parameter '{name}' has conflicting inferred types '{seen}' and '{solution}'"
                    ));
                }
                Some(_) => {}
                None => {
                    solutions.insert(name, solution);
                }
            }
        }
    }

    Ok(solutions)
}

/// Substitute solved type parameters into a hint. Unsolved parameters are
/// an error.
pub fn solve_type_parameter_info(
    hint: &TypeInfo,
    solutions: &FxHashMap<String, TypeInfo>,
) -> Result<TypeInfo, String> {
    match hint {
        TypeInfo::TypeParameter(name) => solutions
            .get(name)
            .cloned()
            .ok_or_else(|| format!("unable to resolve type parameter '{name}'")),
        TypeInfo::Array(Some(elem)) => {
            let solved = solve_type_parameter_info(elem, solutions)?;
            Ok(TypeInfo::Array(Some(Box::new(solved))))
        }
        TypeInfo::Object {
            element: Some(elem),
            object,
        } => {
            let solved = solve_type_parameter_info(elem, solutions)?;
            Ok(TypeInfo::Object {
                element: Some(Box::new(solved)),
                object: object.clone(),
            })
        }
        TypeInfo::Function(Some(func)) => {
            let mut solved = (**func).clone();
            for param in &mut solved.params {
                if let Some(hint) = &param.type_hint {
                    param.type_hint = Some(solve_type_parameter_info(hint, solutions)?);
                }
            }
            if let Some(ret) = &solved.return_hint {
                solved.return_hint = Some(solve_type_parameter_info(ret, solutions)?);
            }
            Ok(TypeInfo::Function(Some(Arc::new(solved))))
        }
        // no type parameter can hide anywhere else
        other => Ok(other.clone()),
    }
}
