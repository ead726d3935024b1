//! Annotation AST.
//!
//! The tree a `/*: … */` hint parses into. Printing a node and re-parsing
//! it yields a structurally equal tree; tests rely on that round trip.

use std::fmt;

/// A parameter inside `function(…)` or a field inside `{…}`.
/// Function parameters may omit the type; object fields never do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamNode {
    pub name: String,
    pub ty: Option<Node>,
}

impl fmt::Display for ParamNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            Some(ty) => write!(f, "{}: {}", self.name, ty),
            None => f.write_str(&self.name),
        }
    }
}

impl ParamNode {
    fn collect_type_parameters(&self, out: &mut Vec<String>) {
        if let Some(ty) = &self.ty {
            ty.collect_type_parameters(out);
        }
    }
}

/// Annotation node kinds.
///
/// `Array`/`Object`/`Function` distinguish the bare keyword (`array`) from
/// the elaborated form (`array[string]`): the bare form carries `None` and
/// prints back as just the keyword.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    String,
    Number,
    Boolean,
    Null,
    /// Single uppercase letter, a generic type parameter.
    TypeParameter(String),
    /// Any other identifier; refers to a variable in scope.
    Ident(String),
    /// `a.b.c` — resolved through object fields.
    DottedIdent(Vec<String>),
    Array(Option<Box<Node>>),
    Object {
        element: Option<Box<Node>>,
        fields: Option<Vec<ParamNode>>,
    },
    Function {
        params: Option<Vec<ParamNode>>,
        ret: Option<Box<Node>>,
    },
    Union(Vec<Node>),
}

impl Node {
    /// All distinct type parameters mentioned anywhere in the node.
    pub fn type_parameters(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_type_parameters(&mut out);
        out
    }

    fn collect_type_parameters(&self, out: &mut Vec<String>) {
        match self {
            Node::TypeParameter(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            Node::Array(Some(elem)) => elem.collect_type_parameters(out),
            Node::Object { element, fields } => {
                if let Some(elem) = element {
                    elem.collect_type_parameters(out);
                }
                if let Some(fields) = fields {
                    for field in fields {
                        field.collect_type_parameters(out);
                    }
                }
            }
            Node::Function { params, ret } => {
                if let Some(params) = params {
                    for param in params {
                        param.collect_type_parameters(out);
                    }
                }
                if let Some(ret) = ret {
                    ret.collect_type_parameters(out);
                }
            }
            Node::Union(members) => {
                for member in members {
                    member.collect_type_parameters(out);
                }
            }
            Node::String
            | Node::Number
            | Node::Boolean
            | Node::Null
            | Node::Ident(_)
            | Node::DottedIdent(_)
            | Node::Array(None) => {}
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::String => f.write_str("string"),
            Node::Number => f.write_str("number"),
            Node::Boolean => f.write_str("boolean"),
            Node::Null => f.write_str("null"),
            Node::TypeParameter(name) | Node::Ident(name) => f.write_str(name),
            Node::DottedIdent(names) => f.write_str(&names.join(".")),
            Node::Array(None) => f.write_str("array"),
            Node::Array(Some(elem)) => write!(f, "array[{elem}]"),
            Node::Object {
                element: None,
                fields: None,
            } => f.write_str("object"),
            Node::Object {
                element: Some(elem),
                ..
            } => write!(f, "object[{elem}]"),
            Node::Object {
                fields: Some(fields),
                ..
            } => {
                let fields: Vec<String> = fields.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", fields.join(", "))
            }
            Node::Function {
                params: None,
                ret: None,
            } => f.write_str("function"),
            Node::Function { params, ret } => {
                let params: Vec<String> = params
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                write!(f, "function({})", params.join(", "))?;
                if let Some(ret) = ret {
                    write!(f, " -> {ret}")?;
                }
                Ok(())
            }
            Node::Union(members) => {
                let members: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&members.join(" | "))
            }
        }
    }
}
