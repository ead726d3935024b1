//! The desugared expression tree.
//!
//! Nodes live in a per-document arena (`Ast`) and reference each other by
//! `ExprId`. The variant set matches the shape the parser produces *after*
//! desugaring: objects are already in field/local/assert form, comprehensions
//! have been lowered to `$std` intrinsic calls, and dotted access is plain
//! string indexing. Analysis code is written as exhaustive matches over
//! `ExprKind` so a new syntactic form forces compile-time coverage.
//!
//! Comment trivia is carried where the analysis reads it: every node keeps
//! the comments that preceded its first token, and parameters, binds, and
//! object fields keep the extra comment slots type annotations live in.

use std::fmt;
use std::sync::Arc;

use crate::location::{LocationRange, Range};

/// Index of an expression inside its document's arena.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ExprId(pub u32);

impl ExprId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One arena slot: the node kind, its source range, and the comments that
/// appeared immediately before it.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: Range,
    /// Raw comment text (delimiters included) preceding the node.
    pub comments: Vec<String>,
}

/// Binary operators surviving desugaring.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Mult,
    Div,
    Percent,
    Plus,
    Minus,
    ShiftL,
    ShiftR,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    ManifestEqual,
    ManifestUnequal,
    In,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Mult => "*",
            BinaryOp::Div => "/",
            BinaryOp::Percent => "%",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::ShiftL => "<<",
            BinaryOp::ShiftR => ">>",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::ManifestEqual => "==",
            BinaryOp::ManifestUnequal => "!=",
            BinaryOp::In => "in",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseXor => "^",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(s)
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Not,
    BitwiseNot,
    Plus,
    Minus,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Not => "!",
            UnaryOp::BitwiseNot => "~",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
        };
        f.write_str(s)
    }
}

/// Function parameter.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub name_range: Range,
    pub default: Option<ExprId>,
    /// Comments documenting the parameter (gathered from around it).
    pub comments: Vec<String>,
    /// Comments at the annotation position: after the name and before the
    /// default's `=`, the separating comma, or the closing paren.
    pub hint_comments: Vec<String>,
}

/// A `local` bind (also used for object-level locals).
#[derive(Clone, Debug)]
pub struct LocalBind {
    pub var: String,
    pub var_range: Range,
    pub body: ExprId,
    /// Comments around the bind that document the bound value.
    pub comments: Vec<String>,
}

/// Field visibility markers: `:`, `::`, `:::`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FieldHide {
    Visible,
    Hidden,
    ForceVisible,
}

/// A desugared object field. The name is an arena expression: a literal
/// string for fixed names, anything else for computed ones.
#[derive(Clone, Debug)]
pub struct ObjectField {
    pub name: ExprId,
    pub body: ExprId,
    pub hide: FieldHide,
    pub range: Range,
    /// Comments attached to the field name.
    pub name_comments: Vec<String>,
}

/// Named argument in a call.
#[derive(Clone, Debug)]
pub struct NamedArg {
    pub name: String,
    pub name_range: Range,
    pub arg: ExprId,
}

/// Expression kinds, one per desugared syntactic form.
#[derive(Clone, Debug)]
pub enum ExprKind {
    Apply {
        target: ExprId,
        positional: Vec<ExprId>,
        named: Vec<NamedArg>,
        tailstrict: bool,
    },
    Array {
        elements: Vec<ExprId>,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Conditional {
        cond: ExprId,
        branch_true: ExprId,
        branch_false: ExprId,
    },
    Dollar,
    Error {
        expr: ExprId,
    },
    Function {
        params: Vec<Param>,
        body: ExprId,
    },
    /// `import "path"`; the path has been folded to a literal at parse time.
    Import {
        path: String,
        path_range: Range,
    },
    ImportStr {
        path: String,
        path_range: Range,
    },
    ImportBin {
        path: String,
        path_range: Range,
    },
    Index {
        target: ExprId,
        index: ExprId,
    },
    InSuper {
        index: ExprId,
    },
    LiteralBoolean(bool),
    LiteralNull,
    LiteralNumber {
        value: f64,
        original: String,
    },
    LiteralString {
        value: String,
    },
    Local {
        binds: Vec<LocalBind>,
        body: ExprId,
    },
    Object {
        locals: Vec<LocalBind>,
        fields: Vec<ObjectField>,
        asserts: Vec<ExprId>,
    },
    SelfExpr,
    SuperIndex {
        index: ExprId,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    Var {
        name: String,
    },
}

/// A parsed document: the arena plus its root and filename.
#[derive(Debug)]
pub struct Ast {
    filename: Arc<str>,
    exprs: Vec<Expr>,
    root: ExprId,
}

impl Ast {
    pub fn new(filename: Arc<str>, exprs: Vec<Expr>, root: ExprId) -> Self {
        debug_assert!(root.index() < exprs.len());
        Ast {
            filename,
            exprs,
            root,
        }
    }

    #[inline]
    pub fn filename(&self) -> &Arc<str> {
        &self.filename
    }

    #[inline]
    pub fn root(&self) -> ExprId {
        self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id.index()].kind
    }

    #[inline]
    pub fn range(&self, id: ExprId) -> Range {
        self.exprs[id.index()].range
    }

    #[inline]
    pub fn comments(&self, id: ExprId) -> &[String] {
        &self.exprs[id.index()].comments
    }

    /// Comments preceding the node's first token. Left-recursive forms
    /// (application, indexing, binary operators, `in super`) start with
    /// their leftmost child's token, so the lookup descends to it.
    pub fn open_comments(&self, id: ExprId) -> &[String] {
        let mut cur = id;
        loop {
            match self.kind(cur) {
                ExprKind::Apply { target, .. } | ExprKind::Index { target, .. } => cur = *target,
                ExprKind::Binary { left, .. } => cur = *left,
                ExprKind::InSuper { index } => cur = *index,
                _ => return self.comments(cur),
            }
        }
    }

    /// Full range including the filename, for results that leave this file.
    pub fn loc_range(&self, id: ExprId) -> LocationRange {
        LocationRange::new(self.filename.clone(), self.range(id))
    }
}

/// A node reference that keeps its document alive. This is the currency the
/// analysis layer trades in: values and variable bindings may point into
/// imported documents, not just the active one.
#[derive(Clone)]
pub struct NodeRef {
    pub ast: Arc<Ast>,
    pub id: ExprId,
}

impl NodeRef {
    pub fn new(ast: Arc<Ast>, id: ExprId) -> Self {
        NodeRef { ast, id }
    }

    pub fn root(ast: &Arc<Ast>) -> Self {
        NodeRef {
            ast: ast.clone(),
            id: ast.root(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ExprKind {
        self.ast.kind(self.id)
    }

    #[inline]
    pub fn range(&self) -> Range {
        self.ast.range(self.id)
    }

    pub fn loc_range(&self) -> LocationRange {
        self.ast.loc_range(self.id)
    }

    #[inline]
    pub fn comments(&self) -> &[String] {
        self.ast.comments(self.id)
    }

    /// See [`Ast::open_comments`].
    pub fn open_comments(&self) -> &[String] {
        self.ast.open_comments(self.id)
    }

    pub fn filename(&self) -> &Arc<str> {
        self.ast.filename()
    }

    /// Identity: same document, same arena slot.
    pub fn same_node(&self, other: &NodeRef) -> bool {
        Arc::ptr_eq(&self.ast, &other.ast) && self.id == other.id
    }

    pub fn child(&self, id: ExprId) -> NodeRef {
        NodeRef {
            ast: self.ast.clone(),
            id,
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({}#{})", self.ast.filename(), self.id.0)
    }
}

/// Arena builder used by the parser.
#[derive(Debug, Default)]
pub struct AstBuilder {
    exprs: Vec<Expr>,
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder { exprs: Vec::new() }
    }

    pub fn alloc(&mut self, kind: ExprKind, range: Range, comments: Vec<String>) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr {
            kind,
            range,
            comments,
        });
        id
    }

    /// Patch a node's range after its full extent is known.
    pub fn set_range(&mut self, id: ExprId, range: Range) {
        self.exprs[id.index()].range = range;
    }

    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id.index()].kind
    }

    pub fn range(&self, id: ExprId) -> Range {
        self.exprs[id.index()].range
    }

    pub fn finish(self, filename: Arc<str>, root: ExprId) -> Ast {
        Ast::new(filename, self.exprs, root)
    }
}
