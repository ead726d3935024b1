//! The recursive-descent parser and desugarer.

use std::sync::Arc;

use jsonnet_ast::{
    Ast, AstBuilder, BinaryOp, ExprId, ExprKind, FieldHide, LocalBind, Location, LocationRange,
    NamedArg, ObjectField, Param, Range, UnaryOp,
};
use jsonnet_lexer::{Token, TokenKind};
use tracing::trace;

use crate::ParseError;

enum CompSpec {
    For { var: String, var_range: Range, arr: ExprId },
    If { cond: ExprId },
}

pub(crate) struct Parser {
    filename: Arc<str>,
    tokens: Vec<Token>,
    pos: usize,
    prev_end: Location,
    builder: AstBuilder,
}

impl Parser {
    pub(crate) fn new(filename: Arc<str>, tokens: Vec<Token>) -> Self {
        Parser {
            filename,
            tokens,
            pos: 0,
            prev_end: Location::new(1, 1),
            builder: AstBuilder::new(),
        }
    }

    pub(crate) fn parse_document(mut self) -> Result<Arc<Ast>, ParseError> {
        let root = self.parse_expr()?;
        if self.kind() != &TokenKind::Eof {
            return Err(self.err_here(format!("did not expect {}", self.kind())));
        }
        trace!(file = %self.filename, "parsed document");
        Ok(Arc::new(self.builder.finish(self.filename.clone(), root)))
    }

    // --- token plumbing ---

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self, n: usize) -> &TokenKind {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    fn bump(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        self.prev_end = tok.range.end;
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.kind() == kind {
            Ok(self.bump())
        } else {
            Err(self.err_here(format!("expected {kind} but got {}", self.kind())))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Token), ParseError> {
        match self.kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                Ok((name, self.bump()))
            }
            other => Err(self.err_here(format!("expected identifier but got {other}"))),
        }
    }

    fn err_here(&self, message: String) -> ParseError {
        let range = self.current().range;
        ParseError {
            message,
            range: LocationRange {
                filename: self.filename.clone(),
                begin: range.begin,
                end: range.end,
            },
        }
    }

    fn alloc_from(&mut self, kind: ExprKind, begin: Location, comments: Vec<String>) -> ExprId {
        let range = Range::new(begin, self.prev_end);
        self.builder.alloc(kind, range, comments)
    }

    fn synthetic(&mut self, kind: ExprKind, range: Range) -> ExprId {
        self.builder.alloc(kind, range, Vec::new())
    }

    fn begin_of(&self, id: ExprId) -> Location {
        self.builder.range(id).begin
    }

    // --- expressions ---

    fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        match self.kind() {
            TokenKind::Local => self.parse_local(),
            TokenKind::If => self.parse_if(),
            TokenKind::Function => self.parse_function(),
            TokenKind::Error => self.parse_error_expr(),
            TokenKind::Assert => self.parse_assert_expr(),
            TokenKind::Import | TokenKind::ImportStr | TokenKind::ImportBin => self.parse_import(),
            _ => self.parse_binary(1),
        }
    }

    fn parse_local(&mut self) -> Result<ExprId, ParseError> {
        let local_tok = self.bump();
        let begin = local_tok.range.begin;

        let mut binds = Vec::new();
        loop {
            let mut bind = self.parse_bind()?;
            // the separator's fodder documents the bind that just ended
            bind.comments.extend(self.current().fodder.iter().cloned());
            binds.push(bind);
            match self.kind() {
                TokenKind::Comma => {
                    self.bump();
                    if self.kind() == &TokenKind::Semicolon {
                        break;
                    }
                }
                _ => break,
            }
        }
        self.expect(&TokenKind::Semicolon)?;
        let body = self.parse_expr()?;
        Ok(self.alloc_from(
            ExprKind::Local { binds, body },
            begin,
            local_tok.fodder,
        ))
    }

    fn parse_bind(&mut self) -> Result<LocalBind, ParseError> {
        let (var, name_tok) = self.expect_ident()?;
        let mut comments = name_tok.fodder.clone();

        let params = if self.kind() == &TokenKind::ParenL {
            Some(self.parse_params()?)
        } else {
            None
        };

        let assign = self.expect(&TokenKind::Assign)?;
        comments.extend(assign.fodder);
        let value = self.parse_expr()?;

        let body = match params {
            Some((params, paren_comments)) => {
                let mut fn_comments = name_tok.fodder.clone();
                fn_comments.extend(paren_comments);
                let begin = name_tok.range.begin;
                self.alloc_from(
                    ExprKind::Function {
                        params,
                        body: value,
                    },
                    begin,
                    fn_comments,
                )
            }
            None => value,
        };

        Ok(LocalBind {
            var,
            var_range: name_tok.range,
            body,
            comments,
        })
    }

    fn parse_if(&mut self) -> Result<ExprId, ParseError> {
        let if_tok = self.bump();
        let begin = if_tok.range.begin;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Then)?;
        let branch_true = self.parse_expr()?;
        let branch_false = if self.kind() == &TokenKind::Else {
            self.bump();
            self.parse_expr()?
        } else {
            let at = Range::new(self.prev_end, self.prev_end);
            self.synthetic(ExprKind::LiteralNull, at)
        };
        Ok(self.alloc_from(
            ExprKind::Conditional {
                cond,
                branch_true,
                branch_false,
            },
            begin,
            if_tok.fodder,
        ))
    }

    fn parse_function(&mut self) -> Result<ExprId, ParseError> {
        let fn_tok = self.bump();
        let begin = fn_tok.range.begin;
        let (params, paren_comments) = self.parse_params()?;
        let body = self.parse_expr()?;
        let mut comments = fn_tok.fodder;
        comments.extend(paren_comments);
        Ok(self.alloc_from(ExprKind::Function { params, body }, begin, comments))
    }

    /// Parse `( params )`. Returns the parameters plus the fodder of both
    /// paren tokens (function-level documentation in the original layout).
    fn parse_params(&mut self) -> Result<(Vec<Param>, Vec<String>), ParseError> {
        let paren_l = self.expect(&TokenKind::ParenL)?;
        let mut paren_comments = paren_l.fodder;
        let mut params = Vec::new();
        loop {
            if self.kind() == &TokenKind::ParenR {
                let paren_r = self.bump();
                paren_comments.extend(paren_r.fodder);
                break;
            }
            let (name, name_tok) = self.expect_ident()?;

            let mut default = None;
            let hint_comments;
            if self.kind() == &TokenKind::Assign {
                // annotation rides on the `=` token
                hint_comments = self.current().fodder.clone();
                self.bump();
                default = Some(self.parse_expr()?);
            } else {
                // annotation rides on the `,` or `)` that follows
                hint_comments = self.current().fodder.clone();
            }

            let mut comments = name_tok.fodder.clone();
            comments.extend(hint_comments.iter().cloned());
            params.push(Param {
                name,
                name_range: name_tok.range,
                default,
                comments,
                hint_comments,
            });

            match self.kind() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::ParenR => {}
                other => {
                    return Err(
                        self.err_here(format!("expected ',' or ')' in parameters, got {other}"))
                    )
                }
            }
        }
        Ok((params, paren_comments))
    }

    fn parse_error_expr(&mut self) -> Result<ExprId, ParseError> {
        let err_tok = self.bump();
        let begin = err_tok.range.begin;
        let expr = self.parse_expr()?;
        Ok(self.alloc_from(ExprKind::Error { expr }, begin, err_tok.fodder))
    }

    /// `assert cond [: msg]; rest` lowers to `if cond then rest else error msg`.
    fn parse_assert_expr(&mut self) -> Result<ExprId, ParseError> {
        let assert_tok = self.bump();
        let begin = assert_tok.range.begin;
        let cond = self.parse_expr()?;
        let msg = if self.kind() == &TokenKind::Colon {
            self.bump();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon)?;
        let rest = self.parse_expr()?;

        let cond_range = self.builder.range(cond);
        let msg = msg.unwrap_or_else(|| {
            self.synthetic(
                ExprKind::LiteralString {
                    value: "Assertion failed".to_string(),
                },
                cond_range,
            )
        });
        let branch_false = self.synthetic(ExprKind::Error { expr: msg }, cond_range);
        Ok(self.alloc_from(
            ExprKind::Conditional {
                cond,
                branch_true: rest,
                branch_false,
            },
            begin,
            assert_tok.fodder,
        ))
    }

    /// Import path must resolve to a literal at parse time; literal `+`
    /// concatenation is folded here.
    fn parse_import(&mut self) -> Result<ExprId, ParseError> {
        let import_tok = self.bump();
        let begin = import_tok.range.begin;

        let first = match self.kind() {
            TokenKind::Str { value } => {
                let value = value.clone();
                self.bump();
                value
            }
            other => {
                return Err(self.err_here(format!(
                    "computed imports are not allowed (expected string literal, got {other})"
                )))
            }
        };
        let path_begin = begin;
        let mut path = first;
        while self.kind() == &TokenKind::Plus {
            if let TokenKind::Str { value } = self.peek_kind(1) {
                let value = value.clone();
                self.bump();
                self.bump();
                path.push_str(&value);
            } else {
                break;
            }
        }
        let path_range = Range::new(path_begin, self.prev_end);

        let kind = match import_tok.kind {
            TokenKind::Import => ExprKind::Import { path, path_range },
            TokenKind::ImportStr => ExprKind::ImportStr { path, path_range },
            TokenKind::ImportBin => ExprKind::ImportBin { path, path_range },
            _ => unreachable!(),
        };
        Ok(self.alloc_from(kind, begin, import_tok.fodder))
    }

    fn binary_prec(kind: &TokenKind) -> Option<(u8, BinaryOp)> {
        let res = match kind {
            TokenKind::PipePipe => (1, BinaryOp::Or),
            TokenKind::AmpAmp => (2, BinaryOp::And),
            TokenKind::Pipe => (3, BinaryOp::BitwiseOr),
            TokenKind::Caret => (4, BinaryOp::BitwiseXor),
            TokenKind::Amp => (5, BinaryOp::BitwiseAnd),
            TokenKind::EqEq => (6, BinaryOp::ManifestEqual),
            TokenKind::NotEq => (6, BinaryOp::ManifestUnequal),
            TokenKind::Lt => (7, BinaryOp::Less),
            TokenKind::LtEq => (7, BinaryOp::LessEq),
            TokenKind::Gt => (7, BinaryOp::Greater),
            TokenKind::GtEq => (7, BinaryOp::GreaterEq),
            TokenKind::In => (7, BinaryOp::In),
            TokenKind::ShiftL => (8, BinaryOp::ShiftL),
            TokenKind::ShiftR => (8, BinaryOp::ShiftR),
            TokenKind::Plus => (9, BinaryOp::Plus),
            TokenKind::Minus => (9, BinaryOp::Minus),
            TokenKind::Star => (10, BinaryOp::Mult),
            TokenKind::Slash => (10, BinaryOp::Div),
            TokenKind::Percent => (10, BinaryOp::Percent),
            _ => return None,
        };
        Some(res)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<ExprId, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some((prec, op)) = Self::binary_prec(self.kind()) {
            if prec < min_prec {
                break;
            }
            self.bump();

            // `key in super` membership test
            if op == BinaryOp::In && self.kind() == &TokenKind::Super {
                self.bump();
                let begin = self.begin_of(left);
                left = self.alloc_from(ExprKind::InSuper { index: left }, begin, Vec::new());
                continue;
            }

            let right = self.parse_binary(prec + 1)?;
            let begin = self.begin_of(left);
            left = self.alloc_from(ExprKind::Binary { op, left, right }, begin, Vec::new());
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        let op = match self.kind() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitwiseNot),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(op) = op {
            let tok = self.bump();
            let expr = self.parse_unary()?;
            return Ok(self.alloc_from(ExprKind::Unary { op, expr }, tok.range.begin, tok.fodder));
        }
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_postfix(&mut self, mut expr: ExprId) -> Result<ExprId, ParseError> {
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.bump();
                    let (name, name_tok) = self.expect_ident()?;
                    let index = self.builder.alloc(
                        ExprKind::LiteralString { value: name },
                        name_tok.range,
                        name_tok.fodder,
                    );
                    let begin = self.begin_of(expr);
                    expr = self.alloc_from(
                        ExprKind::Index {
                            target: expr,
                            index,
                        },
                        begin,
                        Vec::new(),
                    );
                }
                TokenKind::BracketL => {
                    expr = self.parse_index_or_slice(expr)?;
                }
                TokenKind::ParenL => {
                    expr = self.parse_call(expr)?;
                }
                TokenKind::BraceL => {
                    // `template { … }` sugar is the binary `+` form
                    let obj = self.parse_object()?;
                    let begin = self.begin_of(expr);
                    expr = self.alloc_from(
                        ExprKind::Binary {
                            op: BinaryOp::Plus,
                            left: expr,
                            right: obj,
                        },
                        begin,
                        Vec::new(),
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_index_or_slice(&mut self, target: ExprId) -> Result<ExprId, ParseError> {
        self.expect(&TokenKind::BracketL)?;
        let mut parts: Vec<Option<ExprId>> = Vec::new();
        if self.kind() == &TokenKind::Colon {
            parts.push(None);
        } else {
            parts.push(Some(self.parse_expr()?));
        }
        while self.kind() == &TokenKind::Colon {
            self.bump();
            if matches!(self.kind(), TokenKind::Colon | TokenKind::BracketR) {
                parts.push(None);
            } else {
                parts.push(Some(self.parse_expr()?));
            }
        }
        self.expect(&TokenKind::BracketR)?;
        let begin = self.begin_of(target);

        if parts.len() == 1 {
            let index = parts[0]
                .ok_or_else(|| self.err_here("expected an index expression".to_string()))?;
            return Ok(self.alloc_from(ExprKind::Index { target, index }, begin, Vec::new()));
        }
        if parts.len() > 3 {
            return Err(self.err_here("too many colons in slice".to_string()));
        }

        // `t[a:b:c]` lowers to `$std.slice(t, a, b, c)`
        let full = Range::new(begin, self.prev_end);
        let mut args = vec![target];
        for i in 0..3 {
            let arg = match parts.get(i).copied().flatten() {
                Some(e) => e,
                None => self.synthetic(ExprKind::LiteralNull, full),
            };
            args.push(arg);
        }
        let call = self.std_call("slice", args, full);
        Ok(call)
    }

    fn parse_call(&mut self, target: ExprId) -> Result<ExprId, ParseError> {
        self.expect(&TokenKind::ParenL)?;
        let mut positional = Vec::new();
        let mut named: Vec<NamedArg> = Vec::new();
        loop {
            if self.kind() == &TokenKind::ParenR {
                self.bump();
                break;
            }
            let is_named = matches!(self.kind(), TokenKind::Ident(_))
                && self.peek_kind(1) == &TokenKind::Assign;
            if is_named {
                let (name, name_tok) = self.expect_ident()?;
                self.expect(&TokenKind::Assign)?;
                let arg = self.parse_expr()?;
                named.push(NamedArg {
                    name,
                    name_range: name_tok.range,
                    arg,
                });
            } else {
                if !named.is_empty() {
                    return Err(self
                        .err_here("positional argument after a named argument".to_string()));
                }
                positional.push(self.parse_expr()?);
            }
            match self.kind() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::ParenR => {}
                other => {
                    return Err(
                        self.err_here(format!("expected ',' or ')' in arguments, got {other}"))
                    )
                }
            }
        }
        let tailstrict = if self.kind() == &TokenKind::TailStrict {
            self.bump();
            true
        } else {
            false
        };
        let begin = self.begin_of(target);
        Ok(self.alloc_from(
            ExprKind::Apply {
                target,
                positional,
                named,
                tailstrict,
            },
            begin,
            Vec::new(),
        ))
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        match self.kind().clone() {
            TokenKind::Null => {
                let tok = self.bump();
                Ok(self.alloc_from(ExprKind::LiteralNull, tok.range.begin, tok.fodder))
            }
            TokenKind::True => {
                let tok = self.bump();
                Ok(self.alloc_from(ExprKind::LiteralBoolean(true), tok.range.begin, tok.fodder))
            }
            TokenKind::False => {
                let tok = self.bump();
                Ok(self.alloc_from(ExprKind::LiteralBoolean(false), tok.range.begin, tok.fodder))
            }
            TokenKind::SelfKw => {
                let tok = self.bump();
                Ok(self.alloc_from(ExprKind::SelfExpr, tok.range.begin, tok.fodder))
            }
            TokenKind::Dollar => {
                let tok = self.bump();
                Ok(self.alloc_from(ExprKind::Dollar, tok.range.begin, tok.fodder))
            }
            TokenKind::Str { value } => {
                let tok = self.bump();
                Ok(self.alloc_from(
                    ExprKind::LiteralString { value },
                    tok.range.begin,
                    tok.fodder,
                ))
            }
            TokenKind::Number { value, original } => {
                let tok = self.bump();
                Ok(self.alloc_from(
                    ExprKind::LiteralNumber { value, original },
                    tok.range.begin,
                    tok.fodder,
                ))
            }
            TokenKind::Ident(name) => {
                let tok = self.bump();
                Ok(self.alloc_from(ExprKind::Var { name }, tok.range.begin, tok.fodder))
            }
            TokenKind::ParenL => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::ParenR)?;
                Ok(inner)
            }
            TokenKind::BraceL => self.parse_object(),
            TokenKind::BracketL => self.parse_array(),
            TokenKind::Super => {
                let tok = self.bump();
                match self.kind() {
                    TokenKind::Dot => {
                        self.bump();
                        let (name, name_tok) = self.expect_ident()?;
                        let index = self.builder.alloc(
                            ExprKind::LiteralString { value: name },
                            name_tok.range,
                            name_tok.fodder,
                        );
                        Ok(self.alloc_from(
                            ExprKind::SuperIndex { index },
                            tok.range.begin,
                            tok.fodder,
                        ))
                    }
                    TokenKind::BracketL => {
                        self.bump();
                        let index = self.parse_expr()?;
                        self.expect(&TokenKind::BracketR)?;
                        Ok(self.alloc_from(
                            ExprKind::SuperIndex { index },
                            tok.range.begin,
                            tok.fodder,
                        ))
                    }
                    other => Err(self.err_here(format!(
                        "expected '.' or '[' after 'super', got {other}"
                    ))),
                }
            }
            other => Err(self.err_here(format!("unexpected {other}"))),
        }
    }

    // --- arrays and comprehensions ---

    fn parse_array(&mut self) -> Result<ExprId, ParseError> {
        let bracket_l = self.expect(&TokenKind::BracketL)?;
        let begin = bracket_l.range.begin;
        let mut comments = bracket_l.fodder;

        if self.kind() == &TokenKind::BracketR {
            let bracket_r = self.bump();
            comments.extend(bracket_r.fodder);
            return Ok(self.alloc_from(ExprKind::Array { elements: vec![] }, begin, comments));
        }

        let first = self.parse_expr()?;
        if self.kind() == &TokenKind::For {
            let specs = self.parse_comp_specs()?;
            let bracket_r = self.expect(&TokenKind::BracketR)?;
            comments.extend(bracket_r.fodder);
            let full = Range::new(begin, self.prev_end);
            let base = self.synthetic(
                ExprKind::Array {
                    elements: vec![first],
                },
                full,
            );
            let lowered = self.desugar_comp(&specs, base, full);
            self.builder.set_range(lowered, full);
            return Ok(lowered);
        }

        let mut elements = vec![first];
        while self.kind() == &TokenKind::Comma {
            self.bump();
            if self.kind() == &TokenKind::BracketR {
                break;
            }
            elements.push(self.parse_expr()?);
        }
        let bracket_r = self.expect(&TokenKind::BracketR)?;
        comments.extend(bracket_r.fodder);
        Ok(self.alloc_from(ExprKind::Array { elements }, begin, comments))
    }

    fn parse_comp_specs(&mut self) -> Result<Vec<CompSpec>, ParseError> {
        let mut specs = Vec::new();
        self.expect(&TokenKind::For)?;
        let (var, var_tok) = self.expect_ident()?;
        self.expect(&TokenKind::In)?;
        let arr = self.parse_expr()?;
        specs.push(CompSpec::For {
            var,
            var_range: var_tok.range,
            arr,
        });
        loop {
            match self.kind() {
                TokenKind::For => {
                    self.bump();
                    let (var, var_tok) = self.expect_ident()?;
                    self.expect(&TokenKind::In)?;
                    let arr = self.parse_expr()?;
                    specs.push(CompSpec::For {
                        var,
                        var_range: var_tok.range,
                        arr,
                    });
                }
                TokenKind::If => {
                    self.bump();
                    let cond = self.parse_expr()?;
                    specs.push(CompSpec::If { cond });
                }
                _ => return Ok(specs),
            }
        }
    }

    /// Lower comprehension specs over `base`:
    /// `for x in xs` becomes `$std.flatMap(function(x) rest, xs)` and
    /// `if c` becomes `if c then rest else []`.
    fn desugar_comp(&mut self, specs: &[CompSpec], base: ExprId, range: Range) -> ExprId {
        match specs.first() {
            None => base,
            Some(CompSpec::For {
                var,
                var_range,
                arr,
            }) => {
                let rest = self.desugar_comp(&specs[1..], base, range);
                let param = Param {
                    name: var.clone(),
                    name_range: *var_range,
                    default: None,
                    comments: vec![],
                    hint_comments: vec![],
                };
                let func = self.synthetic(
                    ExprKind::Function {
                        params: vec![param],
                        body: rest,
                    },
                    range,
                );
                self.std_call("flatMap", vec![func, *arr], range)
            }
            Some(CompSpec::If { cond }) => {
                let rest = self.desugar_comp(&specs[1..], base, range);
                let empty = self.synthetic(ExprKind::Array { elements: vec![] }, range);
                self.synthetic(
                    ExprKind::Conditional {
                        cond: *cond,
                        branch_true: rest,
                        branch_false: empty,
                    },
                    range,
                )
            }
        }
    }

    /// Build a `$std.<name>(args)` intrinsic call.
    fn std_call(&mut self, name: &str, args: Vec<ExprId>, range: Range) -> ExprId {
        let std_var = self.synthetic(
            ExprKind::Var {
                name: "$std".to_string(),
            },
            range,
        );
        let name = self.synthetic(
            ExprKind::LiteralString {
                value: name.to_string(),
            },
            range,
        );
        let target = self.synthetic(
            ExprKind::Index {
                target: std_var,
                index: name,
            },
            range,
        );
        self.synthetic(
            ExprKind::Apply {
                target,
                positional: args,
                named: vec![],
                tailstrict: false,
            },
            range,
        )
    }

    // --- objects ---

    fn parse_object(&mut self) -> Result<ExprId, ParseError> {
        let brace_l = self.expect(&TokenKind::BraceL)?;
        let begin = brace_l.range.begin;
        let comments = brace_l.fodder;

        let mut locals = Vec::new();
        let mut fields: Vec<ObjectField> = Vec::new();
        let mut asserts = Vec::new();

        loop {
            match self.kind() {
                TokenKind::BraceR => {
                    self.bump();
                    break;
                }
                TokenKind::For => {
                    // object comprehension over the single computed field
                    let specs = self.parse_comp_specs()?;
                    self.expect(&TokenKind::BraceR)?;
                    let full = Range::new(begin, self.prev_end);
                    if fields.len() != 1 {
                        return Err(self.err_here(
                            "object comprehension must have exactly one field".to_string(),
                        ));
                    }
                    if !asserts.is_empty() {
                        return Err(self.err_here(
                            "object comprehension cannot have asserts".to_string(),
                        ));
                    }
                    let inner = self.synthetic(
                        ExprKind::Object {
                            locals: std::mem::take(&mut locals),
                            fields: std::mem::take(&mut fields),
                            asserts: vec![],
                        },
                        full,
                    );
                    let base = self.synthetic(
                        ExprKind::Array {
                            elements: vec![inner],
                        },
                        full,
                    );
                    let arr = self.desugar_comp(&specs, base, full);
                    let merged = self.std_call("$objectFlatMerge", vec![arr], full);
                    self.builder.set_range(merged, full);
                    return Ok(merged);
                }
                TokenKind::Local => {
                    self.bump();
                    let mut bind = self.parse_bind()?;
                    bind.comments.extend(self.current().fodder.iter().cloned());
                    locals.push(bind);
                }
                TokenKind::Assert => {
                    self.bump();
                    let cond = self.parse_expr()?;
                    let assert = if self.kind() == &TokenKind::Colon {
                        self.bump();
                        let msg = self.parse_expr()?;
                        let at = self.builder.range(cond);
                        let null = self.synthetic(ExprKind::LiteralNull, at);
                        let err = self.synthetic(ExprKind::Error { expr: msg }, at);
                        self.synthetic(
                            ExprKind::Conditional {
                                cond,
                                branch_true: null,
                                branch_false: err,
                            },
                            at,
                        )
                    } else {
                        cond
                    };
                    asserts.push(assert);
                }
                _ => {
                    fields.push(self.parse_field()?);
                }
            }

            match self.kind() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::BraceR | TokenKind::For => {}
                other => {
                    return Err(self.err_here(format!(
                        "expected ',' or '}}' in object, got {other}"
                    )))
                }
            }
        }

        Ok(self.alloc_from(
            ExprKind::Object {
                locals,
                fields,
                asserts,
            },
            begin,
            comments,
        ))
    }

    fn parse_field(&mut self) -> Result<ObjectField, ParseError> {
        let field_begin = self.current().range.begin;
        let (name, name_comments) = match self.kind().clone() {
            TokenKind::Ident(value) => {
                let tok = self.bump();
                let id = self.builder.alloc(
                    ExprKind::LiteralString { value },
                    tok.range,
                    Vec::new(),
                );
                (id, tok.fodder)
            }
            TokenKind::Str { value } => {
                let tok = self.bump();
                let id = self.builder.alloc(
                    ExprKind::LiteralString { value },
                    tok.range,
                    Vec::new(),
                );
                (id, tok.fodder)
            }
            TokenKind::BracketL => {
                let tok_fodder = self.current().fodder.clone();
                self.bump();
                let id = self.parse_expr()?;
                self.expect(&TokenKind::BracketR)?;
                (id, tok_fodder)
            }
            other => return Err(self.err_here(format!("expected field name, got {other}"))),
        };

        let params = if self.kind() == &TokenKind::ParenL {
            Some(self.parse_params()?)
        } else {
            None
        };

        if self.kind() == &TokenKind::Plus {
            // `f+:` inherit marker; the merge semantics are runtime-only
            self.bump();
        }
        let hide = match self.kind() {
            TokenKind::Colon => FieldHide::Visible,
            TokenKind::DoubleColon => FieldHide::Hidden,
            TokenKind::TripleColon => FieldHide::ForceVisible,
            other => {
                return Err(self.err_here(format!("expected ':' after field name, got {other}")))
            }
        };
        self.bump();

        let value = self.parse_expr()?;
        let body = match params {
            Some((params, paren_comments)) => {
                let begin = field_begin;
                self.alloc_from(
                    ExprKind::Function {
                        params,
                        body: value,
                    },
                    begin,
                    paren_comments,
                )
            }
            None => value,
        };

        Ok(ObjectField {
            name,
            body,
            hide,
            range: Range::new(field_begin, self.prev_end),
            name_comments,
        })
    }
}
