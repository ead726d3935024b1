//! Annotation parser.
//!
//! Grammar:
//!
//! ```text
//! type        := hintNoUnion ( '|' hintNoUnion )*
//! hintNoUnion := 'string' | 'number' | 'boolean' | 'null'
//!              | ident ( '.' ident )*
//!              | 'A'..'Z'                      (single letter: type parameter)
//!              | 'array'    ( '[' type ']' )?
//!              | 'object'   ( '[' type ']' )?
//!              | 'function' ( '(' fparam (',' fparam)* ')' ( '->' type )? )?
//!              | '{' oparam (',' oparam)* '}'
//! fparam      := ident ( ':' type )?
//! oparam      := ident ':' type
//! ```
//!
//! Unions are flattened into a single n-ary node; type parameters are
//! rejected inside union members. Errors are plain strings, stored by the
//! caller as a `hint_error` and surfaced only on hint surfaces.

use super::ast::{Node, ParamNode};
use super::lexer::{lex, Tok};

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn consume(&mut self, expected: &Tok) -> Result<(), String> {
        match self.bump() {
            Some(tok) if &tok == expected => Ok(()),
            Some(tok) => Err(format!(
                "expected {} but got {}",
                expected.describe(),
                tok.describe()
            )),
            None => Err(format!(
                "expected {} but reached end of hint",
                expected.describe()
            )),
        }
    }

    fn consume_ident(&mut self) -> Result<String, String> {
        match self.bump() {
            Some(Tok::Ident(name)) => Ok(name),
            Some(tok) => Err(format!("expected identifier but got {}", tok.describe())),
            None => Err("expected identifier but reached end of hint".to_string()),
        }
    }

    fn parse_type_hint(&mut self) -> Result<Node, String> {
        let node = self.parse_type_hint_no_union()?;
        if self.peek() != Some(&Tok::Union) {
            return Ok(node);
        }

        let mut members = vec![node];
        while self.peek() == Some(&Tok::Union) {
            self.bump();
            members.push(self.parse_type_hint_no_union()?);
        }
        for member in &members {
            if let Some(param) = member.type_parameters().first() {
                return Err(format!(
                    "type parameter '{param}' is not allowed inside a union"
                ));
            }
        }
        Ok(Node::Union(members))
    }

    fn parse_dotted_ident(&mut self, start: String) -> Result<Node, String> {
        let mut names = vec![start];
        while self.peek() == Some(&Tok::Dot) {
            self.bump();
            names.push(self.consume_ident()?);
        }
        Ok(Node::DottedIdent(names))
    }

    fn parse_type_hint_no_union(&mut self) -> Result<Node, String> {
        match self.bump() {
            Some(Tok::Ident(name)) => {
                if is_type_param(&name) {
                    return Ok(Node::TypeParameter(name));
                }
                match name.as_str() {
                    "string" => return Ok(Node::String),
                    "number" => return Ok(Node::Number),
                    "boolean" => return Ok(Node::Boolean),
                    "null" => return Ok(Node::Null),
                    _ => {}
                }
                if self.peek() == Some(&Tok::Dot) {
                    return self.parse_dotted_ident(name);
                }
                Ok(Node::Ident(name))
            }
            Some(Tok::Array) => {
                if self.peek() == Some(&Tok::BracketOpen) {
                    self.bump();
                    let elem = self.parse_type_hint()?;
                    self.consume(&Tok::BracketClose)?;
                    Ok(Node::Array(Some(Box::new(elem))))
                } else {
                    Ok(Node::Array(None))
                }
            }
            Some(Tok::Object) => {
                if self.peek() == Some(&Tok::BracketOpen) {
                    self.bump();
                    let elem = self.parse_type_hint()?;
                    self.consume(&Tok::BracketClose)?;
                    Ok(Node::Object {
                        element: Some(Box::new(elem)),
                        fields: None,
                    })
                } else {
                    Ok(Node::Object {
                        element: None,
                        fields: None,
                    })
                }
            }
            Some(Tok::BraceOpen) => Ok(Node::Object {
                element: None,
                fields: Some(self.parse_object_params()?),
            }),
            Some(Tok::Function) => {
                if self.peek() != Some(&Tok::ParenOpen) {
                    return Ok(Node::Function {
                        params: None,
                        ret: None,
                    });
                }
                let params = Some(self.parse_function_params()?);
                let ret = if self.peek() == Some(&Tok::Arrow) {
                    self.bump();
                    Some(Box::new(self.parse_type_hint()?))
                } else {
                    None
                };
                Ok(Node::Function { params, ret })
            }
            Some(tok) => Err(format!("unexpected token {}", tok.describe())),
            None => Err("unexpected end of hint".to_string()),
        }
    }

    fn parse_object_params(&mut self) -> Result<Vec<ParamNode>, String> {
        let mut params = Vec::new();
        loop {
            // object fields always carry a type
            let name = self.consume_ident()?;
            self.consume(&Tok::Colon)?;
            params.push(ParamNode {
                name,
                ty: Some(self.parse_type_hint()?),
            });

            if self.peek() == Some(&Tok::Comma) {
                self.bump();
            } else {
                self.consume(&Tok::BraceClose)?;
                return Ok(params);
            }
        }
    }

    fn parse_function_params(&mut self) -> Result<Vec<ParamNode>, String> {
        self.consume(&Tok::ParenOpen)?;
        let mut params = Vec::new();
        loop {
            let name = self.consume_ident()?;
            let ty = if self.peek() == Some(&Tok::Colon) {
                self.bump();
                Some(self.parse_type_hint()?)
            } else {
                None
            };
            params.push(ParamNode { name, ty });

            if self.peek() == Some(&Tok::Comma) {
                self.bump();
            } else {
                self.consume(&Tok::ParenClose)?;
                return Ok(params);
            }
        }
    }
}

fn is_type_param(name: &str) -> bool {
    name.len() == 1 && name.as_bytes()[0].is_ascii_uppercase()
}

/// Parse an annotation body (the trimmed text between `/*:` and `*/`).
///
/// A handful of very common hints bypass the parser entirely.
pub fn parse(text: &str) -> Result<Node, String> {
    if is_type_param(text) {
        return Ok(Node::TypeParameter(text.to_string()));
    }
    match text {
        "string" => return Ok(Node::String),
        "number" => return Ok(Node::Number),
        "boolean" => return Ok(Node::Boolean),
        "null" => return Ok(Node::Null),
        "function" => {
            return Ok(Node::Function {
                params: None,
                ret: None,
            })
        }
        "object" => {
            return Ok(Node::Object {
                element: None,
                fields: None,
            })
        }
        "array" => return Ok(Node::Array(None)),
        "array[string]" => return Ok(Node::Array(Some(Box::new(Node::String)))),
        "array[number]" => return Ok(Node::Array(Some(Box::new(Node::Number)))),
        "array[boolean]" => return Ok(Node::Array(Some(Box::new(Node::Boolean)))),
        _ => {}
    }
    if let Some(param) = text
        .strip_prefix("array[")
        .and_then(|rest| rest.strip_suffix(']'))
    {
        if is_type_param(param) {
            return Ok(Node::Array(Some(Box::new(Node::TypeParameter(
                param.to_string(),
            )))));
        }
    }

    let mut parser = Parser {
        tokens: lex(text)?,
        pos: 0,
    };
    let node = parser.parse_type_hint()?;
    if let Some(extra) = parser.peek() {
        return Err(format!(
            "unexpected trailing {} in type hint",
            extra.describe()
        ));
    }
    Ok(node)
}
