//! The scanner proper.
//!
//! A single forward pass over the source. Comments are not tokens: they are
//! collected into a pending fodder buffer and attached to the next real
//! token, which is where the annotation machinery expects to find them.

use jsonnet_ast::{Location, Range};

use crate::{LexError, Token, TokenKind};

pub(crate) struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

impl Scanner {
    pub(crate) fn new(source: &str) -> Self {
        Scanner {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            location: self.location(),
        }
    }

    /// Skip whitespace and collect comments into `fodder`.
    fn skip_trivia(&mut self, fodder: &mut Vec<String>) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    let mut text = String::new();
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        text.push(c);
                        self.bump();
                    }
                    fodder.push(text);
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    let mut text = String::new();
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        text.push(c);
                        self.bump();
                    }
                    fodder.push(text);
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.location();
                    let mut text = String::new();
                    text.push(self.bump().unwrap());
                    text.push(self.bump().unwrap());
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                text.push('*');
                                text.push(self.bump().unwrap());
                                break;
                            }
                            Some(c) => text.push(c),
                            None => {
                                return Err(LexError {
                                    message: "unterminated block comment".to_string(),
                                    location: start,
                                })
                            }
                        }
                    }
                    fodder.push(text);
                }
                _ => return Ok(()),
            }
        }
    }

    fn is_ident_start(c: char) -> bool {
        c == '_' || c.is_ascii_alphabetic()
    }

    fn is_ident_char(c: char) -> bool {
        c == '_' || c.is_ascii_alphanumeric()
    }

    fn scan_ident(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !Self::is_ident_char(c) {
                break;
            }
            name.push(c);
            self.bump();
        }
        match name.as_str() {
            "assert" => TokenKind::Assert,
            "else" => TokenKind::Else,
            "error" => TokenKind::Error,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "importstr" => TokenKind::ImportStr,
            "importbin" => TokenKind::ImportBin,
            "in" => TokenKind::In,
            "local" => TokenKind::Local,
            "null" => TokenKind::Null,
            "self" => TokenKind::SelfKw,
            "super" => TokenKind::Super,
            "tailstrict" => TokenKind::TailStrict,
            "then" => TokenKind::Then,
            "true" => TokenKind::True,
            _ => TokenKind::Ident(name),
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind, LexError> {
        let mut original = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                original.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            original.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    original.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut exp = String::from(self.peek().unwrap());
            let mut offset = 1;
            if matches!(self.peek_at(1), Some('+' | '-')) {
                exp.push(self.peek_at(1).unwrap());
                offset = 2;
            }
            if self.peek_at(offset).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..offset {
                    self.bump();
                }
                original.push_str(&exp);
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        original.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        let value: f64 = original
            .parse()
            .map_err(|_| self.error(format!("invalid number literal '{original}'")))?;
        Ok(TokenKind::Number { value, original })
    }

    fn scan_quoted_string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let start = self.location();
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(TokenKind::Str { value }),
                Some('\\') => match self.bump() {
                    Some('"') => value.push('"'),
                    Some('\'') => value.push('\''),
                    Some('\\') => value.push('\\'),
                    Some('/') => value.push('/'),
                    Some('b') => value.push('\u{0008}'),
                    Some('f') => value.push('\u{000C}'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('u') => {
                        let mut code = 0u32;
                        for _ in 0..4 {
                            let d = self
                                .bump()
                                .and_then(|c| c.to_digit(16))
                                .ok_or_else(|| self.error("invalid unicode escape"))?;
                            code = code * 16 + d;
                        }
                        value.push(
                            char::from_u32(code)
                                .ok_or_else(|| self.error("invalid unicode escape"))?,
                        );
                    }
                    Some(other) => {
                        return Err(self.error(format!("invalid escape sequence '\\{other}'")))
                    }
                    None => {
                        return Err(LexError {
                            message: "unterminated string".to_string(),
                            location: start,
                        })
                    }
                },
                Some(c) => value.push(c),
                None => {
                    return Err(LexError {
                        message: "unterminated string".to_string(),
                        location: start,
                    })
                }
            }
        }
    }

    fn scan_verbatim_string(&mut self) -> Result<TokenKind, LexError> {
        let start = self.location();
        self.bump(); // '@'
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected string after '@'")),
        };
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    // doubled quote is a literal quote
                    if self.peek() == Some(quote) {
                        value.push(quote);
                        self.bump();
                    } else {
                        return Ok(TokenKind::Str { value });
                    }
                }
                Some(c) => value.push(c),
                None => {
                    return Err(LexError {
                        message: "unterminated verbatim string".to_string(),
                        location: start,
                    })
                }
            }
        }
    }

    /// `|||` text block. The first content line fixes the indentation prefix;
    /// the block ends at a less-indented `|||` line.
    fn scan_text_block(&mut self) -> Result<TokenKind, LexError> {
        let start = self.location();
        for _ in 0..3 {
            self.bump();
        }
        // Only whitespace may follow ||| on its own line.
        loop {
            match self.bump() {
                Some('\n') => break,
                Some(c) if c.is_whitespace() => {}
                _ => {
                    return Err(LexError {
                        message: "text block requires a newline after |||".to_string(),
                        location: start,
                    })
                }
            }
        }

        let mut value = String::new();
        let mut indent: Option<String> = None;
        loop {
            // Measure leading whitespace of the line without consuming it yet.
            let mut ws = String::new();
            let mut off = 0;
            while let Some(c) = self.peek_at(off) {
                if c == ' ' || c == '\t' {
                    ws.push(c);
                    off += 1;
                } else {
                    break;
                }
            }
            let after_ws = self.peek_at(off);

            // Terminator: ||| indented less than the block content.
            let terminates = after_ws == Some('|')
                && self.peek_at(off + 1) == Some('|')
                && self.peek_at(off + 2) == Some('|')
                && indent.as_ref().map_or(true, |ind| ws.len() < ind.len());
            if terminates {
                for _ in 0..off + 3 {
                    self.bump();
                }
                return Ok(TokenKind::Str { value });
            }

            if after_ws == Some('\n') || after_ws.is_none() {
                // Blank line inside the block.
                if after_ws.is_none() {
                    return Err(LexError {
                        message: "unterminated text block".to_string(),
                        location: start,
                    });
                }
                for _ in 0..off + 1 {
                    self.bump();
                }
                value.push('\n');
                continue;
            }

            if indent.is_none() {
                if ws.is_empty() {
                    return Err(LexError {
                        message: "text block's first line must start with whitespace".to_string(),
                        location: self.location(),
                    });
                }
                indent = Some(ws.clone());
            }
            let indent = indent.as_ref().unwrap();
            if !ws.starts_with(indent.as_str()) {
                return Err(LexError {
                    message: "text block line is not sufficiently indented".to_string(),
                    location: self.location(),
                });
            }
            // Consume the indent prefix, then the rest of the line.
            for _ in 0..indent.chars().count() {
                self.bump();
            }
            loop {
                match self.bump() {
                    Some('\n') => {
                        value.push('\n');
                        break;
                    }
                    Some(c) => value.push(c),
                    None => {
                        return Err(LexError {
                            message: "unterminated text block".to_string(),
                            location: start,
                        })
                    }
                }
            }
        }
    }

    fn scan_operator(&mut self) -> Result<TokenKind, LexError> {
        let c = self.peek().unwrap();
        let kind = match c {
            '{' => TokenKind::BraceL,
            '}' => TokenKind::BraceR,
            '[' => TokenKind::BracketL,
            ']' => TokenKind::BracketR,
            '(' => TokenKind::ParenL,
            ')' => TokenKind::ParenR,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            '$' => TokenKind::Dollar,
            '~' => TokenKind::Tilde,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            ':' => {
                self.bump();
                if self.peek() == Some(':') {
                    self.bump();
                    if self.peek() == Some(':') {
                        self.bump();
                        return Ok(TokenKind::TripleColon);
                    }
                    return Ok(TokenKind::DoubleColon);
                }
                return Ok(TokenKind::Colon);
            }
            '&' => {
                self.bump();
                if self.peek() == Some('&') {
                    self.bump();
                    return Ok(TokenKind::AmpAmp);
                }
                return Ok(TokenKind::Amp);
            }
            '|' => {
                self.bump();
                if self.peek() == Some('|') {
                    self.bump();
                    return Ok(TokenKind::PipePipe);
                }
                return Ok(TokenKind::Pipe);
            }
            '<' => {
                self.bump();
                match self.peek() {
                    Some('<') => {
                        self.bump();
                        return Ok(TokenKind::ShiftL);
                    }
                    Some('=') => {
                        self.bump();
                        return Ok(TokenKind::LtEq);
                    }
                    _ => return Ok(TokenKind::Lt),
                }
            }
            '>' => {
                self.bump();
                match self.peek() {
                    Some('>') => {
                        self.bump();
                        return Ok(TokenKind::ShiftR);
                    }
                    Some('=') => {
                        self.bump();
                        return Ok(TokenKind::GtEq);
                    }
                    _ => return Ok(TokenKind::Gt),
                }
            }
            '=' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    return Ok(TokenKind::EqEq);
                }
                return Ok(TokenKind::Assign);
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    return Ok(TokenKind::NotEq);
                }
                return Ok(TokenKind::Bang);
            }
            other => return Err(self.error(format!("unexpected character '{other}'"))),
        };
        self.bump();
        Ok(kind)
    }

    pub(crate) fn next_token(&mut self) -> Result<Token, LexError> {
        let mut fodder = Vec::new();
        self.skip_trivia(&mut fodder)?;

        let begin = self.location();
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(c) if Self::is_ident_start(c) => self.scan_ident(),
            Some(c) if c.is_ascii_digit() => self.scan_number()?,
            Some(q @ ('"' | '\'')) => self.scan_quoted_string(q)?,
            Some('@') => self.scan_verbatim_string()?,
            Some('|')
                if self.peek_at(1) == Some('|') && self.peek_at(2) == Some('|') =>
            {
                self.scan_text_block()?
            }
            Some(_) => self.scan_operator()?,
        };
        let end = self.location();
        Ok(Token::new(kind, Range::new(begin, end), fodder))
    }
}
