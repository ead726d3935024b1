//! Token definitions.

use std::fmt;

use jsonnet_ast::Range;

/// Lexed token kinds. String and number payloads are already cooked: escape
/// sequences are resolved and numbers carry both the numeric value and the
/// original spelling.
#[derive(Clone, PartialEq, Debug)]
pub enum TokenKind {
    Ident(String),
    Number { value: f64, original: String },
    Str { value: String },

    // keywords
    Assert,
    Else,
    Error,
    False,
    For,
    Function,
    If,
    Import,
    ImportStr,
    ImportBin,
    In,
    Local,
    Null,
    SelfKw,
    Super,
    TailStrict,
    Then,
    True,
    Dollar,

    // delimiters
    BraceL,
    BraceR,
    BracketL,
    BracketR,
    ParenL,
    ParenR,
    Comma,
    Dot,
    Semicolon,
    Colon,
    DoubleColon,
    TripleColon,

    // operators
    Bang,
    Tilde,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    AmpAmp,
    PipePipe,
    ShiftL,
    ShiftR,
    Lt,
    LtEq,
    Gt,
    GtEq,
    EqEq,
    NotEq,
    Assign,

    Eof,
}

impl TokenKind {
    /// Human-readable token name for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier {name:?}"),
            TokenKind::Number { original, .. } => format!("number {original}"),
            TokenKind::Str { .. } => "string literal".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            other => format!("'{}'", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            TokenKind::Assert => "assert",
            TokenKind::Else => "else",
            TokenKind::Error => "error",
            TokenKind::False => "false",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::ImportStr => "importstr",
            TokenKind::ImportBin => "importbin",
            TokenKind::In => "in",
            TokenKind::Local => "local",
            TokenKind::Null => "null",
            TokenKind::SelfKw => "self",
            TokenKind::Super => "super",
            TokenKind::TailStrict => "tailstrict",
            TokenKind::Then => "then",
            TokenKind::True => "true",
            TokenKind::Dollar => "$",
            TokenKind::BraceL => "{",
            TokenKind::BraceR => "}",
            TokenKind::BracketL => "[",
            TokenKind::BracketR => "]",
            TokenKind::ParenL => "(",
            TokenKind::ParenR => ")",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::DoubleColon => "::",
            TokenKind::TripleColon => ":::",
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::ShiftL => "<<",
            TokenKind::ShiftR => ">>",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Assign => "=",
            TokenKind::Ident(_) | TokenKind::Number { .. } | TokenKind::Str { .. } | TokenKind::Eof => {
                unreachable!()
            }
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A token with its source range and the comments that preceded it.
///
/// Comments attach to the *following* token, mirroring how the analysis
/// layer locates annotation comments (the hint for a parameter sits in the
/// fodder of the `=`, `,`, or `)` token after it).
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range,
    pub fodder: Vec<String>,
}

impl Token {
    pub fn new(kind: TokenKind, range: Range, fodder: Vec<String>) -> Self {
        Token {
            kind,
            range,
            fodder,
        }
    }
}
