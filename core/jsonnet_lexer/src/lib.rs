//! Jsonnet lexer.
//!
//! Produces a flat token stream for the parser. Comments never become
//! tokens; each one rides along as *fodder* on the token that follows it.
//! The analysis layer reads type annotations (`/*: … */`) out of those
//! fodder slots, so their placement is part of this crate's contract.
//!
//! The lexer fails fast: the first invalid construct aborts the scan with a
//! located [`LexError`]. Editors see that as a single parse diagnostic while
//! the previous good parse stays live in the overlay.

mod scanner;
mod token;

use std::fmt;

use jsonnet_ast::Location;
use tracing::trace;

pub use token::{Token, TokenKind};

/// A lexing failure with the position it occurred at.
#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub location: Location,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl std::error::Error for LexError {}

/// Lex `source` into tokens. The final token is always [`TokenKind::Eof`],
/// carrying any trailing comments as its fodder.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let mut scanner = scanner::Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    trace!(tokens = tokens.len(), "lexed source");
    Ok(tokens)
}
