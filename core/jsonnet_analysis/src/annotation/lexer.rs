//! Annotation token definitions, derived with logos.

use logos::Logos;

/// Tokens of the annotation mini-language. Whitespace is skipped; anything
/// unrecognized surfaces as a lexer error and fails the whole hint.
#[derive(Logos, Clone, PartialEq, Eq, Debug)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Tok {
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("|")]
    Union,
    #[token("->")]
    Arrow,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,

    #[token("array")]
    Array,
    #[token("object")]
    Object,
    #[token("function")]
    Function,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Tok {
    pub(crate) fn describe(&self) -> String {
        match self {
            Tok::Dot => "'.'".to_string(),
            Tok::Comma => "','".to_string(),
            Tok::Colon => "':'".to_string(),
            Tok::Union => "'|'".to_string(),
            Tok::Arrow => "'->'".to_string(),
            Tok::ParenOpen => "'('".to_string(),
            Tok::ParenClose => "')'".to_string(),
            Tok::BracketOpen => "'['".to_string(),
            Tok::BracketClose => "']'".to_string(),
            Tok::BraceOpen => "'{'".to_string(),
            Tok::BraceClose => "'}'".to_string(),
            Tok::Array => "'array'".to_string(),
            Tok::Object => "'object'".to_string(),
            Tok::Function => "'function'".to_string(),
            Tok::Ident(name) => format!("'{name}'"),
        }
    }
}

/// Lex an annotation body. `Err` carries the offending slice.
pub(crate) fn lex(text: &str) -> Result<Vec<Tok>, String> {
    let mut tokens = Vec::new();
    let mut lexer = Tok::lexer(text);
    while let Some(tok) = lexer.next() {
        match tok {
            Ok(tok) => tokens.push(tok),
            Err(()) => {
                return Err(format!(
                    "unexpected character {:?} in type hint",
                    lexer.slice()
                ))
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_symbols_and_keywords() {
        let toks = lex("array[string] -> {a: T}").unwrap();
        assert_eq!(
            toks,
            vec![
                Tok::Array,
                Tok::BracketOpen,
                Tok::Ident("string".to_string()),
                Tok::BracketClose,
                Tok::Arrow,
                Tok::BraceOpen,
                Tok::Ident("a".to_string()),
                Tok::Colon,
                Tok::Ident("T".to_string()),
                Tok::BraceClose,
            ]
        );
    }

    #[test]
    fn keywords_beat_idents() {
        assert_eq!(lex("object").unwrap(), vec![Tok::Object]);
        assert_eq!(
            lex("objectX").unwrap(),
            vec![Tok::Ident("objectX".to_string())]
        );
    }

    #[test]
    fn dollar_and_underscore_idents() {
        assert_eq!(
            lex("$foo _bar").unwrap(),
            vec![
                Tok::Ident("$foo".to_string()),
                Tok::Ident("_bar".to_string())
            ]
        );
    }

    #[test]
    fn illegal_character() {
        assert!(lex("@").is_err());
        // a bare '-' is not an arrow
        assert!(lex("-").is_err());
    }

    #[test]
    fn empty_input() {
        assert!(lex("").unwrap().is_empty());
        assert!(lex("   \t\n  ").unwrap().is_empty());
    }
}
