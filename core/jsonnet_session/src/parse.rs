//! Parsing with best-effort AST recovery.
//!
//! Jsonnet leans on semicolons and commas, so mid-edit documents are
//! usually one character short of parsing. When a parse fails during a
//! delta update we retry with `;` and then `,` appended right after the
//! last inserted text, and accept the first success. The original error is
//! always kept: recovery feeds analysis, never diagnostics.
//!
//! Recovery only runs on the delta path. Full replaces and opens parse
//! as-is — there is no "last edit" to anchor the remedial insertion to.

use std::sync::Arc;

use jsonnet_ast::{Ast, Location};
use jsonnet_overlay::{apply_edits, TextEdit};
use jsonnet_parse::ParseError;
use tracing::trace;

/// What a document update parsed into. `root` is present when the text (or
/// a small remedial perturbation of it) parses; `err` is present whenever
/// the text itself did not parse.
#[derive(Clone, Debug, Default)]
pub struct ParseResult {
    pub root: Option<Arc<Ast>>,
    pub err: Option<ParseError>,
}

impl ParseResult {
    pub fn static_err(&self) -> Option<&ParseError> {
        self.err.as_ref()
    }
}

/// Parse `contents`, attempting recovery when a last edit is known.
pub fn parse_with_recovery(
    filename: &str,
    contents: &str,
    last_edit: Option<&TextEdit>,
) -> ParseResult {
    match jsonnet_parse::parse(filename, contents) {
        Ok(root) => ParseResult {
            root: Some(root),
            err: None,
        },
        Err(err) => {
            let root = last_edit.and_then(|edit| try_recover(filename, contents, edit));
            if root.is_some() {
                trace!(filename, "parse recovered with a remedial edit");
            }
            ParseResult {
                root,
                err: Some(err),
            }
        }
    }
}

fn try_recover(filename: &str, contents: &str, last_edit: &TextEdit) -> Option<Arc<Ast>> {
    // the position right after the inserted text
    let end = last_edit.range.end;
    let insertion = Location::new(
        end.line,
        end.column + last_edit.new_text.chars().count() as u32,
    );

    for remedy in [";", ","] {
        let edited = match apply_edits(contents, &[TextEdit::insert(insertion, remedy)]) {
            Ok(edited) => edited,
            Err(_) => return None,
        };
        if let Ok(root) = jsonnet_parse::parse(filename, &edited) {
            return Some(root);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonnet_ast::Range;

    #[test]
    fn clean_parse_has_no_error() {
        let res = parse_with_recovery("a.jsonnet", "local x = 1; x", None);
        assert!(res.root.is_some());
        assert!(res.err.is_none());
    }

    #[test]
    fn failure_without_last_edit_does_not_recover() {
        let res = parse_with_recovery("a.jsonnet", "local x = std\n{r: x}", None);
        assert!(res.root.is_none());
        assert!(res.err.is_some());
    }

    #[test]
    fn missing_semicolon_recovers_on_delta() {
        // the user just typed the "d" of std at line 1 column 13
        let contents = "local x = std\n{r: x}";
        let edit = TextEdit {
            range: Range::new(Location::new(1, 13), Location::new(1, 13)),
            new_text: "d".to_string(),
        };
        let res = parse_with_recovery("a.jsonnet", contents, Some(&edit));
        assert!(res.root.is_some(), "recovery should add the semicolon");
        assert!(res.err.is_some(), "the original error is kept");
    }

    #[test]
    fn missing_comma_recovers_on_delta() {
        // typing a new field above an existing one
        let contents = "{\n  a: 1\n  b: 2,\n}";
        let edit = TextEdit {
            range: Range::new(Location::new(2, 7), Location::new(2, 7)),
            new_text: "1".to_string(),
        };
        let res = parse_with_recovery("a.jsonnet", contents, Some(&edit));
        assert!(res.root.is_some(), "recovery should add the comma");
        assert!(res.err.is_some());
    }

    #[test]
    fn unrecoverable_text_keeps_the_error_only() {
        let contents = "local x = std.\n{r: x}";
        let edit = TextEdit {
            range: Range::new(Location::new(1, 14), Location::new(1, 14)),
            new_text: ".".to_string(),
        };
        let res = parse_with_recovery("a.jsonnet", contents, Some(&edit));
        assert!(res.root.is_none());
        assert!(res.err.is_some());
    }
}
