//! Text-edit application.
//!
//! Edits address 1-based line/column positions (columns counted in
//! characters) and apply sequentially: each edit's range refers to the text
//! produced by the previous one. Positions beyond the end of a line or of
//! the document clamp rather than fail, matching editor behavior around
//! in-flight typing.

use std::fmt;

use jsonnet_ast::{Location, Range};

/// A single text edit: replace `range` with `new_text`. An empty range is
/// an insertion.
#[derive(Clone, Debug)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn insert(at: Location, text: impl Into<String>) -> TextEdit {
        TextEdit {
            range: Range::new(at, at),
            new_text: text.into(),
        }
    }

    pub fn replace(range: Range, text: impl Into<String>) -> TextEdit {
        TextEdit {
            range,
            new_text: text.into(),
        }
    }
}

/// An edit whose range is inverted (end before begin).
#[derive(Clone, Debug)]
pub struct EditError {
    pub range: Range,
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid edit range {}", self.range)
    }
}

impl std::error::Error for EditError {}

/// Byte offset of a 1-based position, clamped into the text.
pub fn offset_of(text: &str, pos: Location) -> usize {
    let mut line = 1u32;
    let mut start = 0usize;
    // find the start of the target line
    if pos.line > 1 {
        for (i, c) in text.char_indices() {
            if c == '\n' {
                line += 1;
                start = i + 1;
                if line == pos.line {
                    break;
                }
            }
        }
        if line < pos.line {
            return text.len();
        }
    }
    // walk columns within the line
    let mut col = 1u32;
    for (i, c) in text[start..].char_indices() {
        if col == pos.column || c == '\n' {
            return start + i;
        }
        col += 1;
    }
    text.len()
}

/// Apply `edits` in order to `text`.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut res = text.to_string();
    for edit in edits {
        let begin = offset_of(&res, edit.range.begin);
        let end = offset_of(&res, edit.range.end);
        if end < begin {
            return Err(EditError { range: edit.range });
        }
        res.replace_range(begin..end, &edit.new_text);
    }
    Ok(res)
}
