//! Diagnostic domain types, ordering, and rendering.
//!
//! Ranges here are protocol-shaped: 0-based line/character pairs. The
//! conversion from 1-based source locations happens at diagnostic creation
//! so everything downstream (publishing, sorting, rendering) agrees.

use std::fmt;

use jsonnet_ast::{Location, LocationRange};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Information => "Information",
            Severity::Hint => "Hint",
        };
        f.write_str(s)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DiagCode {
    ImportNotFound,
    UnusedVar,
    TypeMismatch,
    RedundantCondition,
    UnknownField,
    UnknownArgument,
    ArgumentCardinality,
    RuntimeError,
}

impl DiagCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagCode::ImportNotFound => "ImportNotFound",
            DiagCode::UnusedVar => "UnusedVar",
            DiagCode::TypeMismatch => "TypeMismatch",
            DiagCode::RedundantCondition => "RedundantCondition",
            DiagCode::UnknownField => "UnknownField",
            DiagCode::UnknownArgument => "UnknownArgument",
            DiagCode::ArgumentCardinality => "ArgumentCardinality",
            DiagCode::RuntimeError => "RuntimeError",
        }
    }
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 0-based position, protocol convention.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Debug)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Debug)]
pub struct DiagRange {
    pub start: Position,
    pub end: Position,
}

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub range: DiagRange,
    pub severity: Severity,
    pub code: Option<DiagCode>,
    pub message: String,
    pub source: Option<String>,
}

/// 1-based source location to 0-based protocol position.
pub fn pos_to_diag(p: Location) -> Position {
    Position {
        line: p.line.saturating_sub(1),
        character: p.column.saturating_sub(1),
    }
}

pub fn range_to_diag(r: &LocationRange) -> DiagRange {
    DiagRange {
        start: pos_to_diag(r.begin),
        end: pos_to_diag(r.end),
    }
}

/// Stable diagnostic order: start, end, then message.
pub fn sort_diags(diags: &mut [Diagnostic]) {
    diags.sort_by(|a, b| {
        (a.range.start, a.range.end, &a.message).cmp(&(b.range.start, b.range.end, &b.message))
    });
}

/// `[Severity|Code|l:c-l:c] message`, printed 1-based.
pub fn fmt_diag(diag: &Diagnostic) -> String {
    format!(
        "[{}|{}|{}:{}-{}:{}] {}",
        diag.severity,
        diag.code.map(DiagCode::as_str).unwrap_or(""),
        diag.range.start.line + 1,
        diag.range.start.character + 1,
        diag.range.end.line + 1,
        diag.range.end.character + 1,
        diag.message,
    )
}

/// True if any diagnostic is an error.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(|d| d.severity == Severity::Error)
}
