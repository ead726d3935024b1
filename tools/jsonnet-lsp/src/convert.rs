//! Domain ↔ protocol conversions.
//!
//! The core is 1-based (editor-visible lines/columns); the protocol is
//! 0-based. Everything crossing the boundary funnels through here.

use jsonnet_ast::{Location, LocationRange, Range};
use jsonnet_linter::{DiagRange, Diagnostic, Severity};
use jsonnet_session::features::{CompletionItem, CompletionKind};
use tower_lsp::lsp_types;

pub fn proto_to_pos(p: lsp_types::Position) -> Location {
    Location::new(p.line + 1, p.character + 1)
}

pub fn pos_to_proto(p: Location) -> lsp_types::Position {
    lsp_types::Position {
        line: p.line.saturating_sub(1),
        character: p.column.saturating_sub(1),
    }
}

pub fn proto_to_range(r: lsp_types::Range) -> Range {
    Range::new(proto_to_pos(r.start), proto_to_pos(r.end))
}

pub fn range_to_proto(r: &LocationRange) -> lsp_types::Range {
    lsp_types::Range {
        start: pos_to_proto(r.begin),
        end: pos_to_proto(r.end),
    }
}

pub fn diag_range_to_proto(r: DiagRange) -> lsp_types::Range {
    lsp_types::Range {
        start: lsp_types::Position {
            line: r.start.line,
            character: r.start.character,
        },
        end: lsp_types::Position {
            line: r.end.line,
            character: r.end.character,
        },
    }
}

pub fn severity_to_proto(s: Severity) -> lsp_types::DiagnosticSeverity {
    match s {
        Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
        Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
        Severity::Information => lsp_types::DiagnosticSeverity::INFORMATION,
        Severity::Hint => lsp_types::DiagnosticSeverity::HINT,
    }
}

pub fn diag_to_proto(diag: &Diagnostic) -> lsp_types::Diagnostic {
    lsp_types::Diagnostic {
        range: diag_range_to_proto(diag.range),
        severity: Some(severity_to_proto(diag.severity)),
        code: diag
            .code
            .map(|c| lsp_types::NumberOrString::String(c.as_str().to_string())),
        message: diag.message.clone(),
        source: diag.source.clone(),
        ..Default::default()
    }
}

fn completion_kind_to_proto(kind: CompletionKind) -> lsp_types::CompletionItemKind {
    match kind {
        CompletionKind::Field => lsp_types::CompletionItemKind::FIELD,
        CompletionKind::File => lsp_types::CompletionItemKind::FILE,
        CompletionKind::Folder => lsp_types::CompletionItemKind::FOLDER,
        CompletionKind::Function => lsp_types::CompletionItemKind::FUNCTION,
        CompletionKind::Struct => lsp_types::CompletionItemKind::STRUCT,
        CompletionKind::Variable => lsp_types::CompletionItemKind::VARIABLE,
    }
}

pub fn completion_to_proto(item: CompletionItem) -> lsp_types::CompletionItem {
    lsp_types::CompletionItem {
        label: item.label,
        kind: Some(completion_kind_to_proto(item.kind)),
        detail: item.detail,
        documentation: item
            .documentation
            .filter(|d| !d.is_empty())
            .map(lsp_types::Documentation::String),
        insert_text: item.insert_text,
        insert_text_format: item
            .snippet
            .then_some(lsp_types::InsertTextFormat::SNIPPET),
        sort_text: item.sort_text,
        ..Default::default()
    }
}
