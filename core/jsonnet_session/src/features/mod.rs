//! Query features over the resolver: completion, hover, signature help,
//! definition, document symbols. Everything here returns domain types; the
//! transport layer maps them onto protocol structures.

mod completion;
mod definition;
mod hover;
mod signature;
mod symbols;

pub use completion::{completion, CompletionContext, CompletionItem, CompletionKind};
pub use definition::definition;
pub use hover::{hover, HoverResult};
pub use signature::{signature_help, ParamInfo, SignatureHelp};
pub use symbols::{document_symbols, SymbolInfo};

use jsonnet_analysis::{Value, ValueType};

/// Short human-readable summary of a value, shown as completion detail.
pub(crate) fn value_to_detail(value: &Value) -> String {
    if let Some(func) = value.function() {
        return format!("function{}", func.signature());
    }
    if value.value_type() == ValueType::String && value.comment.len() == 1 {
        return format!("string({:?})", value.comment[0]);
    }
    if value.value_type() == ValueType::Number && value.comment.len() == 1 {
        return format!("number({})", value.comment[0]);
    }
    value.value_type().to_string()
}
