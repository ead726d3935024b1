//! Hover: the deduced type plus the doc comments around the value.

use jsonnet_ast::{Location, LocationRange};
use jsonnet_analysis::{node_to_value, Resolver};

#[derive(Clone, Debug)]
pub struct HoverResult {
    pub range: Option<LocationRange>,
    /// Plain-text contents: type line, then documentation.
    pub contents: String,
}

pub fn hover(resolver: &dyn Resolver, pos: Location) -> Option<HoverResult> {
    let (node, _) = resolver.node_at(pos)?;
    let value = node_to_value(&node, resolver);

    let mut contents = value.ty.to_string();
    if let Some(hint) = &value.type_hint {
        let hinted = hint.to_string();
        if hinted != contents {
            contents.push_str(&format!(" (hint: {hinted})"));
        }
    }
    if !value.comment.is_empty() {
        contents.push('\n');
        contents.push_str(&value.comment.join("\n"));
    }

    Some(HoverResult {
        range: value.range.clone(),
        contents,
    })
}
