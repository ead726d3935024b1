//! Go-to-definition: the origin range of the deduced value.

use jsonnet_ast::{Location, LocationRange};
use jsonnet_analysis::{node_to_value, Resolver};

pub fn definition(resolver: &dyn Resolver, pos: Location) -> Vec<LocationRange> {
    let Some((node, _)) = resolver.node_at(pos) else {
        return Vec::new();
    };
    let value = node_to_value(&node, resolver);
    match value.range {
        Some(range) if range.is_set() => vec![range],
        _ => Vec::new(),
    }
}
