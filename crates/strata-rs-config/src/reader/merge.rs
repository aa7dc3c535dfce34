//! Structural merge helpers for decoded fragments.

use strata_rs_protocol::Node;

/// Merge overlay values into the base, recursively overriding mappings.
///
/// Scalars and lists are replaced as a whole; mappings are merged key by key.
pub(super) fn merge_nodes(base: &mut Node, overlay: Node) {
    match (base, overlay) {
        (Node::Map(base_map), Node::Map(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_nodes(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value;
        }
    }
}
