use super::TagRewriter;
use crate::dom::{Dom, NodeId};

const UNWRAPPED: &[&str] = &["li", "td", "th"];

/// Removes the `<div>` Evernote wraps around list item and table cell
/// content, which would otherwise render as an extra line break.
///
/// The wrapper's children take its place. A wrapper holding nothing but a
/// `<br>` is dropped together with it; an empty wrapper is left alone.
pub struct ExtraDiv;

impl TagRewriter for ExtraDiv {
    fn rewrite(&mut self, dom: &mut Dom, node: NodeId) {
        if !UNWRAPPED.iter().any(|tag| dom.is_tag(node, tag)) {
            return;
        }

        let wrapper = dom.first_child(node);
        if !dom.is_tag(wrapper, "div") || !dom.has_children(wrapper) {
            return;
        }

        let content: Vec<_> = dom.children(wrapper).collect();
        let lone_break = matches!(content.as_slice(), [only] if dom.is_tag(*only, "br") && !dom.has_children(*only));
        if !lone_break {
            for child in content {
                dom.detach(child);
                dom.insert_before(wrapper, child);
            }
        }
        dom.detach(wrapper);
    }
}

/// Anchors without content become spans: there is nothing to click.
pub struct EmptyAnchor;

impl TagRewriter for EmptyAnchor {
    fn rewrite(&mut self, dom: &mut Dom, node: NodeId) {
        if dom.is_tag(node, "a") && !dom.has_children(node) {
            dom.set_tag(node, "span");
        }
    }
}
