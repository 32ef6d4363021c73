//! Rewriting of Evernote markup into plain HTML.
//!
//! Note bodies use ENML, an HTML dialect with its own elements
//! (`<en-media>`, `<en-todo>`) and formatting carried in inline styles. Before
//! markdown conversion the tree is walked once, pre-order, and every node is
//! offered to each [`TagRewriter`] in a fixed order:
//!
//! 1. [`Media`] - `<en-media>` markers become images or file links
//! 2. [`Code`] - code block containers become `<pre>`
//! 3. [`TextFormatter`] - styled spans become `<strong>`, `<i>` or `<mark>`
//! 4. [`ExtraDiv`] - list items and table cells lose their wrapping `<div>`
//! 5. [`EmptyAnchor`] - anchors without content become spans
//!
//! Rules target disjoint element signatures and never revisit a node, so a
//! single pass is enough.

mod cleanup;
mod code;
mod format;
mod media;

pub use cleanup::{EmptyAnchor, ExtraDiv};
pub use code::Code;
pub use format::TextFormatter;
pub use media::Media;

use std::collections::HashMap;

use crate::convert::MarkdownResource;
use crate::dom::{self, Dom, NodeId};
use crate::error::{Error, Result};
use crate::util::decode_text;

/// A structural rewrite applied to a single node.
///
/// Implementations inspect `node` and may retag it, change its attributes or
/// insert and remove nodes around it. They must leave `node` attached.
pub trait TagRewriter {
    fn rewrite(&mut self, dom: &mut Dom, node: NodeId);
}

/// The standard rule set, in application order.
pub fn default_rules(media: &HashMap<String, MarkdownResource>) -> Vec<Box<dyn TagRewriter + '_>> {
    vec![
        Box::new(Media::new(media)),
        Box::new(Code),
        Box::new(TextFormatter),
        Box::new(ExtraDiv),
        Box::new(EmptyAnchor),
    ]
}

/// Offer `node` and then its descendants to every rule, pre-order.
///
/// Siblings are looked up after a child's subtree has been processed, so
/// nodes a rule appends to the current parent are visited too.
pub fn rewrite_tree(dom: &mut Dom, node: NodeId, rules: &mut [Box<dyn TagRewriter + '_>]) {
    for rule in rules.iter_mut() {
        rule.rewrite(dom, node);
    }

    let mut child = dom.first_child(node);
    while child.is_some() {
        rewrite_tree(dom, child, rules);
        child = dom.next_sibling(child);
    }
}

/// Parse note markup, apply the standard rules and serialize the body back.
pub fn normalize_html(markup: &[u8], media: &HashMap<String, MarkdownResource>) -> Result<Vec<u8>> {
    let text = decode_text(markup, None);
    let mut tree = dom::parse_html(&text);

    let root = tree.document();
    rewrite_tree(&mut tree, root, &mut default_rules(media));

    let body = dom::body(&tree);
    dom::to_html(&tree, body).map_err(|e| Error::Serialize(e.to_string()))
}
