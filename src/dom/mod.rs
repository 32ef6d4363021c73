//! In-memory HTML tree for note bodies.
//!
//! Note markup is parsed with html5ever into an arena ([`Dom`]), rewritten
//! in place and serialized back with [`to_html`].

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{Attribute, Children, Dom, Node, NodeData, NodeId, html_name};
pub use serialize::to_html;
pub use tree_sink::DomSink;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

/// Parse markup as a full HTML document.
///
/// Fragments are fine: the tree builder adds the missing `html`, `head` and
/// `body` elements.
pub fn parse_html(markup: &str) -> Dom {
    parse_document(DomSink::new(), ParseOpts::default())
        .one(markup)
        .into_dom()
}

/// The `<body>` element, or the document node when there is none.
pub fn body(dom: &Dom) -> NodeId {
    dom.find_by_tag("body").unwrap_or_else(|| dom.document())
}
