use std::collections::HashMap;

use tracing::warn;

use super::TagRewriter;
use crate::convert::{MarkdownResource, ResourceType};
use crate::dom::{Attribute, Dom, NodeId, html_name};

const MARKER: &str = "en-media";

/// Replaces `<en-media hash="...">` markers with a reference to the
/// extracted resource.
///
/// Images become `<img src="image/NAME" alt="NAME">`, everything else
/// `<a href="./file/NAME">NAME</a>`. The reference and a `<br>` are appended
/// to the closest ancestor that is not itself a marker: the HTML parser does
/// not honour `<en-media/>` self-closing, so consecutive markers end up
/// nested inside one another.
///
/// Markers whose hash is unknown take the resources keyed by position
/// (`"0"`, `"1"`, ...) in order, which is how resources without an
/// identifier are registered.
pub struct Media<'a> {
    resources: &'a HashMap<String, MarkdownResource>,
    fallback: usize,
}

impl<'a> Media<'a> {
    pub fn new(resources: &'a HashMap<String, MarkdownResource>) -> Self {
        Self {
            resources,
            fallback: 0,
        }
    }

    fn lookup(&mut self, hash: &str) -> Option<&'a MarkdownResource> {
        if let Some(resource) = self.resources.get(hash) {
            return Some(resource);
        }
        let key = self.fallback.to_string();
        self.fallback += 1;
        self.resources.get(&key)
    }
}

fn reference(dom: &mut Dom, resource: &MarkdownResource) -> NodeId {
    let dir = resource.kind.as_str();
    match resource.kind {
        ResourceType::Image => dom.create_element(
            html_name("img"),
            vec![
                Attribute::new("src", format!("{dir}/{}", resource.name)),
                Attribute::new("alt", resource.name.as_str()),
            ],
        ),
        ResourceType::File => {
            let link = dom.create_element(
                html_name("a"),
                vec![Attribute::new("href", format!("./{dir}/{}", resource.name))],
            );
            let label = dom.create_text(resource.name.as_str());
            dom.append(link, label);
            link
        }
    }
}

impl TagRewriter for Media<'_> {
    fn rewrite(&mut self, dom: &mut Dom, node: NodeId) {
        if !dom.is_tag(node, MARKER) {
            return;
        }

        let hash = dom.get_attr(node, "hash").unwrap_or_default().to_string();
        let Some(resource) = self.lookup(&hash) else {
            warn!(hash = %hash, "media marker without a matching resource");
            return;
        };

        let mut parent = dom.parent(node);
        while dom.is_tag(parent, MARKER) {
            parent = dom.parent(parent);
        }
        if parent.is_none() {
            return;
        }

        let media = reference(dom, resource);
        dom.append(parent, media);
        let br = dom.create_element(html_name("br"), vec![]);
        dom.append(parent, br);
    }
}
