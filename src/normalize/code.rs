use super::TagRewriter;
use super::format::style_declarations;
use crate::dom::{Dom, NodeId};

/// Turns Evernote code blocks into `<pre>`.
///
/// A code block is a `<div>` whose style sets `-en-codeblock: true`. Its
/// lines are nested `<div>`s, so a newline is inserted after every `<div>`
/// of the block (including the block itself) to keep them apart once the
/// markup is flattened to text.
pub struct Code;

fn is_code_block(dom: &Dom, node: NodeId) -> bool {
    dom.is_tag(node, "div")
        && dom.get_attr(node, "style").is_some_and(|style| {
            style_declarations(style)
                .any(|(property, value)| property == "-en-codeblock" && value == "true")
        })
}

fn divs_in(dom: &Dom, root: NodeId, out: &mut Vec<NodeId>) {
    if dom.is_tag(root, "div") {
        out.push(root);
    }
    for child in dom.children(root) {
        divs_in(dom, child, out);
    }
}

impl TagRewriter for Code {
    fn rewrite(&mut self, dom: &mut Dom, node: NodeId) {
        if !is_code_block(dom, node) {
            return;
        }

        let mut lines = Vec::new();
        divs_in(dom, node, &mut lines);
        for line in lines {
            let newline = dom.create_text("\n");
            dom.insert_after(line, newline);
        }

        dom.set_tag(node, "pre");
    }
}
