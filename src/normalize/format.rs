use super::TagRewriter;
use crate::dom::{Dom, NodeId};

/// Iterate the `property: value` pairs of an inline style attribute.
///
/// Property names are lowercased, both sides are trimmed. Malformed
/// declarations are skipped.
pub(super) fn style_declarations(style: &str) -> impl Iterator<Item = (String, &str)> {
    style.split(';').filter_map(|declaration| {
        let (property, value) = declaration.split_once(':')?;
        Some((property.trim().to_ascii_lowercase(), value.trim()))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Bold,
    Italic,
    Highlight,
}

impl Format {
    fn tag(self) -> &'static str {
        match self {
            Format::Bold => "strong",
            Format::Italic => "i",
            Format::Highlight => "mark",
        }
    }
}

/// Strongest formatting carried by a span's style. Bold wins over italic,
/// italic over highlight.
fn span_format(style: &str) -> Option<Format> {
    let mut found = None;
    for (property, value) in style_declarations(style) {
        let format = match property.as_str() {
            "font-weight" if matches!(value, "bold" | "bolder" | "700" | "800" | "900") => Format::Bold,
            "font-style" if value == "italic" => Format::Italic,
            "-evernote-highlight" if value == "true" => Format::Highlight,
            "--en-highlight" if !value.is_empty() => Format::Highlight,
            _ => continue,
        };
        found = match (found, format) {
            (Some(Format::Bold), _) | (_, Format::Bold) => Some(Format::Bold),
            (Some(Format::Italic), _) | (_, Format::Italic) => Some(Format::Italic),
            _ => Some(Format::Highlight),
        };
    }
    found
}

/// Retags styled spans to `<strong>`, `<i>` or `<mark>` and drops their
/// attributes.
///
/// Whether highlights show up in the output is decided at render time; the
/// tree always carries them as `<mark>`.
pub struct TextFormatter;

impl TagRewriter for TextFormatter {
    fn rewrite(&mut self, dom: &mut Dom, node: NodeId) {
        if !dom.is_tag(node, "span") {
            return;
        }
        let Some(format) = dom.get_attr(node, "style").and_then(span_format) else {
            return;
        };

        dom.set_tag(node, format.tag());
        dom.clear_attrs(node);
    }
}
