//! HTML tree → Markdown rendering.
//!
//! Pure string accumulation over a parsed [`Dom`]; no I/O happens here.

use crate::dom::{self, Dom, NodeData, NodeId};

use super::escape::{code_fence, escape_markdown, inline_code_ticks};

/// Fixed markup emitted around highlighted text.
pub const HIGHLIGHT_OPEN: &str = r#"<span style="background-color: #ffaaaa">"#;
pub const HIGHLIGHT_CLOSE: &str = "</span>";

/// Options of the markdown rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Render `<mark>` as an inline HTML span with a background color.
    /// When off, highlighted text is rendered as plain text.
    pub highlights: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { highlights: true }
    }
}

#[derive(Debug, Clone)]
struct ListContext {
    ordered: bool,
    counter: usize,
}

/// Rendering state for one document.
pub struct RenderContext<'a> {
    dom: &'a Dom,
    options: RenderOptions,
    output: String,
    line_prefix: String,
    list_stack: Vec<ListContext>,
    at_line_start: bool,
    has_line_content: bool,
    pending_newline: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(dom: &'a Dom, options: RenderOptions) -> Self {
        Self {
            dom,
            options,
            output: String::new(),
            line_prefix: String::new(),
            list_stack: Vec::new(),
            at_line_start: true,
            has_line_content: false,
            pending_newline: false,
        }
    }

    /// Render the subtree under `root`, consuming the context.
    pub fn render(mut self, root: NodeId) -> String {
        self.walk_children(root);
        if !self.at_line_start {
            self.output.push('\n');
        }
        self.output
    }

    fn ensure_line_started(&mut self) {
        if self.at_line_start {
            self.output.push_str(&self.line_prefix);
            self.at_line_start = false;
        }
    }

    fn write_newline(&mut self) {
        self.output.push('\n');
        self.at_line_start = true;
        self.has_line_content = false;
    }

    /// Write inline content on the current line.
    fn write_inline(&mut self, text: &str) {
        self.ensure_line_started();
        self.output.push_str(text);
        self.has_line_content = true;
    }

    /// Separate a paragraph-like block from what precedes it.
    fn start_block(&mut self) {
        if self.pending_newline {
            if !self.at_line_start {
                self.write_newline();
            }
            self.write_newline();
            self.pending_newline = false;
        } else if self.has_line_content {
            self.write_newline();
        }
    }

    fn end_block(&mut self) {
        self.pending_newline = true;
    }

    fn walk_children(&mut self, id: NodeId) {
        let mut child = self.dom.first_child(id);
        while child.is_some() {
            self.walk_node(child);
            child = self.dom.next_sibling(child);
        }
    }

    fn walk_node(&mut self, id: NodeId) {
        let dom = self.dom;
        let Some(node) = dom.get(id) else {
            return;
        };

        match &node.data {
            NodeData::Text(text) => self.write_text(text),
            NodeData::Element { name, .. } => {
                let tag = name.local.as_ref();
                self.walk_element(id, tag);
            }
            NodeData::Document => self.walk_children(id),
            NodeData::Comment(_) | NodeData::Doctype { .. } => {}
        }
    }

    fn walk_element(&mut self, id: NodeId, tag: &str) {
        let dom = self.dom;
        match tag {
            "head" | "title" | "script" | "style" => {}

            "p" => {
                self.start_block();
                self.walk_children(id);
                self.end_block();
            }

            // Evernote writes one `<div>` per line
            "div" => {
                self.start_block();
                self.walk_children(id);
                if self.has_line_content {
                    self.write_newline();
                }
            }

            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                self.start_block();
                self.write_inline(&"#".repeat(level));
                self.output.push(' ');
                self.walk_children(id);
                self.end_block();
            }

            "br" => self.write_newline(),

            "hr" => {
                self.start_block();
                self.write_inline("---");
                self.end_block();
            }

            "ul" | "ol" => {
                self.start_block();
                self.list_stack.push(ListContext {
                    ordered: tag == "ol",
                    counter: 0,
                });
                self.walk_children(id);
                self.list_stack.pop();
                self.end_block();
            }

            "li" => self.walk_list_item(id),

            "blockquote" => {
                self.start_block();
                let old_prefix = self.line_prefix.clone();
                self.line_prefix.push_str("> ");
                self.walk_children(id);
                self.line_prefix = old_prefix;
                if self.has_line_content {
                    self.write_newline();
                }
                self.end_block();
            }

            "pre" => self.walk_code_block(id),

            "table" => self.walk_table(id),

            "strong" | "b" => self.wrap_inline(id, "**", "**"),
            "em" | "i" => self.wrap_inline(id, "*", "*"),
            "s" | "strike" | "del" => self.wrap_inline(id, "~~", "~~"),

            "mark" if self.options.highlights => {
                self.wrap_inline(id, HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE);
            }

            "code" | "tt" | "kbd" => {
                let content = self.collect_text(id);
                if content.is_empty() {
                    return;
                }
                let ticks = inline_code_ticks(&content);
                let spacer = if content.starts_with('`') || content.ends_with('`') {
                    " "
                } else {
                    ""
                };
                self.write_inline(&format!("{ticks}{spacer}{content}{spacer}{ticks}"));
            }

            "a" => {
                let href = dom.get_attr(id, "href").unwrap_or("");
                if href.is_empty() {
                    self.walk_children(id);
                } else {
                    self.write_inline("[");
                    self.walk_children(id);
                    self.write_inline(&format!("]({href})"));
                }
            }

            "img" => {
                let alt = dom.get_attr(id, "alt").unwrap_or("");
                let src = dom.get_attr(id, "src").unwrap_or("");
                if !src.is_empty() {
                    let image = format!("![{alt}]({src})");
                    self.write_inline(&image);
                }
            }

            "en-todo" => {
                let checked = dom.get_attr(id, "checked") == Some("true");
                self.write_inline(if checked { "[x] " } else { "[ ] " });
                self.walk_children(id);
            }

            // `en-media`, `span`, `font`, `body`, `mark` without highlights
            // and anything unknown only contribute their content
            _ => self.walk_children(id),
        }
    }

    fn wrap_inline(&mut self, id: NodeId, open: &str, close: &str) {
        if self.collect_text(id).is_empty() && !self.has_media(id) {
            return;
        }
        self.write_inline(open);
        self.walk_children(id);
        self.write_inline(close);
    }

    fn has_media(&self, id: NodeId) -> bool {
        self.dom
            .find(id, |node| matches!(&node.data, NodeData::Element { name, .. } if name.local.as_ref() == "img"))
            .is_some()
    }

    fn walk_list_item(&mut self, id: NodeId) {
        if !self.at_line_start {
            self.write_newline();
        }

        let bullet = match self.list_stack.last_mut() {
            Some(list) if list.ordered => {
                list.counter += 1;
                format!("{}. ", list.counter)
            }
            Some(_) => "- ".to_string(),
            None => String::new(),
        };

        self.ensure_line_started();
        self.output.push_str(&bullet);

        let old_prefix = self.line_prefix.clone();
        self.line_prefix.push_str(&" ".repeat(bullet.len()));
        self.walk_children(id);
        self.line_prefix = old_prefix;

        if !self.at_line_start {
            self.write_newline();
        }
        self.pending_newline = false;
    }

    fn walk_code_block(&mut self, id: NodeId) {
        self.start_block();

        let mut text = String::new();
        self.collect_verbatim(id, &mut text);
        let text = text.trim_end_matches('\n');
        let fence = code_fence(text);

        self.write_inline(&fence);
        self.write_newline();
        for line in text.lines() {
            self.ensure_line_started();
            self.output.push_str(line);
            self.write_newline();
        }
        self.write_inline(&fence);
        self.end_block();
    }

    fn walk_table(&mut self, id: NodeId) {
        let mut rows = Vec::new();
        self.collect_rows(id, &mut rows);
        let Some(columns) = rows.first().map(Vec::len).filter(|&n| n > 0) else {
            return;
        };

        let empty = String::new();
        self.start_block();
        for (index, row) in rows.iter().enumerate() {
            let mut line = String::from("|");
            for cell in row.iter().chain(std::iter::repeat(&empty)).take(columns) {
                line.push(' ');
                line.push_str(cell);
                line.push_str(" |");
            }
            self.write_inline(&line);
            self.write_newline();

            if index == 0 {
                let separator = format!("|{}", " --- |".repeat(columns));
                self.write_inline(&separator);
                self.write_newline();
            }
        }
        self.end_block();
    }

    fn collect_rows(&self, id: NodeId, rows: &mut Vec<Vec<String>>) {
        for child in self.dom.children(id) {
            match self.dom.tag(child) {
                Some("tr") => {
                    let cells = self
                        .dom
                        .children(child)
                        .filter(|&cell| matches!(self.dom.tag(cell), Some("td" | "th")))
                        .map(|cell| escape_markdown(&self.collect_text(cell)))
                        .collect();
                    rows.push(cells);
                }
                // Nested tables are flattened into their cell text
                Some("table") => {}
                _ => self.collect_rows(child, rows),
            }
        }
    }

    fn write_text(&mut self, text: &str) {
        let has_leading = text.starts_with(char::is_whitespace);
        let has_trailing = text.ends_with(char::is_whitespace);
        let words: Vec<&str> = text.split_whitespace().collect();

        if words.is_empty() {
            if !text.is_empty() && self.has_line_content && !self.output.ends_with(' ') {
                self.output.push(' ');
            }
            return;
        }

        if has_leading && self.has_line_content && !self.output.ends_with(' ') {
            self.output.push(' ');
        }
        self.write_inline(&escape_markdown(&words.join(" ")));
        if has_trailing {
            self.output.push(' ');
        }
    }

    /// Whitespace-normalized text of a subtree.
    fn collect_text(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text_recursive(id, &mut result);
        result.trim().to_string()
    }

    fn collect_text_recursive(&self, id: NodeId, result: &mut String) {
        if let Some(text) = self.dom.text(id) {
            let words: Vec<&str> = text.split_whitespace().collect();
            if text.starts_with(char::is_whitespace) && !result.ends_with(' ') {
                result.push(' ');
            }
            result.push_str(&words.join(" "));
            if !words.is_empty() && text.ends_with(char::is_whitespace) {
                result.push(' ');
            }
            return;
        }
        for child in self.dom.children(id) {
            self.collect_text_recursive(child, result);
        }
    }

    /// Literal text of a code block. `<br>` is a line break unless it only
    /// pads an otherwise empty line `<div>`, which already ends in one.
    fn collect_verbatim(&self, id: NodeId, result: &mut String) {
        match self.dom.get(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => result.push_str(text),
            Some(NodeData::Element { name, .. }) if name.local.as_ref() == "br" => {
                let parent = self.dom.parent(id);
                let pads_line = self.dom.is_tag(parent, "div") && self.dom.next_sibling(id).is_none();
                if !pads_line {
                    result.push('\n');
                }
            }
            _ => {
                for child in self.dom.children(id) {
                    self.collect_verbatim(child, result);
                }
            }
        }
    }
}

/// Convert HTML markup to markdown text.
pub fn convert(markup: &[u8], options: &RenderOptions) -> String {
    let text = crate::util::decode_text(markup, None);
    let tree = dom::parse_html(&text);
    let root = dom::body(&tree);
    RenderContext::new(&tree, *options).render(root)
}
