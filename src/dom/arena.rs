//! Arena-allocated DOM for note markup.
//!
//! html5ever parses into this tree, the normalizer rewrites it in place and
//! both the serializer and the markdown renderer walk it. Nodes are never
//! freed: removing a node only unlinks it, which keeps every [`NodeId`]
//! handed out during a rewrite valid.

use html5ever::{LocalName, QualName, ns};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for a missing link.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
    },
}

/// A single `name="value"` pair on an element.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.into(),
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Tree of nodes linked by index.
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

/// Qualified name of an element in the HTML namespace.
pub fn html_name(local: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(local))
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds nothing but the document node.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.alloc(Node::new(NodeData::Element { name, attrs }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    pub fn create_doctype(&mut self, name: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype { name }))
    }

    pub fn parent(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.parent)
    }

    pub fn first_child(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.first_child)
    }

    pub fn next_sibling(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.next_sibling)
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// `child` must be detached.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last_child;
            node.next_sibling = NodeId::NONE;
        }

        if let Some(last) = self.get_mut(last_child) {
            last.next_sibling = child;
        }

        if let Some(node) = self.get_mut(parent) {
            if node.first_child.is_none() {
                node.first_child = child;
            }
            node.last_child = child;
        }
    }

    /// Insert the detached `new_node` right before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = self
            .get(sibling)
            .map_or((NodeId::NONE, NodeId::NONE), |n| (n.parent, n.prev_sibling));

        if let Some(node) = self.get_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = sibling;
        }

        if let Some(node) = self.get_mut(sibling) {
            node.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(node) = self.get_mut(prev) {
                node.next_sibling = new_node;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.first_child = new_node;
        }
    }

    /// Insert the detached `new_node` right after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, new_node: NodeId) {
        let next = self.next_sibling(sibling);
        if next.is_some() {
            self.insert_before(next, new_node);
        } else {
            let parent = self.parent(sibling);
            self.append(parent, new_node);
        }
    }

    /// Append text to `parent`, merging with a trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }

        let node = self.create_text(text);
        self.append(parent, node);
    }

    /// Unlink `id` from its parent and siblings. Its own subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let Some((parent, prev, next)) = self
            .get(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        if prev.is_some() {
            if let Some(node) = self.get_mut(prev) {
                node.next_sibling = next;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.first_child = next;
        }

        if next.is_some() {
            if let Some(node) = self.get_mut(next) {
                node.prev_sibling = prev;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Move every child of `from` to the end of `to`, preserving order.
    pub fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let children: Vec<_> = self.children(from).collect();
        for child in children {
            self.detach(child);
            self.append(to, child);
        }
    }

    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            dom: self,
            current: self.first_child(parent),
        }
    }

    /// First node of the subtree under `root` (pre-order) matching `predicate`.
    pub fn find<F>(&self, root: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if predicate(node) {
                    return Some(id);
                }
                let mut children: Vec<_> = self.children(id).collect();
                children.reverse();
                stack.extend(children);
            }
        }
        None
    }

    /// First element with the given tag name in document order.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(self.document, |node| {
            matches!(&node.data, NodeData::Element { name, .. } if name.local.as_ref() == tag)
        })
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Children<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.dom.next_sibling(id);
        Some(id)
    }
}

/// Element accessors.
impl Dom {
    /// Local tag name, `None` for anything but elements.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        })
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Rename an element, keeping its namespace and attributes.
    pub fn set_tag(&mut self, id: NodeId, tag: &str) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { name, .. } = &mut node.data
        {
            name.local = LocalName::from(tag);
        }
    }

    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn clear_attrs(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { attrs, .. } = &mut node.data
        {
            attrs.clear();
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(dom: &mut Dom, tag: &str) -> NodeId {
        dom.create_element(html_name(tag), vec![])
    }

    #[test]
    fn test_append_children() {
        let mut dom = Dom::new();
        let parent = element(&mut dom, "div");
        let first = element(&mut dom, "p");
        let second = element(&mut dom, "p");

        dom.append(dom.document(), parent);
        dom.append(parent, first);
        dom.append(parent, second);

        let children: Vec<_> = dom.children(parent).collect();
        assert_eq!(children, vec![first, second]);
        assert_eq!(dom.parent(second), parent);
    }

    #[test]
    fn test_insert_after_last_appends() {
        let mut dom = Dom::new();
        let parent = element(&mut dom, "div");
        let a = element(&mut dom, "a");
        let b = element(&mut dom, "b");
        let c = element(&mut dom, "i");
        dom.append(parent, a);
        dom.append(parent, b);

        dom.insert_after(a, c);
        let children: Vec<_> = dom.children(parent).collect();
        assert_eq!(children, vec![a, c, b]);

        let d = element(&mut dom, "u");
        dom.insert_after(b, d);
        assert_eq!(dom.children(parent).last(), Some(d));
    }

    #[test]
    fn test_detach_middle_and_edges() {
        let mut dom = Dom::new();
        let parent = element(&mut dom, "ul");
        let items: Vec<_> = (0..3).map(|_| element(&mut dom, "li")).collect();
        for &item in &items {
            dom.append(parent, item);
        }

        dom.detach(items[1]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![items[0], items[2]]);

        dom.detach(items[0]);
        dom.detach(items[2]);
        assert!(!dom.has_children(parent));
        assert!(dom.parent(items[0]).is_none());
    }

    #[test]
    fn test_text_merging() {
        let mut dom = Dom::new();
        let p = element(&mut dom, "p");
        dom.append_text(p, "Hello, ");
        dom.append_text(p, "World!");

        let children: Vec<_> = dom.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(dom.text(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_retag_keeps_attributes() {
        let mut dom = Dom::new();
        let span = dom.create_element(html_name("span"), vec![Attribute::new("style", "x")]);
        dom.set_tag(span, "strong");
        assert!(dom.is_tag(span, "strong"));
        assert_eq!(dom.get_attr(span, "style"), Some("x"));

        dom.clear_attrs(span);
        assert!(dom.attrs(span).is_empty());
    }
}
