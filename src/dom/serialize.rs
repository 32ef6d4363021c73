//! HTML serialization of a [`Dom`] through html5ever's serializer.

use std::collections::VecDeque;
use std::io;

use html5ever::QualName;
use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize};

use super::arena::{Dom, NodeData, NodeId};

/// A subtree of a [`Dom`] ready to be handed to the serializer.
struct Subtree<'a> {
    dom: &'a Dom,
    root: NodeId,
}

enum Step {
    Open(NodeId),
    Close(QualName),
}

impl Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(
        &self,
        serializer: &mut S,
        traversal_scope: TraversalScope,
    ) -> io::Result<()> {
        let mut steps = VecDeque::new();
        match traversal_scope {
            TraversalScope::IncludeNode => steps.push_back(Step::Open(self.root)),
            TraversalScope::ChildrenOnly(_) => {
                steps.extend(self.dom.children(self.root).map(Step::Open));
            }
        }

        while let Some(step) = steps.pop_front() {
            let id = match step {
                Step::Close(name) => {
                    serializer.end_elem(name)?;
                    continue;
                }
                Step::Open(id) => id,
            };
            let Some(node) = self.dom.get(id) else {
                continue;
            };

            match &node.data {
                NodeData::Element { name, attrs } => {
                    serializer.start_elem(
                        name.clone(),
                        attrs.iter().map(|a| (&a.name, a.value.as_str())),
                    )?;
                    steps.push_front(Step::Close(name.clone()));
                }
                NodeData::Document => {}
                NodeData::Text(text) => {
                    serializer.write_text(text)?;
                    continue;
                }
                NodeData::Comment(text) => {
                    serializer.write_comment(text)?;
                    continue;
                }
                NodeData::Doctype { name } => {
                    serializer.write_doctype(name)?;
                    continue;
                }
            }

            let children: Vec<_> = self.dom.children(id).collect();
            for child in children.into_iter().rev() {
                steps.push_front(Step::Open(child));
            }
        }

        Ok(())
    }
}

/// Serialize the children of `root` as HTML.
pub fn to_html(dom: &Dom, root: NodeId) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut out, &Subtree { dom, root }, opts)?;
    Ok(out)
}
