use std::ops::Deref;

use crate::error::Result;
use crate::node::{validate_name, Element, Node};
use crate::runtime::{run_reactions, with_runtime, with_tree, with_tree_mut};
use crate::tree::{ElementData, NodeKind};

/// Get the document of the current thread.
pub fn document() -> Document {
    Document {
        node: Node::from_id(with_tree(|tree| tree.document())),
    }
}

/// A handle to the thread's document. Derefs to [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Document {
    node: Node,
}

impl Deref for Document {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl From<Document> for Node {
    fn from(document: Document) -> Self {
        document.node
    }
}

impl Document {
    /// The `<html>` element.
    pub fn document_element(&self) -> Element {
        Element::from_id(with_tree(|tree| tree.document_element()))
    }

    pub fn head(&self) -> Element {
        Element::from_id(with_tree(|tree| tree.head()))
    }

    pub fn body(&self) -> Element {
        Element::from_id(with_tree(|tree| tree.body()))
    }

    /// Create a detached element. If a custom element is defined for the tag, the element is
    /// upgraded before this returns, unless this is called from inside a custom element callback.
    /// The upgrade then runs once that callback returns.
    pub fn create_element(&self, tag: &str) -> Result<Element> {
        let tag = validate_name(tag)?;
        let element = Element::from_id(
            with_tree_mut(|tree| tree.create(NodeKind::Element(ElementData::new(tag)))),
        );
        with_runtime(|rt| crate::custom_element::enqueue_upgrade(rt, element));
        run_reactions();
        Ok(element)
    }

    pub fn create_text_node(&self, text: &str) -> Node {
        Node::from_id(with_tree_mut(|tree| tree.create(NodeKind::Text(text.to_string()))))
    }

    pub fn create_document_fragment(&self) -> Node {
        Node::from_id(with_tree_mut(|tree| tree.create(NodeKind::Fragment)))
    }

    /// The element with the given `id` attribute, in document order.
    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        let ids = with_tree(|tree| tree.descendants(tree.document()));
        ids.into_iter()
            .filter_map(|id| Node::from_id(id).as_element())
            .find(|element| element.get_attribute("id").as_deref() == Some(id))
    }
}
