//! The raw node storage behind the DOM handles.
//!
//! Nothing in here queues mutation records or custom element reactions. The handle methods in
//! [`crate::node`] wrap these operations and take care of the observable side effects.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// The key of a node in the thread's DOM. Keys carry a generation, so a stale id never aliases
    /// a node created later.
    pub struct NodeId;
}

/// A single `name="value"` pair on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<Attribute>,
}

impl ElementData {
    pub(crate) fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Set an attribute and return the previous value.
    pub(crate) fn set_attribute(&mut self, name: &str, value: &str) -> Option<String> {
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => Some(std::mem::replace(&mut attr.value, value.to_string())),
            None => {
                self.attributes.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                });
                None
            }
        }
    }

    pub(crate) fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|attr| attr.name == name)?;
        Some(self.attributes.remove(index).value)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Document,
    Fragment,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn can_have_children(&self) -> bool {
        !matches!(self.kind, NodeKind::Text(_))
    }
}

/// Where a node sat before it was detached.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Detached {
    pub(crate) parent: NodeId,
    pub(crate) previous_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
}

#[derive(Debug)]
pub(crate) struct Tree {
    nodes: SlotMap<NodeId, NodeData>,
    document: NodeId,
    document_element: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Tree {
    /// Create a tree holding an empty `<html><head></head><body></body></html>` document.
    pub(crate) fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let document = nodes.insert(NodeData::new(NodeKind::Document));
        let document_element = nodes.insert(NodeData::new(NodeKind::Element(ElementData::new(
            "html",
        ))));
        let head = nodes.insert(NodeData::new(NodeKind::Element(ElementData::new("head"))));
        let body = nodes.insert(NodeData::new(NodeKind::Element(ElementData::new("body"))));

        let mut tree = Self {
            nodes,
            document,
            document_element,
            head,
            body,
        };
        tree.insert(document, document_element, None);
        tree.insert(document_element, head, None);
        tree.insert(document_element, body, None);
        tree
    }

    pub(crate) fn document(&self) -> NodeId {
        self.document
    }

    pub(crate) fn document_element(&self) -> NodeId {
        self.document_element
    }

    pub(crate) fn head(&self) -> NodeId {
        self.head
    }

    pub(crate) fn body(&self) -> NodeId {
        self.body
    }

    pub(crate) fn create(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(NodeData::new(kind))
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(NodeData::element)
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(NodeData::element_mut)
    }

    pub(crate) fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub(crate) fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub(crate) fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    /// The topmost inclusive ancestor of the node.
    pub(crate) fn root(&self, mut id: NodeId) -> NodeId {
        while let Some(parent) = self.parent(id) {
            id = parent;
        }
        id
    }

    pub(crate) fn is_connected(&self, id: NodeId) -> bool {
        self.root(id) == self.document
    }

    /// Returns true if `ancestor` is `node` or one of its ancestors.
    pub(crate) fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inclusive_ancestors(node).any(|id| id == ancestor)
    }

    pub(crate) fn inclusive_ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.nodes.contains_key(id).then_some(id);
        std::iter::successors(start, move |id| self.parent(*id))
    }

    /// Every descendant of `id` in document (pre-)order, not including `id` itself.
    pub(crate) fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.extend(self.children(id).iter().rev().copied());
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// `id` followed by its descendants in document order.
    pub(crate) fn inclusive_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        out.extend(self.descendants(id));
        out
    }

    pub(crate) fn siblings_of(&self, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let Some(parent) = self.parent(id) else {
            return (None, None);
        };
        let children = self.children(parent);
        let Some(index) = children.iter().position(|child| *child == id) else {
            return (None, None);
        };
        let previous = index.checked_sub(1).map(|i| children[i]);
        let next = children.get(index + 1).copied();
        (previous, next)
    }

    /// Insert `child` under `parent`, before `reference` or at the end. The child must be detached.
    pub(crate) fn insert(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return;
        };
        let index = reference
            .and_then(|reference| parent_node.children.iter().position(|c| *c == reference))
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(index, child);
    }

    /// Unlink a node from its parent. Returns where it used to be.
    pub(crate) fn detach(&mut self, child: NodeId) -> Option<Detached> {
        let parent = self.parent(child)?;
        let (previous_sibling, next_sibling) = self.siblings_of(child);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
        Some(Detached {
            parent,
            previous_sibling,
            next_sibling,
        })
    }

    pub(crate) fn text_content(&self, id: NodeId) -> String {
        match self.get(id).map(|node| &node.kind) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|id| match &self.get(id)?.kind {
                    NodeKind::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }
}
