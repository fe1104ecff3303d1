//! `Node` and `Element` handles.
//!
//! Handles are plain `Copy` ids into the thread's DOM. Every mutating method queues the mutation
//! records and custom element reactions the change causes, and drains the reactions before it
//! returns.

use std::fmt;
use std::ops::Deref;

use crate::custom_element::{enqueue_attribute_changed, enqueue_connected, enqueue_disconnected};
use crate::error::{DomError, Result};
use crate::mutation_observer::{queue_record, RecordData};
use crate::runtime::{run_reactions, with_runtime, with_tree, with_tree_mut, Runtime};
use crate::selector::Selector;
use crate::tree::{Attribute, NodeId, NodeKind};

/// The kind of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    DocumentFragment,
    Element,
    Text,
}

/// A handle to any node in the thread's DOM.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
    pub(crate) id: NodeId,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_element() {
            Some(element) => element.fmt(f),
            None => write!(f, "Node({:?}, {:?})", self.node_type(), self.id),
        }
    }
}

impl Node {
    pub(crate) fn from_id(id: NodeId) -> Self {
        Self { id }
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        with_tree(|tree| match tree.get(self.id).map(|node| &node.kind) {
            Some(NodeKind::Document) => NodeType::Document,
            Some(NodeKind::Fragment) => NodeType::DocumentFragment,
            Some(NodeKind::Element(_)) => NodeType::Element,
            // Stale handles behave like detached text: no children, no attributes.
            Some(NodeKind::Text(_)) | None => NodeType::Text,
        })
    }

    /// Returns the element behind this handle, if it is one.
    pub fn as_element(&self) -> Option<Element> {
        with_tree(|tree| tree.is_element(self.id)).then_some(Element { node: *self })
    }

    pub fn parent_node(&self) -> Option<Node> {
        with_tree(|tree| tree.parent(self.id)).map(Node::from_id)
    }

    pub fn parent_element(&self) -> Option<Element> {
        with_tree(|tree| tree.parent_element(self.id)).map(Element::from_id)
    }

    pub fn child_nodes(&self) -> Vec<Node> {
        with_tree(|tree| tree.children(self.id).iter().copied().map(Node::from_id).collect())
    }

    /// The element children, skipping text.
    pub fn children(&self) -> Vec<Element> {
        with_tree(|tree| {
            tree.children(self.id)
                .iter()
                .copied()
                .filter(|id| tree.is_element(*id))
                .map(Element::from_id)
                .collect()
        })
    }

    /// Every descendant element in document order, not including this node.
    pub fn descendant_elements(&self) -> Vec<Element> {
        with_tree(|tree| {
            tree.descendants(self.id)
                .into_iter()
                .filter(|id| tree.is_element(*id))
                .map(Element::from_id)
                .collect()
        })
    }

    pub fn first_child(&self) -> Option<Node> {
        with_tree(|tree| tree.children(self.id).first().copied()).map(Node::from_id)
    }

    pub fn last_child(&self) -> Option<Node> {
        with_tree(|tree| tree.children(self.id).last().copied()).map(Node::from_id)
    }

    pub fn first_element_child(&self) -> Option<Element> {
        self.children().into_iter().next()
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        with_tree(|tree| tree.siblings_of(self.id).0).map(Node::from_id)
    }

    pub fn next_sibling(&self) -> Option<Node> {
        with_tree(|tree| tree.siblings_of(self.id).1).map(Node::from_id)
    }

    /// Whether the node's root is the document.
    pub fn is_connected(&self) -> bool {
        with_tree(|tree| tree.is_connected(self.id))
    }

    /// Whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: impl Into<Node>) -> bool {
        let other = other.into();
        with_tree(|tree| tree.is_inclusive_ancestor(self.id, other.id))
    }

    pub fn text_content(&self) -> String {
        with_tree(|tree| tree.text_content(self.id))
    }

    /// Replace all children with a single text node, or with nothing when `text` is empty.
    pub fn set_text_content(&self, text: &str) -> Result<()> {
        if let Some(NodeKind::Text(_)) = with_tree(|tree| tree.get(self.id).map(|n| n.kind.clone()))
        {
            with_tree_mut(|tree| {
                if let Some(node) = tree.get_mut(self.id) {
                    node.kind = NodeKind::Text(text.to_string());
                }
            });
            return Ok(());
        }
        let replacement = (!text.is_empty()).then(|| crate::document::document().create_text_node(text));
        self.replace_children(replacement)
    }

    pub fn append_child(&self, child: impl Into<Node>) -> Result<Node> {
        self.insert_before(child, None)
    }

    /// Insert `node` before `reference`, or at the end when `reference` is `None`.
    ///
    /// A node that already has a parent is moved. Inserting a document fragment moves its
    /// children instead of the fragment itself.
    pub fn insert_before(&self, node: impl Into<Node>, reference: Option<Node>) -> Result<Node> {
        let node = node.into();
        self.ensure_pre_insert_validity(node, reference)?;

        let result = with_runtime(|rt| {
            let mut reference = reference.map(|r| r.id);
            if reference == Some(node.id) {
                reference = rt.tree.borrow().siblings_of(node.id).1;
            }

            let nodes = if node.node_type() == NodeType::DocumentFragment {
                take_fragment_children(rt, node.id)
            } else {
                remove_node(rt, node.id);
                vec![node.id]
            };
            if nodes.is_empty() {
                return node;
            }

            let previous_sibling = {
                let mut tree = rt.tree.borrow_mut();
                let previous = match reference {
                    Some(reference) => tree.siblings_of(reference).0,
                    None => tree.children(self.id).last().copied(),
                };
                for id in &nodes {
                    tree.insert(self.id, *id, reference);
                }
                previous
            };

            queue_record(
                rt,
                self.id,
                RecordData::ChildList {
                    added: nodes.clone(),
                    removed: Vec::new(),
                    previous_sibling,
                    next_sibling: reference,
                },
            );
            enqueue_connected(rt, &nodes);
            node
        });

        run_reactions();
        Ok(result)
    }

    pub fn remove_child(&self, child: impl Into<Node>) -> Result<Node> {
        let child = child.into();
        if child.parent_node() != Some(*self) {
            return Err(DomError::NotFound);
        }
        with_runtime(|rt| remove_node(rt, child.id));
        run_reactions();
        Ok(child)
    }

    /// Detach the node from its parent. Does nothing for a node without a parent.
    pub fn remove(&self) {
        with_runtime(|rt| remove_node(rt, self.id));
        run_reactions();
    }

    /// Remove every child and append `nodes` in order.
    pub fn replace_children(&self, nodes: impl IntoIterator<Item = Node>) -> Result<()> {
        let nodes: Vec<Node> = nodes.into_iter().collect();
        for node in &nodes {
            self.ensure_pre_insert_validity(*node, None)?;
        }
        for child in self.child_nodes() {
            with_runtime(|rt| remove_node(rt, child.id));
        }
        run_reactions();
        for node in nodes {
            self.append_child(node)?;
        }
        Ok(())
    }

    /// The first element, in document order, among the descendants that matches `selectors`.
    pub fn query_selector(&self, selectors: &str) -> Result<Option<Element>> {
        let selector = Selector::parse(selectors)?;
        Ok(selector.query_first(*self))
    }

    /// All descendant elements that match `selectors`, in document order.
    pub fn query_selector_all(&self, selectors: &str) -> Result<Vec<Element>> {
        let selector = Selector::parse(selectors)?;
        Ok(selector.query_all(*self))
    }

    fn ensure_pre_insert_validity(&self, node: Node, reference: Option<Node>) -> Result<()> {
        with_tree(|tree| {
            let parent = tree.get(self.id).ok_or(DomError::NotFound)?;
            if !parent.can_have_children() {
                return Err(DomError::HierarchyRequest("text nodes cannot have children"));
            }
            let child = tree.get(node.id).ok_or(DomError::NotFound)?;
            if matches!(child.kind, NodeKind::Document) {
                return Err(DomError::HierarchyRequest("a document cannot be inserted"));
            }
            if matches!(parent.kind, NodeKind::Document) && matches!(child.kind, NodeKind::Text(_)) {
                return Err(DomError::HierarchyRequest("a document cannot hold text"));
            }
            if tree.is_inclusive_ancestor(node.id, self.id) {
                return Err(DomError::HierarchyRequest(
                    "the new child is an ancestor of the parent",
                ));
            }
            if let Some(reference) = reference {
                if tree.parent(reference.id) != Some(self.id) {
                    return Err(DomError::NotFound);
                }
            }
            Ok(())
        })
    }
}

/// Detach `id`, queueing the child list record and the disconnect reactions.
fn remove_node(rt: &Runtime, id: NodeId) {
    let (detached, was_connected) = {
        let mut tree = rt.tree.borrow_mut();
        let was_connected = tree.is_connected(id);
        (tree.detach(id), was_connected)
    };
    let Some(detached) = detached else {
        return;
    };
    queue_record(
        rt,
        detached.parent,
        RecordData::ChildList {
            added: Vec::new(),
            removed: vec![id],
            previous_sibling: detached.previous_sibling,
            next_sibling: detached.next_sibling,
        },
    );
    if was_connected {
        enqueue_disconnected(rt, &[id]);
    }
}

fn take_fragment_children(rt: &Runtime, fragment: NodeId) -> Vec<NodeId> {
    let children = {
        let mut tree = rt.tree.borrow_mut();
        let children = tree.children(fragment).to_vec();
        for child in &children {
            tree.detach(*child);
        }
        children
    };
    if !children.is_empty() {
        queue_record(
            rt,
            fragment,
            RecordData::ChildList {
                added: Vec::new(),
                removed: children.clone(),
                previous_sibling: None,
                next_sibling: None,
            },
        );
    }
    children
}

/// A handle to an element node. Derefs to [`Node`] for the tree operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    node: Node,
}

impl Deref for Element {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        element.node
    }
}

impl From<&Element> for Node {
    fn from(element: &Element) -> Self {
        element.node
    }
}

impl From<&Node> for Node {
    fn from(node: &Node) -> Self {
        *node
    }
}

impl TryFrom<Node> for Element {
    type Error = DomError;

    fn try_from(node: Node) -> Result<Self> {
        node.as_element()
            .ok_or_else(|| DomError::NotSupported("the node is not an element".to_string()))
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!("<{}", self.local_name());
        for attr in self.attributes() {
            out.push_str(&format!(" {}=\"{}\"", attr.name, attr.value));
        }
        out.push('>');
        f.write_str(&out)
    }
}

impl Element {
    pub(crate) fn from_id(id: NodeId) -> Self {
        Self {
            node: Node::from_id(id),
        }
    }

    pub fn as_node(&self) -> Node {
        self.node
    }

    /// The lowercase tag name.
    pub fn local_name(&self) -> String {
        with_tree(|tree| tree.element(self.id).map(|el| el.tag.clone()).unwrap_or_default())
    }

    /// The uppercase tag name, as `Element.tagName` reports it for HTML elements.
    pub fn tag_name(&self) -> String {
        self.local_name().to_ascii_uppercase()
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        with_tree(|tree| {
            tree.element(self.id)
                .map(|el| el.attributes.clone())
                .unwrap_or_default()
        })
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes().into_iter().map(|attr| attr.name).collect()
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        with_tree(|tree| {
            tree.element(self.id)
                .and_then(|el| el.attribute(&name))
                .map(str::to_string)
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    /// Set an attribute. A record is queued even when the value does not change.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        let name = validate_name(name)?;
        with_runtime(|rt| {
            let old_value = {
                let mut tree = rt.tree.borrow_mut();
                let Some(element) = tree.element_mut(self.id) else {
                    return;
                };
                element.set_attribute(&name, value)
            };
            queue_record(
                rt,
                self.id,
                RecordData::Attributes {
                    name: name.clone(),
                    old_value: old_value.clone(),
                },
            );
            enqueue_attribute_changed(rt, *self, &name, old_value, Some(value.to_string()));
        });
        run_reactions();
        Ok(())
    }

    /// Remove an attribute. Removing an absent attribute does nothing.
    pub fn remove_attribute(&self, name: &str) {
        let name = name.to_ascii_lowercase();
        with_runtime(|rt| {
            let old_value = {
                let mut tree = rt.tree.borrow_mut();
                tree.element_mut(self.id)
                    .and_then(|el| el.remove_attribute(&name))
            };
            let Some(old_value) = old_value else {
                return;
            };
            queue_record(
                rt,
                self.id,
                RecordData::Attributes {
                    name: name.clone(),
                    old_value: Some(old_value.clone()),
                },
            );
            enqueue_attribute_changed(rt, *self, &name, Some(old_value), None);
        });
        run_reactions();
    }

    /// Toggle a boolean attribute. With `force` the attribute is only added (`Some(true)`) or
    /// only removed (`Some(false)`). Returns whether the attribute is present afterwards.
    pub fn toggle_attribute(&self, name: &str, force: Option<bool>) -> Result<bool> {
        let name = validate_name(name)?;
        let present = self.has_attribute(&name);
        match (present, force) {
            (false, None | Some(true)) => {
                self.set_attribute(&name, "")?;
                Ok(true)
            }
            (true, None | Some(false)) => {
                self.remove_attribute(&name);
                Ok(false)
            }
            (present, Some(_)) => Ok(present),
        }
    }

    pub fn id(&self) -> String {
        self.get_attribute("id").unwrap_or_default()
    }

    pub fn set_id(&self, id: &str) -> Result<()> {
        self.set_attribute("id", id)
    }

    pub fn class_list(&self) -> ClassList {
        ClassList { element: *self }
    }

    /// Whether this element matches the selector list.
    pub fn matches(&self, selectors: &str) -> Result<bool> {
        Ok(Selector::parse(selectors)?.matches(*self))
    }

    /// The closest inclusive ancestor matching the selector list.
    pub fn closest(&self, selectors: &str) -> Result<Option<Element>> {
        Ok(Selector::parse(selectors)?.closest(*self))
    }
}

/// The whitespace separated tokens of an element's `class` attribute.
#[derive(Debug, Clone, Copy)]
pub struct ClassList {
    element: Element,
}

impl ClassList {
    pub fn values(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for token in self
            .element
            .get_attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
        {
            if !out.iter().any(|t| t == token) {
                out.push(token.to_string());
            }
        }
        out
    }

    pub fn contains(&self, token: &str) -> bool {
        self.values().iter().any(|t| t == token)
    }

    pub fn add(&self, token: &str) -> Result<()> {
        let mut values = self.values();
        if !values.iter().any(|t| t == token) {
            values.push(token.to_string());
        }
        self.element.set_attribute("class", &values.join(" "))
    }

    pub fn remove(&self, token: &str) -> Result<()> {
        if !self.element.has_attribute("class") {
            return Ok(());
        }
        let values: Vec<String> = self.values().into_iter().filter(|t| t != token).collect();
        self.element.set_attribute("class", &values.join(" "))
    }

    /// Returns whether the token is present afterwards.
    pub fn toggle(&self, token: &str) -> Result<bool> {
        if self.contains(token) {
            self.remove(token)?;
            Ok(false)
        } else {
            self.add(token)?;
            Ok(true)
        }
    }
}

/// Check a tag or attribute name and lowercase it.
pub(crate) fn validate_name(name: &str) -> Result<String> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<'));
    if invalid {
        return Err(DomError::InvalidCharacter(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}
