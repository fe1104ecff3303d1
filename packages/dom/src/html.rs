//! Building nodes from HTML markup.

use html_parser::Dom;

use crate::document::document;
use crate::error::{DomError, Result};
use crate::node::{Element, Node};

/// Parse `html` into a detached document fragment.
pub fn parse_fragment(html: &str) -> Result<Node> {
    let dom = Dom::parse(html)?;
    let fragment = document().create_document_fragment();
    for child in &dom.children {
        if let Some(node) = build(child)? {
            fragment.append_child(node)?;
        }
    }
    Ok(fragment)
}

/// Parse `html` and append its first element to `<body>`.
///
/// This is the usual way to set up a test: the returned element is connected, so any custom
/// elements inside it have already been upgraded and connected.
pub fn fixture(html: &str) -> Result<Element> {
    let fragment = parse_fragment(html)?;
    let element = fragment
        .first_element_child()
        .ok_or_else(|| DomError::Parse("the markup does not contain an element".to_string()))?;
    document().body().append_child(element)?;
    Ok(element)
}

impl Element {
    /// Replace the element's children with the nodes parsed from `html`.
    pub fn set_inner_html(&self, html: &str) -> Result<()> {
        let fragment = parse_fragment(html)?;
        self.replace_children(fragment.child_nodes())
    }
}

fn build(node: &html_parser::Node) -> Result<Option<Node>> {
    match node {
        html_parser::Node::Text(text) => Ok(Some(document().create_text_node(text))),
        html_parser::Node::Comment(_) => Ok(None),
        html_parser::Node::Element(source) => {
            let element = document().create_element(&source.name)?;

            if let Some(id) = &source.id {
                element.set_attribute("id", id)?;
            }
            if !source.classes.is_empty() {
                element.set_attribute("class", &source.classes.join(" "))?;
            }
            let mut attributes: Vec<_> = source.attributes.iter().collect();
            attributes.sort_by(|a, b| a.0.cmp(b.0));
            for (name, value) in attributes {
                element.set_attribute(name, value.as_deref().unwrap_or(""))?;
            }

            for child in &source.children {
                if let Some(child) = build(child)? {
                    element.append_child(child)?;
                }
            }
            Ok(Some(element.as_node()))
        }
    }
}
