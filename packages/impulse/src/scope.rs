use impulse_dom::{Element, Selector};

use crate::error::Result;

/// The part of the tree an element owns: its subtree, minus nested elements with the same tag.
///
/// Targets and actions only bind to elements in scope, so nested instances of one element type
/// don't steal each other's children.
#[derive(Debug, Clone)]
pub struct Scope {
    host: Element,
    identifier: String,
    host_selector: Option<Selector>,
}

impl Scope {
    pub fn new(host: Element) -> Self {
        let identifier = host.local_name();
        Self {
            host,
            host_selector: Selector::parse(&identifier).ok(),
            identifier,
        }
    }

    pub fn host(&self) -> Element {
        self.host
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The first scoped element matching `selector`, starting with the host itself.
    pub fn find_target(&self, selector: &str) -> Result<Option<Element>> {
        Ok(self.find_targets(selector)?.into_iter().next())
    }

    /// Every scoped element matching `selector`, in document order.
    pub fn find_targets(&self, selector: &str) -> Result<Vec<Element>> {
        let selector = Selector::parse(selector)?;
        Ok(Some(self.host)
            .filter(|host| selector.matches(*host))
            .into_iter()
            .chain(selector.query_all(self.host.into()))
            .filter(|element| self.scoped_target(*element))
            .collect())
    }

    /// Whether the closest ancestor-or-self with the host's tag is the host.
    pub fn scoped_target(&self, element: Element) -> bool {
        self.host_selector
            .as_ref()
            .and_then(|selector| selector.closest(element))
            == Some(self.host)
    }
}
