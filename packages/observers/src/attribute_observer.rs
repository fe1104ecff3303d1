use std::rc::{Rc, Weak};

use impulse_dom::{Element, MutationObserverInit, Node};

use crate::element_observer::{ElementObserver, ElementObserverDelegate};

/// The callbacks an [`AttributeObserver`] drives.
pub trait AttributeObserverDelegate {
    /// `element` gained the attribute, or arrived below the root carrying it.
    fn element_connected(&self, element: Element);

    /// `element` lost the attribute, or left the root.
    fn element_disconnected(&self, element: Element);

    /// The attribute's value changed on an element that still carries it.
    fn element_attribute_changed(&self, element: Element, name: &str) {
        let _ = (element, name);
    }
}

/// Tracks the elements under a root that carry one attribute.
///
/// An empty value still counts as carrying the attribute. Changes to the attribute's value are
/// reported through [`AttributeObserverDelegate::element_attribute_changed`]; changes to other
/// attributes are never reported.
pub struct AttributeObserver {
    inner: Rc<Inner>,
}

struct Inner {
    attribute_name: String,
    delegate: Weak<dyn AttributeObserverDelegate>,
    element_observer: ElementObserver,
}

impl AttributeObserver {
    /// Create a stopped observer for the elements under `root` carrying `attribute_name`.
    pub fn new<D>(root: impl Into<Node>, attribute_name: &str, delegate: Weak<D>) -> Self
    where
        D: AttributeObserverDelegate + 'static,
    {
        let root = root.into();
        let attribute_name = attribute_name.to_ascii_lowercase();
        let delegate: Weak<dyn AttributeObserverDelegate> = delegate;
        // A child list with an attribute filter is always a valid configuration.
        let options = ElementObserver::merged_options(
            &MutationObserverInit::new().attribute_filter([attribute_name.clone()]),
        );

        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| Inner {
            element_observer: ElementObserver::from_validated(root, weak.clone(), options),
            attribute_name,
            delegate,
        });
        Self { inner }
    }

    pub fn start(&self) {
        self.inner.element_observer.start();
    }

    pub fn stop(&self) {
        self.inner.element_observer.stop();
    }

    pub fn is_started(&self) -> bool {
        self.inner.element_observer.is_started()
    }

    pub fn attribute_name(&self) -> &str {
        &self.inner.attribute_name
    }

    /// The tracked elements in document order.
    pub fn elements(&self) -> Vec<Element> {
        self.inner.element_observer.elements()
    }
}

impl ElementObserverDelegate for Inner {
    fn matches_element(&self, element: Element) -> bool {
        element.has_attribute(&self.attribute_name)
    }

    fn matching_elements(&self, root: Node) -> Vec<Element> {
        root.as_element()
            .into_iter()
            .chain(root.descendant_elements())
            .filter(|element| self.matches_element(*element))
            .collect()
    }

    fn element_connected(&self, element: Element) {
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.element_connected(element);
        }
    }

    fn element_disconnected(&self, element: Element) {
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.element_disconnected(element);
        }
    }

    fn observes_attribute_changes(&self) -> bool {
        true
    }

    fn element_attribute_changed(&self, element: Element, name: &str) {
        if name != self.attribute_name {
            return;
        }
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.element_attribute_changed(element, name);
        }
    }
}
