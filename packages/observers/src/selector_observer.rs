use std::rc::{Rc, Weak};

use impulse_dom::{Element, MutationObserverInit, Node, Result, Selector};

use crate::element_observer::{ElementObserver, ElementObserverDelegate};

/// The callbacks a [`SelectorObserver`] drives.
pub trait SelectorObserverDelegate {
    /// `element` started matching the selector below the root, either because it arrived or
    /// because one of the attributes the selector reads changed.
    fn element_connected(&self, element: Element) {
        let _ = element;
    }

    /// `element` stopped matching, or left the root.
    fn element_disconnected(&self, element: Element) {
        let _ = element;
    }
}

/// Tracks the elements under a root that match a selector.
///
/// Only the attributes the selector reads are observed. A change to one of them re-checks the
/// element it happened on.
pub struct SelectorObserver {
    inner: Rc<Inner>,
}

struct Inner {
    selector: Selector,
    delegate: Weak<dyn SelectorObserverDelegate>,
    element_observer: ElementObserver,
}

impl SelectorObserver {
    /// Create a stopped observer. Fails with [`impulse_dom::DomError::InvalidSelector`] when
    /// `selector` does not parse.
    pub fn new<D>(root: impl Into<Node>, selector: &str, delegate: Weak<D>) -> Result<Self>
    where
        D: SelectorObserverDelegate + 'static,
    {
        let root = root.into();
        let selector = Selector::parse(selector)?;
        let delegate: Weak<dyn SelectorObserverDelegate> = delegate;
        let options = ElementObserver::merged_options(
            &MutationObserverInit::new().attribute_filter(selector.attribute_dependencies()),
        );
        options.validate()?;

        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| Inner {
            element_observer: ElementObserver::from_validated(root, weak.clone(), options),
            selector,
            delegate,
        });
        Ok(Self { inner })
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

    pub fn selector(&self) -> &Selector {
        &self.inner.selector
    }

    pub fn elements(&self) -> Vec<Element> {
        self.inner.element_observer.elements()
    }
}

impl ElementObserverDelegate for Inner {
    fn matches_element(&self, element: Element) -> bool {
        self.selector.matches(element)
    }

    fn matching_elements(&self, root: Node) -> Vec<Element> {
        root.as_element()
            .filter(|element| self.selector.matches(*element))
            .into_iter()
            .chain(self.selector.query_all(root))
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

    // Tracked elements that still match stay tracked.
    fn observes_attribute_changes(&self) -> bool {
        true
    }
}
