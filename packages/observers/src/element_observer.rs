use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use impulse_dom::{Element, MutationObserver, MutationObserverInit, MutationRecord, Node, Result};
use rustc_hash::FxHashSet;

/// The callbacks an [`ElementObserver`] drives.
///
/// The predicate and the extractor must be pure: they are called many times per batch.
pub trait ElementObserverDelegate {
    /// Whether `element` belongs in the tracked set.
    fn matches_element(&self, element: Element) -> bool {
        let _ = element;
        true
    }

    /// The matching elements in the subtree rooted at `root`: `root` first when it matches, then
    /// the matching descendants in document order.
    fn matching_elements(&self, root: Node) -> Vec<Element> {
        let _ = root;
        Vec::new()
    }

    fn element_connected(&self, element: Element) {
        let _ = element;
    }

    fn element_disconnected(&self, element: Element) {
        let _ = element;
    }

    /// Whether this delegate handles attribute changes on tracked elements.
    ///
    /// When `false`, any observed attribute change on a tracked element disconnects it.
    fn observes_attribute_changes(&self) -> bool {
        false
    }

    fn element_attribute_changed(&self, element: Element, name: &str) {
        let _ = (element, name);
    }
}

/// Tracks the elements under a root that satisfy the delegate's predicate.
///
/// Every element in the tracked set is connected below the root and matches. The observer
/// reports an element through [`ElementObserverDelegate::element_connected`] when it enters the
/// set and [`ElementObserverDelegate::element_disconnected`] when it leaves, never twice in a row.
pub struct ElementObserver {
    inner: Rc<Inner>,
}

struct Inner {
    root: Node,
    options: MutationObserverInit,
    delegate: Weak<dyn ElementObserverDelegate>,
    elements: RefCell<FxHashSet<Element>>,
    started: Cell<bool>,
    observer: MutationObserver,
}

impl ElementObserver {
    /// Create a stopped observer for `root`.
    ///
    /// `options` are merged into `child_list + subtree`. Fails when the merged options are not a
    /// valid [`MutationObserverInit`].
    pub fn new<D>(root: impl Into<Node>, delegate: Weak<D>, options: MutationObserverInit) -> Result<Self>
    where
        D: ElementObserverDelegate + 'static,
    {
        let options = Self::merged_options(&options);
        options.validate()?;
        Ok(Self::from_validated(root.into(), delegate, options))
    }

    pub(crate) fn merged_options(options: &MutationObserverInit) -> MutationObserverInit {
        MutationObserverInit::new().child_list().subtree().merge(options)
    }

    /// Build an observer from options that went through [`ElementObserver::merged_options`] and
    /// passed validation.
    pub(crate) fn from_validated(
        root: Node,
        delegate: Weak<dyn ElementObserverDelegate>,
        options: MutationObserverInit,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            Inner {
                root,
                options,
                delegate,
                elements: RefCell::new(FxHashSet::default()),
                started: Cell::new(false),
                observer: MutationObserver::new(move |records, _| {
                    if let Some(inner) = weak.upgrade() {
                        inner.process_mutations(records);
                    }
                }),
            }
        });
        Self { inner }
    }

    /// Start observing and connect every element that already matches. Does nothing when the
    /// observer is already started.
    pub fn start(&self) {
        let inner = &self.inner;
        if inner.started.replace(true) {
            return;
        }
        tracing::trace!("starting element observer on {:?}", inner.root);
        if let Err(err) = inner.observer.observe(inner.root, inner.options.clone()) {
            // The options were validated when the observer was created.
            tracing::error!("failed to observe {:?}: {err}", inner.root);
        }
        for element in inner.matching_elements(inner.root) {
            inner.add_element(element);
        }
    }

    /// Process the records that are still queued, then stop observing. Does nothing when the
    /// observer is not started.
    ///
    /// The tracked set is left as it is.
    pub fn stop(&self) {
        let inner = &self.inner;
        if !inner.started.get() {
            return;
        }
        let pending = inner.observer.take_records();
        inner.process_mutations(pending);
        inner.observer.disconnect();
        inner.started.set(false);
        tracing::trace!("stopped element observer on {:?}", inner.root);
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }

    pub fn root(&self) -> Node {
        self.inner.root
    }

    pub fn contains(&self, element: Element) -> bool {
        self.inner.elements.borrow().contains(&element)
    }

    /// The tracked elements in document order.
    pub fn elements(&self) -> Vec<Element> {
        let tracked = self.inner.elements.borrow();
        let root = self.inner.root;
        root.as_element()
            .into_iter()
            .chain(root.descendant_elements())
            .filter(|element| tracked.contains(element))
            .collect()
    }
}

impl Inner {
    fn process_mutations(&self, records: Vec<MutationRecord>) {
        if !self.started.get() {
            return;
        }
        for record in records {
            match record {
                MutationRecord::Attributes {
                    target,
                    attribute_name,
                    ..
                } => {
                    if let Some(element) = target.as_element() {
                        self.process_attribute_change(element, &attribute_name);
                    }
                }
                MutationRecord::ChildList {
                    added_nodes,
                    removed_nodes,
                    ..
                } => {
                    self.process_removed_nodes(&removed_nodes);
                    self.process_added_nodes(&added_nodes);
                }
            }
        }
    }

    fn process_attribute_change(&self, element: Element, name: &str) {
        let Some(delegate) = self.delegate.upgrade() else {
            return;
        };
        let tracked = self.elements.borrow().contains(&element);
        if tracked {
            if delegate.observes_attribute_changes() && delegate.matches_element(element) {
                tracing::trace!("attribute {name} changed on {element:?}");
                delegate.element_attribute_changed(element, name);
            } else {
                self.remove_element(element);
            }
        } else if delegate.matches_element(element) {
            self.add_element(element);
        }
    }

    /// Tracked elements inside a removed subtree leave the set whether or not they still match,
    /// since they can stop matching after the removal and before this record is processed.
    fn process_removed_nodes(&self, nodes: &[Node]) {
        for node in nodes.iter().filter(|node| node.as_element().is_some()) {
            let removed: Vec<Element> = {
                let tracked = self.elements.borrow();
                node.as_element()
                    .into_iter()
                    .chain(node.descendant_elements())
                    .filter(|element| tracked.contains(element))
                    .collect()
            };
            for element in removed {
                self.remove_element(element);
            }
        }

        // Elements moved out of a detached subtree before the checkpoint.
        let stale: Vec<Element> = self
            .elements
            .borrow()
            .iter()
            .copied()
            .filter(|element| !self.element_is_active(*element))
            .collect();
        for element in stale {
            self.remove_element(element);
        }
    }

    fn process_added_nodes(&self, nodes: &[Node]) {
        for node in nodes.iter().filter(|node| node.as_element().is_some()) {
            for element in self.matching_elements(*node) {
                self.add_element(element);
            }
        }
    }

    fn matching_elements(&self, root: Node) -> Vec<Element> {
        self.delegate
            .upgrade()
            .map(|delegate| delegate.matching_elements(root))
            .unwrap_or_default()
    }

    fn add_element(&self, element: Element) {
        if self.elements.borrow().contains(&element) || !self.element_is_active(element) {
            return;
        }
        self.elements.borrow_mut().insert(element);
        tracing::trace!("element connected: {element:?}");
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.element_connected(element);
        }
    }

    fn remove_element(&self, element: Element) {
        if !self.elements.borrow_mut().remove(&element) {
            return;
        }
        tracing::trace!("element disconnected: {element:?}");
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.element_disconnected(element);
        }
    }

    /// Elements are only tracked while they live in the same tree as the root and below it.
    fn element_is_active(&self, element: Element) -> bool {
        element.is_connected() == self.root.is_connected() && self.root.contains(element)
    }
}
