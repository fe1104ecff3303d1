//! Callbacks for elements entering and leaving the document.

use std::cell::RefCell;
use std::rc::Rc;

use impulse_dom::{document, Element};
use impulse_observers::{SelectorObserver, SelectorObserverDelegate};
use rustc_hash::FxHashMap;

use crate::error::Result;

/// What a [`connected`] callback may return: nothing, or a closure to run on disconnect.
pub trait IntoTeardown {
    fn into_teardown(self) -> Option<Box<dyn FnOnce()>>;
}

impl IntoTeardown for () {
    fn into_teardown(self) -> Option<Box<dyn FnOnce()>> {
        None
    }
}

impl<F: FnOnce() + 'static> IntoTeardown for F {
    fn into_teardown(self) -> Option<Box<dyn FnOnce()>> {
        Some(Box::new(self))
    }
}

/// Keeps a [`connected`], [`disconnected`] or [`crate::on`] callback alive.
///
/// Stopping runs the teardowns of every element still connected. Dropping stops.
#[must_use = "dropping the subscription stops it"]
pub struct Subscription {
    observer: SelectorObserver,
    delegate: Rc<dyn Teardowns>,
}

impl Subscription {
    pub fn stop(&self) {
        self.observer.stop();
        self.delegate.teardown_all();
    }

    pub fn is_active(&self) -> bool {
        self.observer.is_started()
    }

    /// The elements currently matching, in the order they connected.
    pub fn elements(&self) -> Vec<Element> {
        self.observer.elements()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

trait Teardowns {
    fn teardown_all(&self);
}

struct Connected<F> {
    callback: RefCell<F>,
    teardowns: RefCell<FxHashMap<Element, Box<dyn FnOnce()>>>,
}

impl<F, T> SelectorObserverDelegate for Connected<F>
where
    F: FnMut(Element) -> T,
    T: IntoTeardown,
{
    fn element_connected(&self, element: Element) {
        let teardown = {
            let mut callback = self.callback.borrow_mut();
            (&mut *callback)(element).into_teardown()
        };
        if let Some(teardown) = teardown {
            self.teardowns.borrow_mut().insert(element, teardown);
        }
    }

    fn element_disconnected(&self, element: Element) {
        let teardown = self.teardowns.borrow_mut().remove(&element);
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

impl<F> Teardowns for Connected<F> {
    fn teardown_all(&self) {
        let teardowns: Vec<_> = self.teardowns.borrow_mut().drain().collect();
        for (_, teardown) in teardowns {
            teardown();
        }
    }
}

struct Disconnected<F> {
    callback: RefCell<F>,
}

impl<F: FnMut(Element)> SelectorObserverDelegate for Disconnected<F> {
    fn element_disconnected(&self, element: Element) {
        let mut callback = self.callback.borrow_mut();
        (&mut *callback)(element);
    }
}

impl<F> Teardowns for Disconnected<F> {
    fn teardown_all(&self) {}
}

/// Call `callback` for every element in the document matching `selector`, now and whenever one
/// starts matching.
///
/// Elements already present are reported before this returns. A closure returned by the
/// callback runs when that element stops matching or the subscription stops.
pub fn connected<F, T>(selector: &str, callback: F) -> Result<Subscription>
where
    F: FnMut(Element) -> T + 'static,
    T: IntoTeardown + 'static,
{
    let delegate = Rc::new(Connected {
        callback: RefCell::new(callback),
        teardowns: RefCell::new(FxHashMap::default()),
    });
    let observer =
        SelectorObserver::new(document().document_element(), selector, Rc::downgrade(&delegate))?;
    tracing::trace!("observing connections of '{selector}'");
    observer.start();
    Ok(Subscription { observer, delegate })
}

/// Call `callback` whenever an element matching `selector` leaves the document or stops
/// matching.
pub fn disconnected<F>(selector: &str, callback: F) -> Result<Subscription>
where
    F: FnMut(Element) + 'static,
{
    let delegate = Rc::new(Disconnected {
        callback: RefCell::new(callback),
    });
    let observer =
        SelectorObserver::new(document().document_element(), selector, Rc::downgrade(&delegate))?;
    tracing::trace!("observing disconnections of '{selector}'");
    observer.start();
    Ok(Subscription { observer, delegate })
}
