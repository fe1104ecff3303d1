use std::cell::RefCell;
use std::rc::Rc;

use impulse_dom::{document, queue_microtask, Element};
use impulse_observers::{SelectorObserver, SelectorObserverDelegate};
use rustc_hash::FxHashMap;

use crate::error::Result;

thread_local! {
    static PENDING: RefCell<FxHashMap<String, Rc<Pending>>> = RefCell::new(FxHashMap::default());
}

struct Pending {
    observer: SelectorObserver,
    loader: Rc<Loader>,
}

struct Loader {
    selector: String,
    callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl SelectorObserverDelegate for Loader {
    fn element_connected(&self, _element: Element) {
        let callbacks = std::mem::take(&mut *self.callbacks.borrow_mut());
        if callbacks.is_empty() {
            return;
        }
        tracing::debug!("loading '{}' on first use", self.selector);

        // The observer goes away with the entry, after the callbacks ran.
        let pending = PENDING.with(|pending| pending.borrow_mut().remove(&self.selector));
        queue_microtask(move || {
            for callback in callbacks {
                callback();
            }
            drop(pending);
        });
    }
}

/// Run `callback` once, in a microtask, when an element matching `selector` first appears in the
/// document.
///
/// Callbacks registered for the same selector before it appears all run together. Registering
/// after that starts a new wait.
///
/// ```rust, ignore
/// impulse::lazy_import("x-chart", || {
///     impulse::register(chart_definition()).ok();
/// })?;
/// ```
pub fn lazy_import(selector: &str, callback: impl FnOnce() + 'static) -> Result<()> {
    let existing = PENDING.with(|pending| pending.borrow().get(selector).cloned());
    if let Some(existing) = existing {
        existing.loader.callbacks.borrow_mut().push(Box::new(callback));
        return Ok(());
    }

    let loader = Rc::new(Loader {
        selector: selector.to_string(),
        callbacks: RefCell::new(vec![Box::new(callback) as Box<dyn FnOnce()>]),
    });
    let observer =
        SelectorObserver::new(document().document_element(), selector, Rc::downgrade(&loader))?;
    let pending = Rc::new(Pending { observer, loader });
    PENDING.with(|entries| {
        entries
            .borrow_mut()
            .insert(selector.to_string(), Rc::clone(&pending))
    });
    pending.observer.start();
    Ok(())
}
