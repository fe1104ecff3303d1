use std::cell::RefCell;
use std::rc::{Rc, Weak};

use impulse_dom::{Element, Event, EventTarget, ListenerGuard};
use impulse_observers::{Token, TokenListObserver, TokenListObserverDelegate};
use rustc_hash::FxHashMap;

use crate::action_descriptor::{ActionDescriptor, Modifier};
use crate::definition::Definition;
use crate::element::{Host, ImpulseElement};
use crate::scope::Scope;

const ACTION_ATTRIBUTE: &str = "data-action";

/// Binds `data-action` tokens naming the host to listeners that call its methods.
///
/// Every token gets its own listener, so `click->x-a#one click->x-a#two` calls both methods.
pub(crate) struct Actions<E: ImpulseElement> {
    inner: Rc<Inner<E>>,
}

struct Inner<E: ImpulseElement> {
    this: Weak<Inner<E>>,
    host: Host<E>,
    definition: Rc<Definition<E>>,
    scope: Scope,
    listeners: RefCell<FxHashMap<(Element, String), ListenerGuard>>,
    observer: RefCell<Option<TokenListObserver>>,
}

impl<E: ImpulseElement> Actions<E> {
    pub(crate) fn new(host: Host<E>, definition: Rc<Definition<E>>) -> Self {
        let inner = Rc::new_cyclic(|this| Inner {
            this: this.clone(),
            host,
            definition,
            scope: Scope::new(host.element()),
            listeners: RefCell::new(FxHashMap::default()),
            observer: RefCell::new(None),
        });
        Self { inner }
    }

    pub(crate) fn start(&self) {
        let observer = TokenListObserver::new(
            self.inner.host.element(),
            ACTION_ATTRIBUTE,
            self.inner.this.clone(),
        );
        observer.start();
        *self.inner.observer.borrow_mut() = Some(observer);
    }

    /// Flush pending changes, then remove every listener.
    pub(crate) fn stop(&self) {
        let observer = self.inner.observer.borrow_mut().take();
        if let Some(observer) = observer {
            observer.stop();
            observer.unmatch_all();
        }
        let leftovers: Vec<ListenerGuard> = self
            .inner
            .listeners
            .borrow_mut()
            .drain()
            .map(|(_, guard)| guard)
            .collect();
        drop(leftovers);
    }
}

impl<E: ImpulseElement> Inner<E> {
    fn bind(&self, token: &Token) {
        let Some(descriptor) = ActionDescriptor::parse(&token.content) else {
            tracing::debug!("ignoring malformed action '{}'", token.content);
            return;
        };
        if descriptor.identifier != self.scope.identifier() || !self.scope.scoped_target(token.element)
        {
            return;
        }
        if self.definition.find_method(&descriptor.method_name).is_none() {
            tracing::warn!(
                "<{}> has no method named '{}' for action '{}'",
                descriptor.identifier,
                descriptor.method_name,
                token.content
            );
        }

        let element = token.element;
        let event_target = descriptor
            .event_target
            .map(|global| global.event_target())
            .unwrap_or_else(|| element.into());
        let event_name = descriptor.event_name.clone();
        let options = descriptor.options;
        let host = self.host;
        let id = event_target.add_event_listener(&event_name, options, move |event: &Event| {
            handle(host, &descriptor, element, event)
        });

        let replaced = self
            .listeners
            .borrow_mut()
            .insert((element, token.content.clone()), ListenerGuard::new(id));
        drop(replaced);
    }

    fn unbind(&self, token: &Token) {
        let removed = self
            .listeners
            .borrow_mut()
            .remove(&(token.element, token.content.clone()));
        drop(removed);
    }
}

fn handle<E: ImpulseElement>(
    host: Host<E>,
    descriptor: &ActionDescriptor,
    element: Element,
    event: &Event,
) {
    if descriptor.has_modifier(Modifier::SelfOnly)
        && event.target() != Some(EventTarget::from(element))
    {
        return;
    }
    if descriptor.has_modifier(Modifier::Prevent) {
        event.prevent_default();
    }
    if descriptor.has_modifier(Modifier::Stop) {
        event.stop_propagation();
    }
    host.invoke(&descriptor.method_name, event);
}

impl<E: ImpulseElement> TokenListObserverDelegate for Inner<E> {
    fn token_matched(&self, token: &Token) {
        self.bind(token);
    }

    fn token_unmatched(&self, token: &Token) {
        self.unbind(token);
    }
}
