use std::cell::RefCell;
use std::rc::{Rc, Weak};

use impulse_dom::Element;
use impulse_observers::{Token, TokenListObserver, TokenListObserverDelegate};

use crate::definition::{Definition, TargetDefinition, TargetHook};
use crate::element::{Host, ImpulseElement};
use crate::scope::Scope;
use crate::set_map::SetMap;

const TARGET_ATTRIBUTE: &str = "data-target";

/// Resolves the host's declared targets from `data-target="identifier.key"` tokens.
///
/// A single target is the first scoped match in document order. When it goes away the next match
/// takes its place. Multiple targets keep every scoped match, also in document order.
pub(crate) struct Targets<E: ImpulseElement> {
    inner: Rc<Inner<E>>,
}

struct Inner<E: ImpulseElement> {
    this: Weak<Inner<E>>,
    host: Host<E>,
    definition: Rc<Definition<E>>,
    scope: Scope,
    resolved: RefCell<SetMap<String, Element>>,
    observer: RefCell<Option<TokenListObserver>>,
}

impl<E: ImpulseElement> Targets<E> {
    pub(crate) fn new(host: Host<E>, definition: Rc<Definition<E>>) -> Self {
        let inner = Rc::new_cyclic(|this| Inner {
            this: this.clone(),
            host,
            definition,
            scope: Scope::new(host.element()),
            resolved: RefCell::new(SetMap::new()),
            observer: RefCell::new(None),
        });
        Self { inner }
    }

    pub(crate) fn start(&self) {
        let observer = TokenListObserver::new(
            self.inner.host.element(),
            TARGET_ATTRIBUTE,
            self.inner.this.clone(),
        );
        observer.start();
        *self.inner.observer.borrow_mut() = Some(observer);
    }

    /// Flush pending changes, then disconnect every resolved target in declaration order.
    pub(crate) fn stop(&self) {
        let observer = self.inner.observer.borrow_mut().take();
        if let Some(observer) = observer {
            observer.stop();
        }

        for target in self.inner.definition.targets() {
            let elements = self.inner.resolved.borrow().get(&target.key().to_string()).to_vec();
            for element in elements {
                self.inner.fire(target.disconnected_hook(), element);
            }
        }
        self.inner.resolved.borrow_mut().clear();
    }

    pub(crate) fn first(&self, key: &str) -> Option<Element> {
        self.inner
            .resolved
            .borrow()
            .get(&key.to_string())
            .first()
            .copied()
    }

    pub(crate) fn all(&self, key: &str) -> Vec<Element> {
        self.inner.resolved.borrow().get(&key.to_string()).to_vec()
    }
}

impl<E: ImpulseElement> Inner<E> {
    /// The declared target a token refers to, if it belongs to this host.
    fn declared(&self, token: &Token) -> Option<&TargetDefinition<E>> {
        let (identifier, key) = token.content.rsplit_once('.')?;
        if identifier != self.scope.identifier() {
            return None;
        }
        let target = self.definition.find_target(key);
        if target.is_none() {
            tracing::debug!("<{identifier}> declares no target named '{key}'");
        }
        target
    }

    fn find(&self, key: &str) -> Vec<Element> {
        let selector = format!(
            r#"[{TARGET_ATTRIBUTE}~="{}.{key}"]"#,
            self.scope.identifier()
        );
        self.scope.find_targets(&selector).unwrap_or_else(|err| {
            tracing::warn!("failed to look up target '{key}': {err}");
            Vec::new()
        })
    }

    fn fire(&self, hook: Option<&TargetHook<E>>, element: Element) {
        if let Some(hook) = hook {
            let hook = Rc::clone(hook);
            self.host.with(|value| hook(value, element));
        }
    }

    fn connect(&self, target: &TargetDefinition<E>, element: Element) {
        let key = target.key().to_string();
        if self.resolved.borrow().has(&key, &element) {
            return;
        }
        let matches = self.find(&key);
        if !matches.contains(&element) {
            return;
        }

        if target.is_multiple() {
            {
                let mut resolved = self.resolved.borrow_mut();
                let previous = resolved.delete_key(&key);
                let mut ordered: Vec<Element> = matches
                    .iter()
                    .copied()
                    .filter(|candidate| *candidate == element || previous.contains(candidate))
                    .collect();
                ordered.extend(previous.into_iter().filter(|old| !matches.contains(old)));
                for resolved_element in ordered {
                    resolved.add(key.clone(), resolved_element);
                }
            }
            self.fire(target.connected_hook(), element);
            return;
        }

        if matches.first() != Some(&element) {
            return;
        }
        let previous = self.resolved.borrow().get(&key).first().copied();
        if let Some(previous) = previous {
            self.fire(target.disconnected_hook(), previous);
            self.resolved.borrow_mut().delete(&key, &previous);
        }
        self.resolved.borrow_mut().add(key, element);
        self.fire(target.connected_hook(), element);
    }

    fn disconnect(&self, target: &TargetDefinition<E>, element: Element) {
        let key = target.key().to_string();
        if !self.resolved.borrow().has(&key, &element) {
            return;
        }
        // The hook still sees the element through the host.
        self.fire(target.disconnected_hook(), element);
        self.resolved.borrow_mut().delete(&key, &element);

        if !target.is_multiple() {
            let next = self.find(&key).first().copied();
            if let Some(next) = next {
                self.resolved.borrow_mut().add(key, next);
                self.fire(target.connected_hook(), next);
            }
        }
    }
}

impl<E: ImpulseElement> TokenListObserverDelegate for Inner<E> {
    fn token_matched(&self, token: &Token) {
        if let Some(target) = self.declared(token) {
            self.connect(target, token.element);
        }
    }

    fn token_unmatched(&self, token: &Token) {
        if let Some(target) = self.declared(token) {
            self.disconnect(target, token.element);
        }
    }
}
