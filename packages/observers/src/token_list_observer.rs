use std::cell::RefCell;
use std::rc::{Rc, Weak};

use impulse_dom::{Element, Node};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::attribute_observer::{AttributeObserver, AttributeObserverDelegate};

/// One whitespace separated entry of an observed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub element: Element,
    pub attribute_name: String,
    pub content: String,
}

/// The callbacks a [`TokenListObserver`] drives.
pub trait TokenListObserverDelegate {
    /// A token appeared: its element entered the observed set carrying it, or an edit to the
    /// attribute added it.
    fn token_matched(&self, token: &Token) {
        let _ = token;
    }

    /// A token went away: an edit dropped it, or its element left the observed set. Within one
    /// edit every unmatched token is reported before any matched one.
    fn token_unmatched(&self, token: &Token) {
        let _ = token;
    }
}

type Tokens = SmallVec<[Token; 4]>;

/// Reports the tokens of one attribute as they appear and disappear.
///
/// Each element's tokens are remembered between changes, so editing the attribute only reports the
/// tokens that were actually added or removed. Removals are always reported before additions.
pub struct TokenListObserver {
    inner: Rc<Inner>,
}

struct Inner {
    attribute_name: String,
    delegate: Weak<dyn TokenListObserverDelegate>,
    tokens: RefCell<FxHashMap<Element, Tokens>>,
    attribute_observer: AttributeObserver,
}

impl TokenListObserver {
    pub fn new<D>(root: impl Into<Node>, attribute_name: &str, delegate: Weak<D>) -> Self
    where
        D: TokenListObserverDelegate + 'static,
    {
        let root = root.into();
        let attribute_name = attribute_name.to_ascii_lowercase();
        let delegate: Weak<dyn TokenListObserverDelegate> = delegate;
        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| Inner {
            attribute_observer: AttributeObserver::new(root, &attribute_name, weak.clone()),
            attribute_name,
            delegate,
            tokens: RefCell::new(FxHashMap::default()),
        });
        Self { inner }
    }

    pub fn start(&self) {
        self.inner.attribute_observer.start();
    }

    pub fn stop(&self) {
        self.inner.attribute_observer.stop();
    }

    pub fn is_started(&self) -> bool {
        self.inner.attribute_observer.is_started()
    }

    pub fn attribute_name(&self) -> &str {
        &self.inner.attribute_name
    }

    /// The tokens currently matched on `element`, in attribute order.
    pub fn tokens_for(&self, element: Element) -> Vec<Token> {
        self.inner
            .tokens
            .borrow()
            .get(&element)
            .map(|tokens| tokens.to_vec())
            .unwrap_or_default()
    }

    /// Unmatch every remembered token and forget them, element by element in document order.
    pub fn unmatch_all(&self) {
        for element in self.inner.attribute_observer.elements() {
            self.inner.forget(element);
        }
        let leftovers: Vec<Element> = self.inner.tokens.borrow().keys().copied().collect();
        for element in leftovers {
            self.inner.forget(element);
        }
    }
}

impl Inner {
    fn read_tokens(&self, element: Element) -> Tokens {
        let value = element.get_attribute(&self.attribute_name).unwrap_or_default();
        parse_tokens(&value, element, &self.attribute_name)
    }

    fn forget(&self, element: Element) {
        let removed = self.tokens.borrow_mut().remove(&element).unwrap_or_default();
        self.report_unmatched(&removed);
    }

    fn report_matched(&self, tokens: &[Token]) {
        let Some(delegate) = self.delegate.upgrade() else {
            return;
        };
        for token in tokens {
            tracing::trace!("token matched: {:?} on {:?}", token.content, token.element);
            delegate.token_matched(token);
        }
    }

    fn report_unmatched(&self, tokens: &[Token]) {
        let Some(delegate) = self.delegate.upgrade() else {
            return;
        };
        for token in tokens {
            tracing::trace!("token unmatched: {:?} on {:?}", token.content, token.element);
            delegate.token_unmatched(token);
        }
    }
}

impl AttributeObserverDelegate for Inner {
    fn element_connected(&self, element: Element) {
        let tokens = self.read_tokens(element);
        self.tokens.borrow_mut().insert(element, tokens.clone());
        self.report_matched(&tokens);
    }

    fn element_disconnected(&self, element: Element) {
        self.forget(element);
    }

    fn element_attribute_changed(&self, element: Element, _name: &str) {
        let current = self.read_tokens(element);
        let previous = self
            .tokens
            .borrow_mut()
            .insert(element, current.clone())
            .unwrap_or_default();

        let unmatched = difference(&previous, &current);
        let matched = difference(&current, &previous);

        self.report_unmatched(&unmatched);
        self.report_matched(&matched);
    }
}

/// The tokens of `tokens` whose content is not in `other`, in their original order.
fn difference(tokens: &Tokens, other: &Tokens) -> Tokens {
    let other: FxHashSet<&str> = other.iter().map(|token| token.content.as_str()).collect();
    tokens
        .iter()
        .filter(|token| !other.contains(token.content.as_str()))
        .cloned()
        .collect()
}

/// Split `value` on whitespace. Repeated contents keep their first position.
fn parse_tokens(value: &str, element: Element, attribute_name: &str) -> Tokens {
    let mut seen = FxHashSet::default();
    value
        .split_whitespace()
        .filter(|content| seen.insert(*content))
        .map(|content| Token {
            element,
            attribute_name: attribute_name.to_string(),
            content: content.to_string(),
        })
        .collect()
}
