#![doc = include_str!("../README.md")]

mod custom_element;
mod document;
mod error;
mod events;
mod html;
mod mutation_observer;
mod node;
mod runtime;
mod selector;
mod tree;

pub use custom_element::{AsAny, CustomElement, CustomElementDefinition};
pub use document::{document, Document};
pub use error::{DomError, Result};
pub use events::{
    add_event_listener, dispatch_event, remove_event_listener, window, Event, EventInit,
    EventPhase, EventTarget, ListenerGuard, ListenerId, ListenerOptions, Window,
};
pub use html::{fixture, parse_fragment};
pub use mutation_observer::{MutationObserver, MutationObserverInit, MutationRecord, ObserverId};
pub use node::{ClassList, Element, Node, NodeType};
pub use runtime::{queue_microtask, run_microtasks};
pub use selector::Selector;
pub use tree::{Attribute, NodeId};

/// Custom element registry functions, namespaced like `window.customElements`.
pub mod custom_elements {
    pub use crate::custom_element::{define, get, is_defined, upgraded, upgraded_as};
}
