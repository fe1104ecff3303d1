use std::rc::Rc;

use impulse_dom::{Element, Event, EventInit, EventTarget, ListenerGuard, ListenerOptions};
use serde_json::{json, Value};

use crate::error::Result;
use crate::lifecycle::{connected, Subscription};

/// How an emitted event's name is prefixed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Prefix {
    /// The emitting element's tag: `x-menu:open`.
    #[default]
    Identifier,
    None,
    Custom(String),
}

/// Options for [`emit`] and [`crate::Host::emit`].
///
/// Events bubble and are composed unless told otherwise. The detail defaults to an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitOptions {
    pub target: Option<EventTarget>,
    pub prefix: Prefix,
    pub detail: Value,
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            target: None,
            prefix: Prefix::Identifier,
            detail: json!({}),
            bubbles: true,
            cancelable: false,
            composed: true,
        }
    }
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch somewhere other than the emitting element.
    pub fn target(mut self, target: impl Into<EventTarget>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Prefix::Custom(prefix.into());
        self
    }

    pub fn no_prefix(mut self) -> Self {
        self.prefix = Prefix::None;
        self
    }

    pub fn detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn composed(mut self, composed: bool) -> Self {
        self.composed = composed;
        self
    }

    /// The full event name, given the emitting element's identifier if there is one.
    pub(crate) fn event_name(&self, name: &str, identifier: Option<&str>) -> String {
        let prefix = match &self.prefix {
            Prefix::Identifier => identifier,
            Prefix::None => None,
            Prefix::Custom(prefix) => Some(prefix.as_str()),
        };
        match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{name}"),
            _ => name.to_string(),
        }
    }

    pub(crate) fn event_init(&self) -> EventInit {
        EventInit::new()
            .bubbles(self.bubbles)
            .cancelable(self.cancelable)
            .composed(self.composed)
            .detail(self.detail.clone())
    }
}

/// Dispatch a custom event at `target` and return it.
///
/// Only a [`Prefix::Custom`] prefix applies here, there is no identifier to prefix with.
/// `options.target` is ignored in favor of `target`.
pub fn emit(target: impl Into<EventTarget>, name: &str, options: EmitOptions) -> Event {
    let event = Event::new(options.event_name(name, None), options.event_init());
    target.into().dispatch_event(&event);
    event
}

/// Listen for `event_type` on every element matching `selector`, now and later.
///
/// Listeners are attached when an element starts matching and removed when it stops. The
/// callback receives the event and the element the listener sits on.
///
/// ```rust, ignore
/// let _subscription = impulse::on("click", "button.close", ListenerOptions::new(), |_event, button| {
///     button.closest("dialog").ok().flatten().map(|dialog| dialog.remove_attribute("open"));
/// })?;
/// ```
pub fn on(
    event_type: &str,
    selector: &str,
    options: ListenerOptions,
    callback: impl Fn(&Event, Element) + 'static,
) -> Result<Subscription> {
    let callback = Rc::new(callback);
    let event_type = event_type.to_string();
    connected(selector, move |element: Element| {
        let callback = Rc::clone(&callback);
        let guard = ListenerGuard::new(element.add_event_listener(
            &event_type,
            options,
            move |event| callback(event, element),
        ));
        move || guard.remove()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn event_names() {
        let options = EmitOptions::new();
        assert_eq!(options.event_name("open", Some("x-menu")), "x-menu:open");
        assert_eq!(options.event_name("open", None), "open");
        assert_eq!(options.clone().no_prefix().event_name("open", Some("x-menu")), "open");
        assert_eq!(
            options.clone().prefix("menu").event_name("open", Some("x-menu")),
            "menu:open"
        );
        assert_eq!(options.prefix("").event_name("open", Some("x-menu")), "open");
    }

    #[test]
    fn defaults() {
        let init = EmitOptions::new().event_init();
        assert!(init.bubbles);
        assert!(init.composed);
        assert!(!init.cancelable);
        assert_eq!(init.detail, json!({}));
    }
}
