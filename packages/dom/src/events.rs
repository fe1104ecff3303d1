//! Event listeners and dispatch.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use slotmap::{new_key_type, SlotMap};

use crate::node::{Element, Node};
use crate::runtime::with_runtime;

new_key_type! {
    pub struct ListenerId;
}

/// Something events can be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Node(Node),
}

impl From<Node> for EventTarget {
    fn from(node: Node) -> Self {
        EventTarget::Node(node)
    }
}

impl From<Element> for EventTarget {
    fn from(element: Element) -> Self {
        EventTarget::Node(element.into())
    }
}

impl From<crate::document::Document> for EventTarget {
    fn from(document: crate::document::Document) -> Self {
        EventTarget::Node(document.into())
    }
}

impl From<Window> for EventTarget {
    fn from(_: Window) -> Self {
        EventTarget::Window
    }
}

impl EventTarget {
    pub fn as_node(&self) -> Option<Node> {
        match self {
            EventTarget::Node(node) => Some(*node),
            EventTarget::Window => None,
        }
    }

    pub fn as_element(&self) -> Option<Element> {
        self.as_node().and_then(|node| node.as_element())
    }

    pub fn add_event_listener(
        &self,
        event_type: &str,
        options: ListenerOptions,
        callback: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        add_event_listener(*self, event_type, options, callback)
    }

    /// Dispatch `event` with this as its target. Returns `false` if a listener cancelled it.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        dispatch_event(*self, event)
    }
}

/// The thread's window. Events that reach the document continue to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window;

pub fn window() -> Window {
    Window
}

impl Window {
    pub fn add_event_listener(
        &self,
        event_type: &str,
        options: ListenerOptions,
        callback: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        add_event_listener(EventTarget::Window, event_type, options, callback)
    }

    pub fn dispatch_event(&self, event: &Event) -> bool {
        dispatch_event(EventTarget::Window, event)
    }
}

impl Node {
    pub fn add_event_listener(
        &self,
        event_type: &str,
        options: ListenerOptions,
        callback: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        add_event_listener(EventTarget::Node(*self), event_type, options, callback)
    }

    pub fn dispatch_event(&self, event: &Event) -> bool {
        dispatch_event(EventTarget::Node(*self), event)
    }
}

impl Element {
    /// Dispatch a bubbling, cancelable `click` event at the element.
    pub fn click(&self) -> bool {
        let event = Event::new(
            "click",
            EventInit::new().bubbles(true).cancelable(true).composed(true),
        );
        self.dispatch_event(&event)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
}

impl ListenerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    pub detail: Value,
}

impl EventInit {
    pub fn new() -> Self {
        Self::default()
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

    pub fn detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// An event. Dispatch state lives in cells so listeners can share `&Event`.
#[derive(Debug)]
pub struct Event {
    event_type: String,
    init: EventInit,
    target: Cell<Option<EventTarget>>,
    current_target: Cell<Option<EventTarget>>,
    phase: Cell<EventPhase>,
    default_prevented: Cell<bool>,
    stop_propagation: Cell<bool>,
    stop_immediate_propagation: Cell<bool>,
    in_passive_listener: Cell<bool>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, init: EventInit) -> Self {
        Self {
            event_type: event_type.into(),
            init,
            target: Cell::new(None),
            current_target: Cell::new(None),
            phase: Cell::new(EventPhase::None),
            default_prevented: Cell::new(false),
            stop_propagation: Cell::new(false),
            stop_immediate_propagation: Cell::new(false),
            in_passive_listener: Cell::new(false),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.init.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.init.cancelable
    }

    pub fn composed(&self) -> bool {
        self.init.composed
    }

    pub fn detail(&self) -> &Value {
        &self.init.detail
    }

    pub fn target(&self) -> Option<EventTarget> {
        self.target.get()
    }

    pub fn current_target(&self) -> Option<EventTarget> {
        self.current_target.get()
    }

    pub fn event_phase(&self) -> EventPhase {
        self.phase.get()
    }

    /// Cancel the event. Ignored when the event is not cancelable or the listener is passive.
    pub fn prevent_default(&self) {
        if self.init.cancelable && !self.in_passive_listener.get() {
            self.default_prevented.set(true);
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.stop_propagation.set(true);
    }

    pub fn stop_immediate_propagation(&self) {
        self.stop_propagation.set(true);
        self.stop_immediate_propagation.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.stop_propagation.get()
    }
}

struct Listener {
    target: EventTarget,
    event_type: String,
    options: ListenerOptions,
    callback: Rc<dyn Fn(&Event)>,
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: SlotMap<ListenerId, Listener>,
    by_target: FxHashMap<EventTarget, Vec<ListenerId>>,
}

impl ListenerRegistry {
    fn remove(&mut self, id: ListenerId) -> bool {
        let Some(listener) = self.listeners.remove(id) else {
            return false;
        };
        if let Some(ids) = self.by_target.get_mut(&listener.target) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_target.remove(&listener.target);
            }
        }
        true
    }
}

pub fn add_event_listener(
    target: impl Into<EventTarget>,
    event_type: &str,
    options: ListenerOptions,
    callback: impl Fn(&Event) + 'static,
) -> ListenerId {
    let target = target.into();
    with_runtime(|rt| {
        let mut registry = rt.listeners.borrow_mut();
        let id = registry.listeners.insert(Listener {
            target,
            event_type: event_type.to_string(),
            options,
            callback: Rc::new(callback),
        });
        registry.by_target.entry(target).or_default().push(id);
        id
    })
}

/// Remove a listener. Returns `false` if it was already gone.
pub fn remove_event_listener(id: ListenerId) -> bool {
    crate::runtime::try_with_runtime(|rt| {
        rt.listeners
            .try_borrow_mut()
            .map(|mut registry| registry.remove(id))
            .unwrap_or(false)
    })
    .unwrap_or(false)
}

/// Dispatch `event` to `target` through the capture, target and bubble phases.
///
/// The path is the target's inclusive ancestors, plus the window when the target is connected.
/// Returns `false` if the event was cancelled.
pub fn dispatch_event(target: impl Into<EventTarget>, event: &Event) -> bool {
    let target = target.into();
    let path = event_path(target);

    event.target.set(Some(target));
    event.default_prevented.set(false);
    event.stop_propagation.set(false);
    event.stop_immediate_propagation.set(false);

    for current in path.iter().skip(1).rev() {
        event.phase.set(EventPhase::Capturing);
        invoke(*current, event, true);
    }

    event.phase.set(EventPhase::AtTarget);
    invoke(target, event, true);
    invoke(target, event, false);

    if event.init.bubbles {
        for current in path.iter().skip(1) {
            event.phase.set(EventPhase::Bubbling);
            invoke(*current, event, false);
        }
    }

    event.phase.set(EventPhase::None);
    event.current_target.set(None);
    !event.default_prevented.get()
}

fn event_path(target: EventTarget) -> Vec<EventTarget> {
    let EventTarget::Node(node) = target else {
        return vec![EventTarget::Window];
    };
    with_runtime(|rt| {
        let tree = rt.tree.borrow();
        let mut path: Vec<EventTarget> = tree
            .inclusive_ancestors(node.node_id())
            .map(|id| EventTarget::Node(Node::from_id(id)))
            .collect();
        if tree.is_connected(node.node_id()) {
            path.push(EventTarget::Window);
        }
        path
    })
}

/// Run the listeners on `current`. `capture` selects capture or non-capture listeners.
fn invoke(current: EventTarget, event: &Event, capture: bool) {
    if event.stop_propagation.get() {
        return;
    }
    event.current_target.set(Some(current));

    let ids: Vec<ListenerId> = with_runtime(|rt| {
        rt.listeners
            .borrow()
            .by_target
            .get(&current)
            .cloned()
            .unwrap_or_default()
    });

    for id in ids {
        let listener = with_runtime(|rt| {
            let mut registry = rt.listeners.borrow_mut();
            let listener = registry.listeners.get(id)?;
            if listener.event_type != event.event_type
                || listener.options.capture != capture
            {
                return None;
            }
            let found = (listener.callback.clone(), listener.options);
            if found.1.once {
                registry.remove(id);
            }
            Some(found)
        });
        let Some((callback, options)) = listener else {
            continue;
        };

        event.in_passive_listener.set(options.passive);
        callback(event);
        event.in_passive_listener.set(false);

        if event.stop_immediate_propagation.get() {
            break;
        }
    }
}

/// Removes a listener when dropped.
#[must_use = "dropping the guard removes the listener"]
pub struct ListenerGuard(RefCell<Option<ListenerId>>);

impl ListenerGuard {
    pub fn new(id: ListenerId) -> Self {
        Self(RefCell::new(Some(id)))
    }

    pub fn remove(&self) {
        if let Some(id) = self.0.borrow_mut().take() {
            remove_event_listener(id);
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.remove();
    }
}
