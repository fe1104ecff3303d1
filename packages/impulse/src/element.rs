use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use impulse_dom::{custom_elements, CustomElement, Element, Event};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::action::Actions;
use crate::definition::Definition;
use crate::error::{Error, Result};
use crate::events::EmitOptions;
use crate::property::{Properties, PropertyAccessor, PropertyValue};
use crate::registry::definition_of;
use crate::scope::Scope;
use crate::target::Targets;

/// The behavior behind a registered tag.
///
/// One value is created per upgraded element. Properties, targets and actions are wired up before
/// [`ImpulseElement::connected`] runs and torn down after [`ImpulseElement::disconnected`].
pub trait ImpulseElement: Sized + 'static {
    fn create(host: Host<Self>) -> Self;

    fn connected(&self) {}

    fn disconnected(&self) {}
}

/// A typed handle to an upgraded element.
pub struct Host<E> {
    element: Element,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for Host<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Host<E> {}

impl<E> PartialEq for Host<E> {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
    }
}

impl<E> Eq for Host<E> {}

impl<E> fmt::Debug for Host<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Host").field(&self.element).finish()
    }
}

impl<E: ImpulseElement> Host<E> {
    pub(crate) fn new(element: Element) -> Self {
        Self {
            element,
            _marker: PhantomData,
        }
    }

    /// The host of `element`, if it was upgraded as an `E`.
    pub fn from_element(element: Element) -> Option<Self> {
        custom_elements::upgraded_as::<Instance<E>>(element).map(|_| Self::new(element))
    }

    pub(crate) fn instance(&self) -> Option<Rc<Instance<E>>> {
        custom_elements::upgraded_as::<Instance<E>>(self.element)
    }

    pub fn element(&self) -> Element {
        self.element
    }

    /// The element's tag, used in target and action descriptors.
    pub fn identifier(&self) -> String {
        self.element.local_name()
    }

    pub fn scope(&self) -> Scope {
        Scope::new(self.element)
    }

    /// Whether the element is connected and its bindings are running.
    pub fn is_started(&self) -> bool {
        self.instance()
            .is_some_and(|instance| instance.started.get())
    }

    /// Borrow the element's value.
    ///
    /// Returns `None` while the value is still being created.
    pub fn with<R>(&self, f: impl FnOnce(&E) -> R) -> Option<R> {
        self.instance().map(|instance| f(&instance.value))
    }

    pub fn definition(&self) -> Option<Rc<Definition<E>>> {
        definition_of::<E>()
    }

    pub fn property(&self, key: &str) -> Option<PropertyAccessor> {
        let definition = self.definition()?;
        let property = definition.find_property(key)?;
        Some(PropertyAccessor::new(self.element, property))
    }

    /// The current value of a declared property.
    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        self.property(key).map(|property| property.get())
    }

    pub fn set(&self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        self.accessor(key)?.set(value)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.accessor(key)?.remove();
        Ok(())
    }

    /// Read a property into any deserializable type.
    pub fn deserialize<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        serde_json::from_value(value.to_json()).ok()
    }

    /// Write any serializable value to a property.
    pub fn set_serialized<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let accessor = self.accessor(key)?;
        let value = serde_json::to_value(value).map_err(|err| Error::Serialize(err.to_string()))?;
        accessor.set(value)
    }

    fn accessor(&self, key: &str) -> Result<PropertyAccessor> {
        self.property(key).ok_or_else(|| Error::UnknownKey {
            tag: self.identifier(),
            key: key.to_string(),
        })
    }

    /// The resolved single target for `key`.
    pub fn target(&self, key: &str) -> Option<Element> {
        self.instance()?.targets.first(key)
    }

    /// Every resolved target for `key`, in document order.
    pub fn targets(&self, key: &str) -> Vec<Element> {
        self.instance()
            .map(|instance| instance.targets.all(key))
            .unwrap_or_default()
    }

    /// Dispatch a custom event named `identifier:name` unless `options` say otherwise.
    pub fn emit(&self, name: &str, options: EmitOptions) -> Event {
        let identifier = self.identifier();
        let event = Event::new(
            options.event_name(name, Some(&identifier)),
            options.event_init(),
        );
        options
            .target
            .unwrap_or_else(|| self.element.into())
            .dispatch_event(&event);
        event
    }

    pub(crate) fn invoke(&self, method_name: &str, event: &Event) {
        let Some(instance) = self.instance() else {
            return;
        };
        match instance.definition.find_method(method_name) {
            Some(method) => {
                let method = Rc::clone(method);
                method(&instance.value, event);
            }
            None => tracing::warn!(
                "<{}> has no method named '{method_name}'",
                self.identifier()
            ),
        }
    }
}

/// What the custom element registry stores for an upgraded element.
pub(crate) struct Instance<E: ImpulseElement> {
    host: Host<E>,
    definition: Rc<Definition<E>>,
    value: E,
    started: Cell<bool>,
    properties: Properties<E>,
    targets: Targets<E>,
    actions: Actions<E>,
}

impl<E: ImpulseElement> Instance<E> {
    pub(crate) fn new(element: Element, definition: Rc<Definition<E>>) -> Self {
        let host = Host::new(element);
        Self {
            properties: Properties::new(element, Rc::clone(&definition)),
            targets: Targets::new(host, Rc::clone(&definition)),
            actions: Actions::new(host, Rc::clone(&definition)),
            value: E::create(host),
            started: Cell::new(false),
            host,
            definition,
        }
    }
}

impl<E: ImpulseElement> CustomElement for Instance<E> {
    fn connected(&self) {
        if self.started.get() {
            return;
        }
        self.properties.start();
        self.targets.start();
        self.actions.start();
        self.started.set(true);

        if let Err(err) = self.host.element().set_attribute("data-impulse-element", "") {
            tracing::error!("failed to mark <{}> as started: {err}", self.definition.tag());
        }
        tracing::trace!("<{}> connected", self.definition.tag());
        self.value.connected();
    }

    fn disconnected(&self) {
        if !self.started.get() {
            return;
        }
        self.value.disconnected();
        self.actions.stop();
        self.targets.stop();
        self.properties.stop();
        self.started.set(false);
        tracing::trace!("<{}> disconnected", self.definition.tag());
    }

    fn attribute_changed(&self, name: &str, old_value: Option<&str>, new_value: Option<&str>) {
        if self.properties.take_suppressed(name) {
            return;
        }
        if !self.started.get() || old_value == new_value {
            return;
        }
        let Some(property) = self.definition.property_for_attribute(name) else {
            tracing::warn!(
                "<{}> observed '{name}' but declares no property for it",
                self.definition.tag()
            );
            return;
        };

        let new_value = property.ty().read(new_value);
        let old_value = property.ty().read(old_value);
        if new_value == old_value {
            return;
        }
        if let Some(hook) = property.change_hook() {
            let hook = Rc::clone(hook);
            hook(&self.value, &new_value, &old_value);
        }
    }
}
