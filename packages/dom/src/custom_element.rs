//! Custom element definitions and their reactions.
//!
//! Each custom element is registered with a tag name through [`define`]. Elements with that tag are
//! upgraded when they are created, when they first connect, or when the definition arrives while
//! they are already in the document. Once upgraded, the instance receives `connected`,
//! `disconnected` and `attribute_changed` callbacks.
//!
//! Callbacks never run in the middle of a tree operation. They are queued while the operation
//! runs and drained right after it, so a callback always sees a consistent tree.

use std::any::Any;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{DomError, Result};
use crate::node::{validate_name, Element};
use crate::runtime::{run_reactions, with_runtime, Runtime};
use crate::tree::NodeId;

/// Lets the registry hand back concrete instances.
pub trait AsAny: Any {
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// The behavior attached to an upgraded element.
pub trait CustomElement: AsAny {
    /// Called when the element becomes connected to the document.
    fn connected(&self) {}

    /// Called when the element is removed from the document.
    fn disconnected(&self) {}

    /// Called when one of the definition's observed attributes is set, changed or removed.
    fn attribute_changed(&self, name: &str, old_value: Option<&str>, new_value: Option<&str>) {
        let _ = (name, old_value, new_value);
    }
}

type Constructor = Rc<dyn Fn(Element) -> Rc<dyn CustomElement>>;

/// What [`define`] registers under a tag name.
#[derive(Clone)]
pub struct CustomElementDefinition {
    observed_attributes: Vec<String>,
    constructor: Constructor,
}

impl std::fmt::Debug for CustomElementDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomElementDefinition")
            .field("observed_attributes", &self.observed_attributes)
            .finish_non_exhaustive()
    }
}

impl CustomElementDefinition {
    pub fn new<T, F>(constructor: F) -> Self
    where
        T: CustomElement,
        F: Fn(Element) -> T + 'static,
    {
        Self {
            observed_attributes: Vec::new(),
            constructor: Rc::new(move |element| Rc::new(constructor(element)) as Rc<dyn CustomElement>),
        }
    }

    /// The attributes whose changes are reported through [`CustomElement::attribute_changed`].
    pub fn observed_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observed_attributes = names
            .into_iter()
            .map(|name| name.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn observed(&self) -> &[String] {
        &self.observed_attributes
    }
}

pub(crate) enum Reaction {
    Upgrade(Element),
    Connected(Element),
    Disconnected(Element),
    AttributeChanged {
        element: Element,
        name: String,
        old_value: Option<String>,
        new_value: Option<String>,
    },
}

#[derive(Default)]
pub(crate) struct CustomElementRegistry {
    definitions: FxHashMap<String, CustomElementDefinition>,
    instances: FxHashMap<NodeId, Rc<dyn CustomElement>>,
    /// The tag each instance was upgraded with.
    upgraded_as: FxHashMap<NodeId, String>,
}

/// Register a custom element under `name`.
///
/// The name must be a valid lowercase tag containing a `-`. Defining a name twice fails with
/// [`DomError::NotSupported`]. Elements with this tag that are already in the document are upgraded
/// in document order before this returns.
pub fn define(name: &str, definition: CustomElementDefinition) -> Result<()> {
    let valid = validate_name(name).is_ok()
        && name.contains('-')
        && !name.starts_with('-')
        && name.chars().all(|c| !c.is_ascii_uppercase());
    if !valid {
        return Err(DomError::InvalidCharacter(name.to_string()));
    }

    with_runtime(|rt| {
        let mut registry = rt.custom_elements.borrow_mut();
        if registry.definitions.contains_key(name) {
            return Err(DomError::NotSupported(format!(
                "a custom element named '{name}' is already defined"
            )));
        }
        registry.definitions.insert(name.to_string(), definition);
        Ok(())
    })?;
    tracing::debug!("defined custom element <{name}>");

    let candidates: Vec<Element> = with_runtime(|rt| {
        let tree = rt.tree.borrow();
        tree.descendants(tree.document())
            .into_iter()
            .filter(|id| tree.element(*id).is_some_and(|el| el.tag == name))
            .map(Element::from_id)
            .collect()
    });
    with_runtime(|rt| {
        for element in candidates {
            rt.enqueue_reaction(Reaction::Upgrade(element));
        }
    });
    run_reactions();
    Ok(())
}

/// The definition registered under `name`.
pub fn get(name: &str) -> Option<CustomElementDefinition> {
    with_runtime(|rt| rt.custom_elements.borrow().definitions.get(name).cloned())
}

pub fn is_defined(name: &str) -> bool {
    with_runtime(|rt| rt.custom_elements.borrow().definitions.contains_key(name))
}

/// The instance attached to `element`, if it has been upgraded.
pub fn upgraded(element: Element) -> Option<Rc<dyn CustomElement>> {
    with_runtime(|rt| rt.custom_elements.borrow().instances.get(&element.node_id()).cloned())
}

/// The instance attached to `element`, downcast to its concrete type.
pub fn upgraded_as<T: CustomElement>(element: Element) -> Option<Rc<T>> {
    upgraded(element)?.into_any_rc().downcast::<T>().ok()
}

pub(crate) fn enqueue_upgrade(rt: &Runtime, element: Element) {
    let defined = {
        let tag = rt.tree.borrow().element(element.node_id()).map(|el| el.tag.clone());
        tag.is_some_and(|tag| rt.custom_elements.borrow().definitions.contains_key(&tag))
    };
    if defined {
        rt.enqueue_reaction(Reaction::Upgrade(element));
    }
}

/// Queue reactions for the elements under `nodes` that just became connected.
pub(crate) fn enqueue_connected(rt: &Runtime, nodes: &[NodeId]) {
    let reactions: Vec<Reaction> = {
        let tree = rt.tree.borrow();
        let registry = rt.custom_elements.borrow();
        nodes
            .iter()
            .filter(|id| tree.is_connected(**id))
            .flat_map(|id| tree.inclusive_descendants(*id))
            .filter_map(|id| {
                let tag = &tree.element(id)?.tag;
                if registry.instances.contains_key(&id) {
                    Some(Reaction::Connected(Element::from_id(id)))
                } else if registry.definitions.contains_key(tag) {
                    Some(Reaction::Upgrade(Element::from_id(id)))
                } else {
                    None
                }
            })
            .collect()
    };
    for reaction in reactions {
        rt.enqueue_reaction(reaction);
    }
}

/// Queue `disconnected` for the upgraded elements under `nodes`, which just left the document.
pub(crate) fn enqueue_disconnected(rt: &Runtime, nodes: &[NodeId]) {
    let reactions: Vec<Reaction> = {
        let tree = rt.tree.borrow();
        let registry = rt.custom_elements.borrow();
        nodes
            .iter()
            .flat_map(|id| tree.inclusive_descendants(*id))
            .filter(|id| registry.instances.contains_key(id))
            .map(|id| Reaction::Disconnected(Element::from_id(id)))
            .collect()
    };
    for reaction in reactions {
        rt.enqueue_reaction(reaction);
    }
}

pub(crate) fn enqueue_attribute_changed(
    rt: &Runtime,
    element: Element,
    name: &str,
    old_value: Option<String>,
    new_value: Option<String>,
) {
    let observed = {
        let registry = rt.custom_elements.borrow();
        registry
            .upgraded_as
            .get(&element.node_id())
            .and_then(|tag| registry.definitions.get(tag))
            .is_some_and(|definition| definition.observed_attributes.iter().any(|n| n == name))
    };
    if observed {
        rt.enqueue_reaction(Reaction::AttributeChanged {
            element,
            name: name.to_string(),
            old_value,
            new_value,
        });
    }
}

pub(crate) fn invoke_reaction(reaction: Reaction) {
    match reaction {
        Reaction::Upgrade(element) => upgrade(element),
        Reaction::Connected(element) => {
            if let Some(instance) = upgraded(element) {
                instance.connected();
            }
        }
        Reaction::Disconnected(element) => {
            if let Some(instance) = upgraded(element) {
                instance.disconnected();
            }
        }
        Reaction::AttributeChanged {
            element,
            name,
            old_value,
            new_value,
        } => {
            if let Some(instance) = upgraded(element) {
                instance.attribute_changed(&name, old_value.as_deref(), new_value.as_deref());
            }
        }
    }
}

fn upgrade(element: Element) {
    let tag = element.local_name();
    let definition = with_runtime(|rt| {
        let registry = rt.custom_elements.borrow();
        if registry.instances.contains_key(&element.node_id()) {
            return None;
        }
        registry.definitions.get(&tag).cloned()
    });
    let Some(definition) = definition else {
        return;
    };

    tracing::debug!("upgrading {element:?}");
    let instance = (definition.constructor)(element);
    with_runtime(|rt| {
        let mut registry = rt.custom_elements.borrow_mut();
        registry.instances.insert(element.node_id(), instance.clone());
        registry.upgraded_as.insert(element.node_id(), tag);
    });

    for name in &definition.observed_attributes {
        if let Some(value) = element.get_attribute(name) {
            instance.attribute_changed(name, None, Some(&value));
        }
    }
    if element.is_connected() {
        instance.connected();
    }
}
