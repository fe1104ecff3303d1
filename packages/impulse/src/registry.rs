use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use impulse_dom::{custom_elements, CustomElementDefinition, Element};
use rustc_hash::FxHashMap;

use crate::definition::Definition;
use crate::element::{ImpulseElement, Instance};
use crate::error::{Error, Result};

thread_local! {
    static DEFINITIONS: RefCell<FxHashMap<TypeId, Rc<dyn Any>>> = RefCell::new(FxHashMap::default());
}

/// Define `definition`'s tag as a custom element backed by `E`.
///
/// Elements already in the document upgrade right away. Registering the same type under the same
/// tag again does nothing. A tag owned by anything else, or a second tag for the same type, is an
/// [`Error::AlreadyDefined`].
pub fn register<E: ImpulseElement>(definition: Definition<E>) -> Result<()> {
    definition.validate()?;
    let tag = definition.tag().to_string();

    if let Some(existing) = definition_of::<E>() {
        if existing.tag() == tag {
            tracing::debug!("<{tag}> is already registered");
            return Ok(());
        }
        return Err(Error::AlreadyDefined(existing.tag().to_string()));
    }
    if custom_elements::is_defined(&tag) {
        return Err(Error::AlreadyDefined(tag));
    }

    let definition = Rc::new(definition);
    let observed = definition.observed_attributes();
    // Instances look their definition up while upgrading, so it goes in first.
    DEFINITIONS.with(|definitions| {
        let erased: Rc<dyn Any> = definition.clone();
        definitions.borrow_mut().insert(TypeId::of::<E>(), erased)
    });

    let constructor = {
        let definition = Rc::clone(&definition);
        move |element: Element| Instance::new(element, Rc::clone(&definition))
    };
    let element_definition = CustomElementDefinition::new(constructor).observed_attributes(observed);
    if let Err(err) = custom_elements::define(&tag, element_definition) {
        DEFINITIONS.with(|definitions| definitions.borrow_mut().remove(&TypeId::of::<E>()));
        return Err(err.into());
    }

    tracing::debug!(
        "registered <{tag}> with {} properties, {} targets and {} methods",
        definition.properties().len(),
        definition.targets().len(),
        definition.method_names().count()
    );
    Ok(())
}

/// The definition `E` was registered with.
pub fn definition_of<E: ImpulseElement>() -> Option<Rc<Definition<E>>> {
    let erased = DEFINITIONS.with(|definitions| definitions.borrow().get(&TypeId::of::<E>()).cloned())?;
    erased.downcast::<Definition<E>>().ok()
}

pub fn is_registered<E: ImpulseElement>() -> bool {
    DEFINITIONS.with(|definitions| definitions.borrow().contains_key(&TypeId::of::<E>()))
}
