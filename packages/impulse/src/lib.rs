#![doc = include_str!("../README.md")]

mod action;
mod action_descriptor;
mod definition;
mod element;
mod error;
mod events;
pub mod helpers;
mod lazy_import;
mod lifecycle;
mod property;
mod registry;
mod scope;
mod set_map;
mod target;

pub use action_descriptor::{ActionDescriptor, GlobalTarget, Modifier};
pub use definition::{Definition, PropertyDefinition, TargetDefinition};
pub use element::{Host, ImpulseElement};
pub use error::{Error, Result};
pub use events::{emit, on, EmitOptions, Prefix};
pub use lazy_import::lazy_import;
pub use lifecycle::{connected, disconnected, IntoTeardown, Subscription};
pub use property::{PropertyAccessor, PropertyType, PropertyValue};
pub use registry::{definition_of, is_registered, register};
pub use scope::Scope;
pub use set_map::SetMap;

pub use impulse_dom as dom;
