#![doc = include_str!("../README.md")]

mod attribute_observer;
mod element_observer;
mod selector_observer;
mod token_list_observer;

pub use attribute_observer::{AttributeObserver, AttributeObserverDelegate};
pub use element_observer::{ElementObserver, ElementObserverDelegate};
pub use selector_observer::{SelectorObserver, SelectorObserverDelegate};
pub use token_list_observer::{Token, TokenListObserver, TokenListObserverDelegate};
