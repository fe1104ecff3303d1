//! Properties reflected to attributes.
//!
//! A property has no storage of its own: reading it parses the attribute, writing it serializes
//! the value back. How a value maps to an attribute depends on its [`PropertyType`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use impulse_dom::Element;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::definition::{Definition, PropertyDefinition};
use crate::error::Result;
use crate::helpers::parse_json;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PropertyType {
    #[default]
    String,
    Boolean,
    Number,
    Array,
    Object,
}

impl PropertyType {
    /// The value a property of this type holds when nothing else was declared.
    pub fn default_value(self) -> PropertyValue {
        match self {
            PropertyType::String => PropertyValue::String(String::new()),
            PropertyType::Boolean => PropertyValue::Boolean(false),
            PropertyType::Number => PropertyValue::Number(0.0),
            PropertyType::Array => PropertyValue::Array(Vec::new()),
            PropertyType::Object => PropertyValue::Object(Map::new()),
        }
    }

    /// Interpret a raw attribute value.
    ///
    /// ```rust
    /// use impulse::{PropertyType, PropertyValue};
    ///
    /// assert_eq!(PropertyType::Boolean.read(Some("")), PropertyValue::Boolean(true));
    /// assert_eq!(PropertyType::Boolean.read(Some("false")), PropertyValue::Boolean(false));
    /// assert_eq!(PropertyType::Number.read(Some("1_000")), PropertyValue::Number(1000.0));
    /// assert_eq!(PropertyType::Number.read(Some("lots")), PropertyValue::Number(0.0));
    /// ```
    pub fn read(self, raw: Option<&str>) -> PropertyValue {
        match self {
            PropertyType::String => PropertyValue::String(raw.unwrap_or_default().to_string()),
            PropertyType::Boolean => PropertyValue::Boolean(raw.is_some_and(|raw| raw != "false")),
            PropertyType::Number => PropertyValue::Number(raw.map(parse_number).unwrap_or(0.0)),
            PropertyType::Array => PropertyValue::Array(parse_json(raw, Vec::new())),
            PropertyType::Object => PropertyValue::Object(parse_json(raw, Map::new())),
        }
    }
}

/// Digits may be grouped with underscores. Anything unparsable is zero.
fn parse_number(raw: &str) -> f64 {
    let cleaned = raw.replace('_', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .unwrap_or(0.0)
}

fn format_number(number: f64) -> String {
    if number == 0.0 {
        // Avoids "-0".
        return "0".to_string();
    }
    number.to_string()
}

/// The value of a property, as read from or written to its attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            PropertyValue::Array(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            PropertyValue::Object(value) => Some(value),
            _ => None,
        }
    }

    /// Empty strings, `false`, zero and NaN are falsy. Collections are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            PropertyValue::Boolean(value) => *value,
            PropertyValue::Number(value) => *value != 0.0 && !value.is_nan(),
            PropertyValue::String(value) => !value.is_empty(),
            PropertyValue::Array(_) | PropertyValue::Object(_) => true,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Boolean(value) => Value::Bool(*value),
            PropertyValue::Number(value) => {
                serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number)
            }
            PropertyValue::String(value) => Value::String(value.clone()),
            PropertyValue::Array(value) => Value::Array(value.clone()),
            PropertyValue::Object(value) => Value::Object(value.clone()),
        }
    }

    /// The attribute text a string property stores for this value.
    fn to_attribute_text(&self) -> String {
        match self {
            PropertyValue::String(value) => value.clone(),
            PropertyValue::Number(value) => format_number(*value),
            PropertyValue::Boolean(value) => value.to_string(),
            PropertyValue::Array(_) | PropertyValue::Object(_) => self.to_json().to_string(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_attribute_text())
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Number(value.into())
    }
}

impl From<Vec<Value>> for PropertyValue {
    fn from(value: Vec<Value>) -> Self {
        PropertyValue::Array(value)
    }
}

impl From<Map<String, Value>> for PropertyValue {
    fn from(value: Map<String, Value>) -> Self {
        PropertyValue::Object(value)
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(value) => PropertyValue::Boolean(value),
            Value::Number(value) => PropertyValue::Number(value.as_f64().unwrap_or(0.0)),
            Value::String(value) => PropertyValue::String(value),
            Value::Array(value) => PropertyValue::Array(value),
            Value::Object(value) => PropertyValue::Object(value),
            Value::Null => PropertyValue::String(String::new()),
        }
    }
}

/// Reads and writes one property of one element.
#[derive(Debug, Clone)]
pub struct PropertyAccessor {
    element: Element,
    key: String,
    attribute: String,
    ty: PropertyType,
}

impl PropertyAccessor {
    pub(crate) fn new<E>(element: Element, property: &PropertyDefinition<E>) -> Self {
        Self {
            element,
            key: property.key().to_string(),
            attribute: property.attribute().to_string(),
            ty: property.ty(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn ty(&self) -> PropertyType {
        self.ty
    }

    pub fn get(&self) -> PropertyValue {
        self.ty
            .read(self.element.get_attribute(&self.attribute).as_deref())
    }

    /// Write `value` to the attribute.
    ///
    /// Booleans toggle the attribute. Numbers that are not numbers remove it. Arrays and objects
    /// are stored as compact JSON.
    pub fn set(&self, value: impl Into<PropertyValue>) -> Result<()> {
        let value = value.into();
        match self.ty {
            PropertyType::String => {
                self.element
                    .set_attribute(&self.attribute, &value.to_attribute_text())?;
            }
            PropertyType::Boolean => {
                self.element
                    .toggle_attribute(&self.attribute, Some(value.is_truthy()))?;
            }
            PropertyType::Number => match value {
                PropertyValue::Number(number) if number.is_finite() => {
                    self.element
                        .set_attribute(&self.attribute, &format_number(number))?;
                }
                _ => self.element.remove_attribute(&self.attribute),
            },
            PropertyType::Array | PropertyType::Object => {
                self.element
                    .set_attribute(&self.attribute, &value.to_json().to_string())?;
            }
        }
        Ok(())
    }

    pub fn remove(&self) {
        self.element.remove_attribute(&self.attribute);
    }
}

/// Writes declared defaults when the host starts.
///
/// Attributes written here must not reach change hooks, so their names are remembered until the
/// matching attribute reaction arrives.
pub(crate) struct Properties<E> {
    element: Element,
    definition: Rc<Definition<E>>,
    suppressed: RefCell<Vec<String>>,
}

impl<E> Properties<E> {
    pub(crate) fn new(element: Element, definition: Rc<Definition<E>>) -> Self {
        Self {
            element,
            definition,
            suppressed: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn start(&self) {
        for property in self.definition.properties() {
            let attribute = property.attribute();
            if self.element.has_attribute(attribute) {
                continue;
            }

            let accessor = PropertyAccessor::new(self.element, property);
            if let Err(err) = accessor.set(property.initial_value()) {
                tracing::error!("failed to write the default of '{}': {err}", property.key());
                continue;
            }
            // Falsy booleans and non numbers leave the attribute absent, so no reaction follows.
            if self.element.has_attribute(attribute) {
                self.suppressed.borrow_mut().push(attribute.to_string());
            }
        }
    }

    pub(crate) fn stop(&self) {
        self.suppressed.borrow_mut().clear();
    }

    /// Whether the reaction for `attribute` was caused by writing a default.
    pub(crate) fn take_suppressed(&self, attribute: &str) -> bool {
        let mut suppressed = self.suppressed.borrow_mut();
        match suppressed.iter().position(|name| name == attribute) {
            Some(index) => {
                suppressed.remove(index);
                true
            }
            None => false,
        }
    }
}
