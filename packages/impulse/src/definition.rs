use std::fmt;
use std::rc::Rc;

use impulse_dom::{Element, Event};

use crate::error::{Error, Result};
use crate::helpers::{dasherize, is_valid_key};
use crate::property::{PropertyType, PropertyValue};

pub(crate) type ChangeHook<E> = Rc<dyn Fn(&E, &PropertyValue, &PropertyValue)>;
pub(crate) type TargetHook<E> = Rc<dyn Fn(&E, Element)>;
pub(crate) type Method<E> = Rc<dyn Fn(&E, &Event)>;

/// A property reflected to an attribute.
///
/// The attribute is the dasherized key: `recordCount` reads and writes `record-count`.
pub struct PropertyDefinition<E> {
    key: String,
    attribute: String,
    ty: PropertyType,
    default: Option<PropertyValue>,
    on_change: Option<ChangeHook<E>>,
}

impl<E> Clone for PropertyDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            attribute: self.attribute.clone(),
            ty: self.ty,
            default: self.default.clone(),
            on_change: self.on_change.clone(),
        }
    }
}

impl<E> fmt::Debug for PropertyDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("key", &self.key)
            .field("attribute", &self.attribute)
            .field("ty", &self.ty)
            .field("default", &self.default)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl<E> PropertyDefinition<E> {
    pub fn new(key: &str, ty: PropertyType) -> Self {
        Self {
            key: key.to_string(),
            attribute: dasherize(key),
            ty,
            default: None,
            on_change: None,
        }
    }

    pub fn string(key: &str) -> Self {
        Self::new(key, PropertyType::String)
    }

    pub fn boolean(key: &str) -> Self {
        Self::new(key, PropertyType::Boolean)
    }

    pub fn number(key: &str) -> Self {
        Self::new(key, PropertyType::Number)
    }

    pub fn array(key: &str) -> Self {
        Self::new(key, PropertyType::Array)
    }

    pub fn object(key: &str) -> Self {
        Self::new(key, PropertyType::Object)
    }

    /// The value written when the element connects without the attribute.
    pub fn default_value(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Called with `(new, old)` when the attribute changes after the element started.
    pub fn on_change(mut self, hook: impl Fn(&E, &PropertyValue, &PropertyValue) + 'static) -> Self {
        self.on_change = Some(Rc::new(hook));
        self
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

    /// The declared default, or the type's own default.
    pub fn initial_value(&self) -> PropertyValue {
        self.default
            .clone()
            .unwrap_or_else(|| self.ty.default_value())
    }

    pub(crate) fn change_hook(&self) -> Option<&ChangeHook<E>> {
        self.on_change.as_ref()
    }
}

/// A reference to descendants marked with `data-target="identifier.key"`.
pub struct TargetDefinition<E> {
    key: String,
    multiple: bool,
    connected: Option<TargetHook<E>>,
    disconnected: Option<TargetHook<E>>,
}

impl<E> Clone for TargetDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            multiple: self.multiple,
            connected: self.connected.clone(),
            disconnected: self.disconnected.clone(),
        }
    }
}

impl<E> fmt::Debug for TargetDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetDefinition")
            .field("key", &self.key)
            .field("multiple", &self.multiple)
            .finish_non_exhaustive()
    }
}

impl<E> TargetDefinition<E> {
    /// Resolves to the first scoped match.
    pub fn single(key: &str) -> Self {
        Self {
            key: key.to_string(),
            multiple: false,
            connected: None,
            disconnected: None,
        }
    }

    /// Resolves to every scoped match, in document order.
    pub fn multiple(key: &str) -> Self {
        Self {
            multiple: true,
            ..Self::single(key)
        }
    }

    pub fn on_connected(mut self, hook: impl Fn(&E, Element) + 'static) -> Self {
        self.connected = Some(Rc::new(hook));
        self
    }

    pub fn on_disconnected(mut self, hook: impl Fn(&E, Element) + 'static) -> Self {
        self.disconnected = Some(Rc::new(hook));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub(crate) fn connected_hook(&self) -> Option<&TargetHook<E>> {
        self.connected.as_ref()
    }

    pub(crate) fn disconnected_hook(&self) -> Option<&TargetHook<E>> {
        self.disconnected.as_ref()
    }
}

/// Everything an element type declares: its tag, properties, targets and action methods.
///
/// ```rust, ignore
/// let definition = Definition::<Disclosure>::new("x-disclosure")
///     .property(PropertyDefinition::boolean("open").on_change(|el, open, _| el.render(open)))
///     .target(TargetDefinition::single("panel"))
///     .method("toggle", |el, _event| el.toggle());
/// impulse::register(definition)?;
/// ```
pub struct Definition<E> {
    tag: String,
    properties: Vec<PropertyDefinition<E>>,
    targets: Vec<TargetDefinition<E>>,
    methods: Vec<(String, Method<E>)>,
}

impl<E> Clone for Definition<E> {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            properties: self.properties.clone(),
            targets: self.targets.clone(),
            methods: self.methods.clone(),
        }
    }
}

impl<E> fmt::Debug for Definition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("tag", &self.tag)
            .field("properties", &self.properties)
            .field("targets", &self.targets)
            .field(
                "methods",
                &self.methods.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<E> Definition<E> {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            properties: Vec::new(),
            targets: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn property(mut self, property: PropertyDefinition<E>) -> Self {
        self.properties.push(property);
        self
    }

    pub fn target(mut self, target: TargetDefinition<E>) -> Self {
        self.targets.push(target);
        self
    }

    /// A method `data-action` descriptors can call.
    pub fn method(mut self, name: &str, method: impl Fn(&E, &Event) + 'static) -> Self {
        self.methods.push((name.to_string(), Rc::new(method)));
        self
    }

    /// Inherit the declarations of `parent` this definition does not override.
    ///
    /// Inherited declarations come first, like fields of a base class.
    pub fn extend(mut self, parent: &Definition<E>) -> Self {
        let mut properties: Vec<_> = parent
            .properties
            .iter()
            .filter(|p| self.find_property(&p.key).is_none())
            .cloned()
            .collect();
        let mut targets: Vec<_> = parent
            .targets
            .iter()
            .filter(|t| self.find_target(&t.key).is_none())
            .cloned()
            .collect();
        let mut methods: Vec<_> = parent
            .methods
            .iter()
            .filter(|(name, _)| self.find_method(name).is_none())
            .cloned()
            .collect();

        properties.append(&mut self.properties);
        targets.append(&mut self.targets);
        methods.append(&mut self.methods);
        self.properties = properties;
        self.targets = targets;
        self.methods = methods;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn properties(&self) -> &[PropertyDefinition<E>] {
        &self.properties
    }

    pub fn targets(&self) -> &[TargetDefinition<E>] {
        &self.targets
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(name, _)| name.as_str())
    }

    /// The attributes the element reacts to: one per declared property.
    pub fn observed_attributes(&self) -> Vec<String> {
        self.properties
            .iter()
            .map(|property| property.attribute.clone())
            .collect()
    }

    pub fn find_property(&self, key: &str) -> Option<&PropertyDefinition<E>> {
        self.properties.iter().find(|property| property.key == key)
    }

    pub fn property_for_attribute(&self, attribute: &str) -> Option<&PropertyDefinition<E>> {
        self.properties
            .iter()
            .find(|property| property.attribute == attribute)
    }

    pub fn find_target(&self, key: &str) -> Option<&TargetDefinition<E>> {
        self.targets.iter().find(|target| target.key == key)
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<&Method<E>> {
        self.methods
            .iter()
            .find(|(own, _)| own == name)
            .map(|(_, method)| method)
    }

    /// Keys must be identifiers and unique across properties and targets. Method names must be
    /// unique among methods.
    pub(crate) fn validate(&self) -> Result<()> {
        let mut seen: Vec<&str> = Vec::new();
        let fields = self
            .properties
            .iter()
            .map(|p| p.key.as_str())
            .chain(self.targets.iter().map(|t| t.key.as_str()));
        for key in fields {
            if !is_valid_key(key) {
                return Err(Error::InvalidIdentifier(key.to_string()));
            }
            if seen.contains(&key) {
                return Err(self.duplicate(key));
            }
            seen.push(key);
        }

        let mut seen: Vec<&str> = Vec::new();
        for (name, _) in &self.methods {
            if !is_valid_key(name) {
                return Err(Error::InvalidIdentifier(name.clone()));
            }
            if seen.contains(&name.as_str()) {
                return Err(self.duplicate(name));
            }
            seen.push(name);
        }
        Ok(())
    }

    fn duplicate(&self, key: &str) -> Error {
        Error::DuplicateKey {
            tag: self.tag.clone(),
            key: key.to_string(),
        }
    }
}
