//! String and attribute helpers shared by the bindings.

use convert_case::{Case, Casing};
use impulse_dom::Element;
use serde::de::DeserializeOwned;

/// The lowerCamelCase form of `value`.
///
/// ```rust
/// use impulse::helpers::camelize;
///
/// assert_eq!(camelize("css-class-name"), "cssClassName");
/// assert_eq!(camelize("action_name"), "actionName");
/// assert_eq!(camelize("My Favorite Items"), "myFavoriteItems");
/// ```
pub fn camelize(value: &str) -> String {
    value.to_case(Case::Camel)
}

/// Replace underscores, spaces and camelCase humps with dashes.
///
/// ```rust
/// use impulse::helpers::dasherize;
///
/// assert_eq!(dasherize("innerHTML"), "inner-html");
/// assert_eq!(dasherize("recordCount"), "record-count");
/// ```
pub fn dasherize(value: &str) -> String {
    value.to_case(Case::Kebab)
}

/// Lower case words separated by underscores.
pub fn decamelize(value: &str) -> String {
    value.to_case(Case::Snake)
}

/// Parse `value` as JSON, falling back when it is absent, empty or malformed.
pub fn parse_json<T: DeserializeOwned>(value: Option<&str>, fallback: T) -> T {
    match value {
        Some(value) if !value.is_empty() => serde_json::from_str(value).unwrap_or(fallback),
        _ => fallback,
    }
}

/// The whitespace separated values of an attribute. Absent attributes have none.
pub fn attribute_values(element: Element, name: &str) -> Vec<String> {
    element
        .get_attribute(name)
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Declared keys become attribute names, so they must be plain identifiers.
pub(crate) fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
