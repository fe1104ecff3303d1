use impulse_dom::DomError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Dom(#[from] DomError),

    /// Two declarations of one element share a key.
    #[error("<{tag}> declares '{key}' more than once")]
    DuplicateKey { tag: String, key: String },

    /// A declared key cannot be turned into an attribute name.
    #[error("'{0}' is not a valid property, target or method name")]
    InvalidIdentifier(String),

    /// The tag already belongs to another element type.
    #[error("a custom element named '{0}' is already defined")]
    AlreadyDefined(String),

    #[error("<{tag}> declares no property named '{key}'")]
    UnknownKey { tag: String, key: String },

    #[error("failed to serialize a property value: {0}")]
    Serialize(String),
}
