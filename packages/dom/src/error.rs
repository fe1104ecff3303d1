use thiserror::Error;

/// Result type for fallible DOM operations.
pub type Result<T, E = DomError> = std::result::Result<T, E>;

/// The exceptions the host DOM can raise.
///
/// These map onto the `DOMException` names a browser would throw for the same misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The selector could not be parsed (`SyntaxError`).
    #[error("'{selector}' is not a valid selector: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A tag or attribute name contains characters that are not allowed (`InvalidCharacterError`).
    #[error("'{0}' is not a valid name")]
    InvalidCharacter(String),

    /// The insertion would create a cycle or put a node somewhere it cannot live (`HierarchyRequestError`).
    #[error("failed to insert node: {0}")]
    HierarchyRequest(&'static str),

    /// The node is not where the caller said it would be (`NotFoundError`).
    #[error("the node to be removed is not a child of this node")]
    NotFound,

    /// `MutationObserver::observe` was called with an options combination that observes nothing
    /// or contradicts itself (`TypeError`).
    #[error("invalid mutation observer options: {0}")]
    InvalidObserverOptions(&'static str),

    /// The operation is not supported in the current state (`NotSupportedError`).
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// An HTML fragment could not be parsed.
    #[error("failed to parse html: {0}")]
    Parse(String),
}

impl From<html_parser::Error> for DomError {
    fn from(e: html_parser::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
