//! Error types for flight control system operations.

use fc_core::FcError;
use fc_props::PropError;
use thiserror::Error;

/// Result type for flight control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised while building or running the FCS.
///
/// Everything except [`ControlError::Runtime`] is a configuration error and
/// aborts the load.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A test string did not split into `operand operator operand`.
    #[error("Conditional test is invalid: \"{text}\" has {tokens} elements in the test condition")]
    MalformedCondition { text: String, tokens: usize },

    /// Comparison operator token is not one of the six recognized forms.
    #[error("Comparison operator \"{token}\" does not exist")]
    UnknownComparator { token: String },

    /// Logic token is neither AND nor OR.
    #[error("Unrecognized logic token \"{token}\"")]
    UnknownLogic { token: String },

    /// A property name could not be resolved in the property store.
    #[error("Unresolved property reference: '{name}'")]
    UnresolvedProperty { name: String },

    /// A required configuration element is absent.
    #[error("Component '{component}': missing {what}")]
    MissingElement {
        component: String,
        what: &'static str,
    },

    /// Configuration is present but inconsistent.
    #[error("Component '{component}': {what}")]
    InvalidConfig { component: String, what: String },

    /// Declared component kind string is unknown.
    #[error("Unknown FCS component type: '{kind}'")]
    UnknownComponentKind { kind: String },

    /// Two components publish the same output property.
    #[error("Duplicate component name: '{name}'")]
    DuplicateComponent { name: String },

    /// Property store failure.
    #[error(transparent)]
    Property(#[from] PropError),

    /// Numeric failure while running a component.
    #[error("Component '{component}' failed: {what}")]
    Runtime { component: String, what: String },

    /// Non-finite numeric literal.
    #[error(transparent)]
    NonFinite(#[from] FcError),
}

impl ControlError {
    /// True for errors detected at load time.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Runtime { .. })
    }
}
