//! Error types for property store operations.

use thiserror::Error;

/// Result type for property store operations.
pub type PropResult<T> = Result<T, PropError>;

/// Errors that can occur while resolving or writing properties.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropError {
    /// Path is empty, has empty segments, or contains whitespace.
    #[error("Invalid property path: '{path}'")]
    InvalidPath { path: String },

    /// No node exists at the path.
    #[error("Property not found: '{path}'")]
    NotFound { path: String },

    /// Write to a write-protected node under `WritePolicy::Error`.
    #[error("Property is read-only: '{path}'")]
    ReadOnly { path: String },

    /// Node is already bound to external storage.
    #[error("Property is already tied: '{path}'")]
    AlreadyTied { path: String },

    /// Node is not bound to external storage.
    #[error("Property is not tied: '{path}'")]
    NotTied { path: String },

    /// The store ran out of node handles.
    #[error(transparent)]
    Core(#[from] fc_core::FcError),
}
