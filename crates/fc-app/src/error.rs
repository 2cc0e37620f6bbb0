//! Error types for the fc-app service layer.

use std::path::PathBuf;

use fc_controls::ControlError;

/// Application error type shared by the CLI and tests.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fc-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<fc_project::ProjectError> for AppError {
    fn from(err: fc_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<fc_props::PropError> for AppError {
    fn from(err: fc_props::PropError) -> Self {
        AppError::Control(ControlError::Property(err))
    }
}
