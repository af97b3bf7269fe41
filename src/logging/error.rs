//! Error types for logging setup

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    Initialization(String),

    #[error("Failed to create log directory {path}: {reason}")]
    DirectoryCreation { path: String, reason: String },

    #[error("Invalid filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },
}

/// Result type for logging operations
pub type LoggingResult<T> = Result<T, LoggingError>;
