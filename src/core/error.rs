//! Engine-wide error type
//!
//! Each subsystem owns its error enum; [`EngineError`] aggregates them for
//! callers that drive the whole engine.

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::logging::LoggingError;
use crate::models::ModelError;
use crate::pipeline::PipelineError;
use crate::search::SearchError;
use crate::store::StoreError;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Indexing error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Check if the failed operation may succeed when retried
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Model(e) => e.is_retryable(),
            EngineError::Pipeline(e) => e.is_retryable(),
            EngineError::Store(e) => e.is_retryable(),
            EngineError::Io(_) => true,
            EngineError::Search(_) | EngineError::Config(_) | EngineError::Logging(_) => false,
        }
    }
}
