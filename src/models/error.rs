//! Error types for the model lifecycle layer

use thiserror::Error;

use super::ModelRole;

/// Errors returned by an inference capability (download, init, inference)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("Model download failed: {reason}")]
    Download { reason: String },

    #[error("Model initialization failed: {reason}")]
    Initialization { reason: String },

    #[error("Inference failed: {reason}")]
    Inference { reason: String },

    #[error("Model was released")]
    Released,
}

/// Errors surfaced by the model lifecycle manager
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("Failed to load {role} model: {cause}")]
    LoadFailure {
        role: ModelRole,
        #[source]
        cause: CapabilityError,
    },

    #[error("{role} model is not loaded")]
    NotLoaded { role: ModelRole },

    #[error("{role} inference failed: {cause}")]
    Inference {
        role: ModelRole,
        #[source]
        cause: CapabilityError,
    },
}

impl ModelError {
    /// Check if this error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::LoadFailure { .. } | ModelError::NotLoaded { .. }
        )
    }

    /// Role the error relates to
    pub fn role(&self) -> ModelRole {
        match self {
            ModelError::LoadFailure { role, .. }
            | ModelError::NotLoaded { role }
            | ModelError::Inference { role, .. } => *role,
        }
    }
}

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;
