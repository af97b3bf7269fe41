//! Error types for the indexing pipeline

use thiserror::Error;

use crate::models::{CapabilityError, ModelError};
use crate::progress::ProcessingPhase;
use crate::store::StoreError;

/// Errors that can occur while indexing a batch
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A model could not be loaded (fatal to the batch)
    #[error(transparent)]
    ModelLoad(#[from] ModelError),

    /// Captioning one image failed. Recovered with a fallback caption and
    /// never returned from `index_files`.
    #[error("Captioning failed for {name}: {reason}")]
    ItemCaption { name: String, reason: String },

    /// Embedding generation failed (fatal to the batch)
    #[error("Embedding failed for {name}: {cause}")]
    Embedding {
        name: String,
        #[source]
        cause: CapabilityError,
    },

    /// Writing a record failed (fatal to the batch)
    #[error("Failed to persist indexed file: {0}")]
    Persistence(#[from] StoreError),

    #[error("Another batch is already being indexed")]
    BatchInProgress,

    #[error("Pipeline is shutting down")]
    ShuttingDown,

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidPhaseTransition {
        from: ProcessingPhase,
        to: ProcessingPhase,
    },
}

impl PipelineError {
    /// Check if resubmitting the batch may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::ModelLoad(e) => e.is_retryable(),
            PipelineError::Persistence(e) => e.is_retryable(),
            PipelineError::Embedding { .. } | PipelineError::BatchInProgress => true,
            _ => false,
        }
    }
}
