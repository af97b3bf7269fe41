//! Error types for search

use thiserror::Error;

use crate::models::{CapabilityError, ModelError};
use crate::store::StoreError;

/// Failures inside one query. Logged by the coordinator and turned into an
/// empty result; never returned to search callers.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Query embedding failed: {0}")]
    QueryEmbedding(#[source] CapabilityError),

    #[error("Corpus unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),
}
