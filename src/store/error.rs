//! Store error types

use thiserror::Error;

/// Errors raised by the persistent store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Embedding encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Corrupt row for file {file_id}: {reason}")]
    CorruptRow { file_id: i64, reason: String },

    #[error("Migration {version} failed: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Check if the operation may succeed when retried
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Database(_)
            ),
            StoreError::Io(_) => true,
            _ => false,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
