//! Persistent store
//!
//! Two logical tables: file metadata, and a one-to-one vector row keyed by
//! file id. The pipeline writes through [`FileStore::insert_indexed`], which
//! commits both rows in one transaction so no file record can exist
//! without its vector.

mod error;
mod pool;
pub mod schema;
mod sqlite;

#[cfg(test)]
mod tests;

pub use error::{StoreError, StoreResult};
pub use pool::{create_database_pool, DatabaseConfig};
pub use sqlite::SqliteFileStore;

use async_trait::async_trait;

use crate::core::types::{EmbeddedItem, FileRecord, VectorRow};

/// Persistent store collaborator used by the pipeline and the search coordinator
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist a file record and its vector row as one unit.
    /// `model_id` identifies the embedding model that produced the vector.
    async fn insert_indexed(&self, item: &EmbeddedItem, model_id: &str) -> StoreResult<FileRecord>;

    async fn get_file(&self, id: i64) -> StoreResult<Option<FileRecord>>;

    async fn get_vector(&self, file_id: i64) -> StoreResult<Option<VectorRow>>;

    /// Every file with its vector, in insertion order
    async fn fetch_corpus(&self) -> StoreResult<Vec<(FileRecord, VectorRow)>>;

    /// Delete a file and its vector. Returns whether a row existed.
    async fn delete_file(&self, id: i64) -> StoreResult<bool>;

    async fn count_files(&self) -> StoreResult<i64>;
}
