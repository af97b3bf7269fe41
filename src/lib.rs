//! Neural Index - on-device semantic indexing engine
//!
//! This crate orchestrates two memory-heavy inference models on a
//! constrained device:
//! - Model lifecycle: at most one of captioner / embedder resident, with
//!   cooldown pauses between switches and shared in-flight loads
//! - Batch indexing: caption images, extract document text, embed and
//!   persist every file of a batch through a fixed phase sequence
//! - Search: single-flight, latest-wins queries ranked by a hybrid of
//!   embedding similarity and keyword overlap
//! - Progress: snapshots to a registered observer and a broadcast stream
//! - SQLite persistence with transactional record + vector inserts

pub mod core;
pub mod engine;
pub mod extract;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use crate::core::config::EngineConfig;
pub use crate::core::error::{EngineError, Result};
pub use crate::core::types::{FileKind, FileRecord, SearchResult, SelectedFile};
pub use engine::{Engine, EngineCollaborators};
pub use models::{CaptionModel, EmbeddingModel, ModelLifecycleManager, ModelProvider, ModelRole};
pub use pipeline::{IndexReport, IndexingPipeline, PipelineError};
pub use progress::{ProcessingPhase, ProcessingProgress, ProgressReporter};
pub use search::SearchCoordinator;
pub use store::{FileStore, SqliteFileStore};
