//! Core data types
//!
//! Shared between the pipeline, the store and the search coordinator.

pub mod file;
pub mod search;

pub use file::{CaptionedItem, EmbeddedItem, FileKind, FileRecord, SelectedFile, VectorRow};
pub use search::SearchResult;
