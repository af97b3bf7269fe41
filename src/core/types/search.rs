//! Search result types

use serde::{Deserialize, Serialize};

use super::file::FileRecord;

/// A ranked search hit. Computed per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub record: FileRecord,

    /// `1 - similarity`
    pub distance: f32,

    /// Displayed relevance in `[0, 1]`
    pub similarity: f32,
}

impl SearchResult {
    pub fn new(record: FileRecord, similarity: f32) -> Self {
        let similarity = similarity.clamp(0.0, 1.0);
        Self {
            record,
            distance: 1.0 - similarity,
            similarity,
        }
    }
}
