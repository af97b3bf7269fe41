//! Pipeline phase state machine

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phases of one indexing batch, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPhase {
    Idle,
    Selecting,
    LoadingVision,
    Captioning,
    UnloadingVision,
    LoadingEmbedding,
    Embedding,
    Saving,
    Complete,
    Error,
}

impl ProcessingPhase {
    /// Check if transition to the target phase is valid
    pub fn can_transition_to(&self, target: ProcessingPhase) -> bool {
        use ProcessingPhase::*;

        match (self, target) {
            // Error is reachable from anywhere
            (_, Error) => true,
            // A finished batch resets before the next one
            (Complete | Error, Idle) => true,
            // Empty batch
            (Idle, Complete) => true,
            (Idle, Selecting) => true,
            (Selecting, LoadingVision) => true,
            // Documents only: no vision phases
            (Selecting, Captioning) => true,
            (LoadingVision, Captioning) => true,
            (Captioning, UnloadingVision) => true,
            (Captioning, LoadingEmbedding) => true,
            (UnloadingVision, LoadingEmbedding) => true,
            (LoadingEmbedding, Embedding) => true,
            (Embedding, Saving) => true,
            (Saving, Complete) => true,
            _ => false,
        }
    }

    /// Whether a batch is running in this phase
    pub fn is_active(&self) -> bool {
        !matches!(self, ProcessingPhase::Idle | ProcessingPhase::Complete | ProcessingPhase::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingPhase::Idle => "idle",
            ProcessingPhase::Selecting => "selecting",
            ProcessingPhase::LoadingVision => "loading_vision",
            ProcessingPhase::Captioning => "captioning",
            ProcessingPhase::UnloadingVision => "unloading_vision",
            ProcessingPhase::LoadingEmbedding => "loading_embedding",
            ProcessingPhase::Embedding => "embedding",
            ProcessingPhase::Saving => "saving",
            ProcessingPhase::Complete => "complete",
            ProcessingPhase::Error => "error",
        }
    }
}

impl Default for ProcessingPhase {
    fn default() -> Self {
        ProcessingPhase::Idle
    }
}

impl fmt::Display for ProcessingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
