//! Pipeline configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Instruction given to the captioner for every image
pub const DEFAULT_CAPTION_PROMPT: &str =
    "Describe this image in one detailed sentence. Mention the main objects, colors, any visible text and the setting.";

/// Indexing pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub caption_prompt: String,

    /// Token budget per caption
    pub caption_max_tokens: u32,

    pub caption_temperature: f32,

    /// Pause between two captioned images (ms)
    pub caption_cooldown_ms: u64,

    /// Pause between two embedded items (ms)
    pub embed_cooldown_ms: u64,

    /// Longest image edge after normalization (px)
    pub image_max_dimension: u32,

    /// JPEG quality of normalized images (1-100)
    pub jpeg_quality: u8,

    /// Characters requested from the text extractor per document
    pub extract_max_chars: usize,

    /// Extracted text must be longer than this to be used in a caption
    pub min_extracted_chars: usize,

    /// Where normalized images and copied content are written
    pub work_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            caption_prompt: DEFAULT_CAPTION_PROMPT.to_string(),
            caption_max_tokens: 100,
            caption_temperature: 0.2,
            caption_cooldown_ms: 500,
            embed_cooldown_ms: 100,
            image_max_dimension: 1024,
            jpeg_quality: 80,
            extract_max_chars: 2000,
            min_extracted_chars: 20,
            work_dir: directories::ProjectDirs::from("com", "neuralfs", "NeuralIndex")
                .map(|dirs| dirs.cache_dir().join("images"))
                .unwrap_or_else(|| std::env::temp_dir().join("neural-index").join("images")),
        }
    }
}

impl PipelineConfig {
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Configuration without inter-item pauses
    pub fn without_cooldowns(mut self) -> Self {
        self.caption_cooldown_ms = 0;
        self.embed_cooldown_ms = 0;
        self
    }

    pub fn caption_cooldown(&self) -> Duration {
        Duration::from_millis(self.caption_cooldown_ms)
    }

    pub fn embed_cooldown(&self) -> Duration {
        Duration::from_millis(self.embed_cooldown_ms)
    }
}
