//! Configuration for the model lifecycle manager

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Model lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Captioner model id requested by the pipeline
    pub captioner_model_id: String,

    /// Pause after unloading one role before loading the other (ms)
    pub switch_cooldown_ms: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            captioner_model_id: "smolvlm-256m-instruct".to_string(),
            switch_cooldown_ms: 1500,
        }
    }
}

impl ModelsConfig {
    pub fn switch_cooldown(&self) -> Duration {
        Duration::from_millis(self.switch_cooldown_ms)
    }

    /// Configuration without cooldown pauses
    pub fn without_cooldown(mut self) -> Self {
        self.switch_cooldown_ms = 0;
        self
    }
}
