//! Engine configuration
//!
//! One serializable document aggregating every subsystem's settings. Saved
//! as pretty JSON with an atomic temp-file + rename write.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LoggingConfig;
use crate::models::ModelsConfig;
use crate::pipeline::PipelineConfig;
use crate::search::SearchConfig;
use crate::store::DatabaseConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_version() -> u32 {
    1
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            models: ModelsConfig::default(),
            pipeline: PipelineConfig::default(),
            search: SearchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Place the database, image work directory and logs under `dir`
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.database.db_path = dir.join("index.db");
        self.pipeline.work_dir = dir.join("images");
        self.logging.log_directory = Some(dir.join("logs"));
        self
    }

    /// Load configuration from a JSON file
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration with an atomic write
    pub async fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content).await?;
        tokio::fs::rename(&temp_path, path).await?;

        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        self.search.validate().map_err(|e| ConfigError::Invalid {
            field: "search".to_string(),
            reason: e.to_string(),
        })?;

        if !(1..=100).contains(&self.pipeline.jpeg_quality) {
            return Err(ConfigError::Invalid {
                field: "pipeline.jpeg_quality".to_string(),
                reason: format!("must be within 1..=100, got {}", self.pipeline.jpeg_quality),
            });
        }
        if self.pipeline.image_max_dimension == 0 {
            return Err(ConfigError::Invalid {
                field: "pipeline.image_max_dimension".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.models.captioner_model_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "models.captioner_model_id".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "database.max_connections".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(())
    }
}
