//! Inference capability contracts
//!
//! The captioner and embedder backends are opaque: this crate only drives
//! their lifecycle (`download`, `init`, `destroy`) and calls them through a
//! request/response contract.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::CapabilityError;

/// Download progress callback, receives a fraction in `[0, 1]`
pub type DownloadProgress<'a> = &'a (dyn Fn(f32) + Send + Sync);

/// Lifecycle shared by both model roles
#[async_trait]
pub trait ModelLifecycle: Send + Sync {
    /// Identity of the model weights this instance serves
    fn model_id(&self) -> &str;

    /// Fetch model weights, reporting fractional progress
    async fn download(&self, on_progress: DownloadProgress<'_>) -> Result<(), CapabilityError>;

    /// Load weights into memory
    async fn init(&self) -> Result<(), CapabilityError>;

    /// Release all resources held by the model
    async fn destroy(&self) -> Result<(), CapabilityError>;
}

/// A single image-captioning request
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRequest {
    pub prompt: String,
    pub image_path: PathBuf,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Vision-language model producing image captions
#[async_trait]
pub trait CaptionModel: ModelLifecycle {
    async fn complete(&self, request: &CaptionRequest) -> Result<String, CapabilityError>;

    /// Clear the model's conversation context between images
    async fn reset(&self) -> Result<(), CapabilityError>;
}

/// Text embedding model with fixed output dimension
#[async_trait]
pub trait EmbeddingModel: ModelLifecycle {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError>;
}

/// Factory for fresh model instances, one per load
pub trait ModelProvider: Send + Sync {
    fn captioner(&self, model_id: &str) -> Arc<dyn CaptionModel>;

    fn embedder(&self) -> Arc<dyn EmbeddingModel>;
}
