//! Model lifecycle
//!
//! A captioner (vision-language model) and an embedder (text embedding
//! model) never share memory: loading one unloads the other. The
//! [`ModelLifecycleManager`] is the only component that creates or destroys
//! model instances.

mod capability;
mod config;
mod error;
mod manager;


pub use capability::{
    CaptionModel, CaptionRequest, DownloadProgress, EmbeddingModel, ModelLifecycle, ModelProvider,
};
pub use config::ModelsConfig;
pub use error::{CapabilityError, ModelError, ModelResult};
pub use manager::{ModelLifecycleManager, ModelLoadingState, ModelRole};
