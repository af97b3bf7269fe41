//! Core module
//!
//! Engine-wide error and configuration types, the data model shared by every
//! subsystem, and uri/filename helpers.

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use error::{EngineError, Result};
