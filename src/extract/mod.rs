//! Document text extraction
//!
//! The pipeline only needs `extract_text(uri, max_chars)`. Extraction never
//! fails from the caller's point of view: any problem yields an empty string
//! and the pipeline falls back to a filename caption.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::utils::{collapse_whitespace, get_extension, local_path, truncate_chars};

#[cfg(test)]
mod tests;

/// Text extraction collaborator
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract at most `max_chars` characters of text, or `""` on failure
    async fn extract_text(&self, uri: &str, max_chars: usize) -> String;
}

/// Internal extraction failures, logged and converted to `""`
#[derive(Debug, Error)]
enum ExtractError {
    #[error("uri is not a local file: {0}")]
    NotLocal(String),

    #[error("unsupported document type: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Extracts text from local plain-text and PDF files
pub struct FileTextExtractor {
    text_extensions: Vec<&'static str>,
}

impl FileTextExtractor {
    pub fn new() -> Self {
        Self {
            text_extensions: vec![
                "txt", "md", "markdown", "rst", "json", "yaml", "yml", "toml", "xml", "csv",
                "log", "ini", "cfg", "conf", "html", "htm",
            ],
        }
    }

    /// Check if the extractor can read files with this extension
    pub fn supports(&self, extension: &str) -> bool {
        extension == "pdf" || self.text_extensions.contains(&extension)
    }

    async fn try_extract(&self, uri: &str) -> Result<String, ExtractError> {
        let path = local_path(uri).ok_or_else(|| ExtractError::NotLocal(uri.to_string()))?;
        let extension = get_extension(&path);

        if extension == "pdf" {
            return read_pdf(path).await;
        }
        if self.text_extensions.contains(&extension.as_str()) {
            let bytes = tokio::fs::read(&path).await?;
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        Err(ExtractError::Unsupported(extension))
    }
}

impl Default for FileTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract_text(&self, uri: &str, max_chars: usize) -> String {
        match self.try_extract(uri).await {
            Ok(text) => {
                let text = collapse_whitespace(&text);
                truncate_chars(&text, max_chars).to_string()
            }
            Err(e) => {
                tracing::debug!(uri, error = %e, "Text extraction failed, using empty text");
                String::new()
            }
        }
    }
}

async fn read_pdf(path: PathBuf) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extract_pdf(&path))
        .await
        .map_err(|e| ExtractError::Pdf(format!("Task join error: {}", e)))?
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}
