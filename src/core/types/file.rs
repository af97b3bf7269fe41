//! File types
//!
//! Inputs handed to the pipeline, the intermediate items it owns while a batch
//! runs, and the persisted file identity.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::utils::filename_from_uri;

/// Kind of a selected file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Document,
}

impl FileKind {
    /// Lowercase label used in captions and in the store
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Document => "document",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileKind::Image),
            "document" => Ok(FileKind::Document),
            other => Err(format!("unknown file kind: {}", other)),
        }
    }
}

/// A file chosen by the user for indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    /// Location of the file (`file://` uri, plain path or opaque content handle)
    pub uri: String,

    /// Name shown to the user
    pub display_name: String,

    pub kind: FileKind,

    /// Size reported by the file selector, in bytes
    pub declared_size: u64,
}

impl SelectedFile {
    pub fn new(uri: impl Into<String>, display_name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            uri: uri.into(),
            display_name: display_name.into(),
            kind,
            declared_size: 0,
        }
    }

    pub fn with_size(mut self, declared_size: u64) -> Self {
        self.declared_size = declared_size;
        self
    }

    pub fn image(uri: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(uri, display_name, FileKind::Image)
    }

    pub fn document(uri: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(uri, display_name, FileKind::Document)
    }

    /// The display name, or the last uri segment when the name is blank
    pub fn filename(&self) -> String {
        if self.display_name.trim().is_empty() {
            filename_from_uri(&self.uri)
        } else {
            self.display_name.clone()
        }
    }
}

/// A file with its caption, produced by the captioning phase
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionedItem {
    pub file: SelectedFile,
    pub caption: String,
    pub thumbnail: Option<PathBuf>,
}

/// A captioned file with its embedding, produced by the embedding phase
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedItem {
    pub item: CaptionedItem,
    pub embedding: Vec<f32>,
}

impl EmbeddedItem {
    pub fn file(&self) -> &SelectedFile {
        &self.item.file
    }

    pub fn caption(&self) -> &str {
        &self.item.caption
    }
}

/// Persisted file identity. `id` is assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub uri: String,
    pub filename: String,
    pub kind: FileKind,
    pub caption: String,
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Vector row joined to its file record
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRow {
    pub file_id: i64,
    pub embedding: Vec<f32>,

    /// Identity of the embedding model that produced `embedding`
    pub model_id: String,
}

impl VectorRow {
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
