//! In-memory collaborators shared by the unit tests

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::core::types::{EmbeddedItem, FileRecord, VectorRow};
use crate::extract::TextExtractor;
use crate::models::{
    CapabilityError, CaptionModel, CaptionRequest, DownloadProgress, EmbeddingModel,
    ModelLifecycle, ModelProvider,
};
use crate::pipeline::ContentResolver;
use crate::store::{FileStore, StoreError, StoreResult};

pub const FAKE_EMBEDDER_ID: &str = "fake-embedder";

/// Call counters observed across every instance a provider hands out
#[derive(Default)]
pub struct FakeStats {
    pub downloads: AtomicUsize,
    pub inits: AtomicUsize,
    pub destroys: AtomicUsize,
    pub caption_calls: AtomicUsize,
    pub resets: AtomicUsize,
    pub embed_calls: AtomicUsize,
    pub embedded_texts: Mutex<Vec<String>>,
    pub captioner_ids: Mutex<Vec<String>>,
}

impl FakeStats {
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    pub fn caption_calls(&self) -> usize {
        self.caption_calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn embedded_texts(&self) -> Vec<String> {
        self.embedded_texts.lock().clone()
    }
}

/// Holds the first `embed` call until released
#[derive(Default)]
pub struct EmbedGate {
    pub started: Notify,
    pub release: Notify,
}

#[derive(Clone)]
struct FakeOptions {
    caption: String,
    caption_suffix: String,
    fail_caption_call: Option<usize>,
    fail_embed_call: Option<usize>,
    fail_download: bool,
    fail_init: bool,
    dimension: usize,
    embedder_id: String,
    gate: Option<Arc<EmbedGate>>,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            caption: "a photo".to_string(),
            caption_suffix: String::new(),
            fail_caption_call: None,
            fail_embed_call: None,
            fail_download: false,
            fail_init: false,
            dimension: 16,
            embedder_id: FAKE_EMBEDDER_ID.to_string(),
            gate: None,
        }
    }
}

/// Provider handing out scripted captioners and embedders
#[derive(Clone, Default)]
pub struct FakeProvider {
    options: FakeOptions,
    pub stats: Arc<FakeStats>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caption(mut self, caption: &str) -> Self {
        self.options.caption = caption.to_string();
        self
    }

    /// Append a raw end-of-turn marker to every caption
    pub fn with_caption_suffix(mut self, suffix: &str) -> Self {
        self.options.caption_suffix = suffix.to_string();
        self
    }

    /// Fail the n-th caption call (1-based)
    pub fn failing_caption_call(mut self, n: usize) -> Self {
        self.options.fail_caption_call = Some(n);
        self
    }

    /// Fail the n-th embed call (1-based)
    pub fn failing_embed_call(mut self, n: usize) -> Self {
        self.options.fail_embed_call = Some(n);
        self
    }

    pub fn failing_download(mut self) -> Self {
        self.options.fail_download = true;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.options.fail_init = true;
        self
    }

    pub fn with_embed_gate(mut self, gate: Arc<EmbedGate>) -> Self {
        self.options.gate = Some(gate);
        self
    }

    pub fn shared(self) -> Arc<dyn ModelProvider> {
        Arc::new(self)
    }
}

impl ModelProvider for FakeProvider {
    fn captioner(&self, model_id: &str) -> Arc<dyn CaptionModel> {
        self.stats.captioner_ids.lock().push(model_id.to_string());
        Arc::new(FakeModel {
            id: model_id.to_string(),
            options: self.options.clone(),
            stats: self.stats.clone(),
        })
    }

    fn embedder(&self) -> Arc<dyn EmbeddingModel> {
        Arc::new(FakeModel {
            id: self.options.embedder_id.clone(),
            options: self.options.clone(),
            stats: self.stats.clone(),
        })
    }
}

struct FakeModel {
    id: String,
    options: FakeOptions,
    stats: Arc<FakeStats>,
}

#[async_trait]
impl ModelLifecycle for FakeModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn download(&self, on_progress: DownloadProgress<'_>) -> Result<(), CapabilityError> {
        self.stats.downloads.fetch_add(1, Ordering::SeqCst);
        on_progress(0.5);
        if self.options.fail_download {
            return Err(CapabilityError::Download {
                reason: "network unreachable".to_string(),
            });
        }
        on_progress(1.0);
        Ok(())
    }

    async fn init(&self) -> Result<(), CapabilityError> {
        // Yield so concurrent loaders get a chance to queue up
        tokio::task::yield_now().await;
        if self.options.fail_init {
            return Err(CapabilityError::Initialization {
                reason: "out of memory".to_string(),
            });
        }
        self.stats.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), CapabilityError> {
        self.stats.destroys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl CaptionModel for FakeModel {
    async fn complete(&self, _request: &CaptionRequest) -> Result<String, CapabilityError> {
        let call = self.stats.caption_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.options.fail_caption_call == Some(call) {
            return Err(CapabilityError::Inference {
                reason: "decoder crashed".to_string(),
            });
        }
        Ok(format!("{}{}", self.options.caption, self.options.caption_suffix))
    }

    async fn reset(&self) -> Result<(), CapabilityError> {
        self.stats.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl EmbeddingModel for FakeModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        let call = self.stats.embed_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == 1 {
            if let Some(gate) = &self.options.gate {
                gate.started.notify_one();
                gate.release.notified().await;
            }
        }
        self.stats.embedded_texts.lock().push(text.to_string());
        if self.options.fail_embed_call == Some(call) {
            return Err(CapabilityError::Inference {
                reason: "embedding backend error".to_string(),
            });
        }
        Ok(token_embedding(text, self.options.dimension))
    }
}

/// Deterministic bag-of-tokens embedding: identical token sets map to
/// identical unit vectors
pub fn token_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension.max(1)];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let hash = blake3::hash(token.as_bytes());
        let slot = hash.as_bytes()[0] as usize % vector.len();
        vector[slot] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

/// Extractor returning canned text per uri
#[derive(Default)]
pub struct FakeExtractor {
    texts: HashMap<String, String>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, uri: &str, text: &str) -> Self {
        self.texts.insert(uri.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract_text(&self, uri: &str, max_chars: usize) -> String {
        self.texts
            .get(uri)
            .map(|t| t.chars().take(max_chars).collect())
            .unwrap_or_default()
    }
}

/// Resolver serving opaque content handles from memory
#[derive(Default)]
pub struct FakeResolver {
    contents: HashMap<String, Vec<u8>>,
}

impl FakeResolver {
    pub fn with_content(mut self, uri: &str, bytes: Vec<u8>) -> Self {
        self.contents.insert(uri.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ContentResolver for FakeResolver {
    async fn read(&self, uri: &str) -> io::Result<Vec<u8>> {
        self.contents
            .get(uri)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no content for {}", uri)))
    }
}

/// In-memory store, optionally failing the n-th insert
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<(FileRecord, VectorRow)>>,
    inserts: AtomicUsize,
    fail_insert: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th insert (1-based)
    pub fn failing_insert(mut self, n: usize) -> Self {
        self.fail_insert = Some(n);
        self
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn insert_indexed(&self, item: &EmbeddedItem, model_id: &str) -> StoreResult<FileRecord> {
        let call = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_insert == Some(call) {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            )));
        }

        let mut rows = self.rows.lock();
        let id = rows.last().map_or(1, |(record, _)| record.id + 1);
        let record = FileRecord {
            id,
            uri: item.file().uri.clone(),
            filename: item.file().filename(),
            kind: item.file().kind,
            caption: item.caption().to_string(),
            thumbnail: item
                .item
                .thumbnail
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            created_at: Utc::now(),
        };
        let vector = VectorRow {
            file_id: id,
            embedding: item.embedding.clone(),
            model_id: model_id.to_string(),
        };
        rows.push((record.clone(), vector));
        Ok(record)
    }

    async fn get_file(&self, id: i64) -> StoreResult<Option<FileRecord>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|(record, _)| record.id == id)
            .map(|(record, _)| record.clone()))
    }

    async fn get_vector(&self, file_id: i64) -> StoreResult<Option<VectorRow>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|(_, vector)| vector.file_id == file_id)
            .map(|(_, vector)| vector.clone()))
    }

    async fn fetch_corpus(&self) -> StoreResult<Vec<(FileRecord, VectorRow)>> {
        Ok(self.rows.lock().clone())
    }

    async fn delete_file(&self, id: i64) -> StoreResult<bool> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|(record, _)| record.id != id);
        Ok(rows.len() != before)
    }

    async fn count_files(&self) -> StoreResult<i64> {
        Ok(self.rows.lock().len() as i64)
    }
}
