//! Batch indexing pipeline
//!
//! Drives one batch of selected files through a fixed phase sequence:
//!
//! `idle -> selecting -> loading_vision -> captioning -> unloading_vision ->
//! loading_embedding -> embedding -> saving -> complete`
//!
//! Vision phases are skipped for batches without images. Captioning failures
//! are item-scoped and recovered with a filename caption; embedding and
//! persistence failures abort the whole batch, unload both models and leave
//! nothing persisted for items that were not yet saved.

mod caption;
mod config;
mod error;
mod image;


pub use caption::{clean_caption, document_caption, fallback_caption};
pub use config::{PipelineConfig, DEFAULT_CAPTION_PROMPT};
pub use error::PipelineError;
pub use image::{ContentResolver, FsContentResolver, ImagePreparer, PreparedImage};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::types::{CaptionedItem, EmbeddedItem, FileKind, FileRecord, SelectedFile};
use crate::core::utils::generate_uuid;
use crate::extract::TextExtractor;
use crate::models::{CaptionRequest, ModelError, ModelLifecycleManager, ModelRole};
use crate::progress::{ProcessingPhase, ProgressReporter};
use crate::store::FileStore;

use caption::display_label;

/// Outcome of a successful batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    pub batch_id: Uuid,

    /// Persisted records in submission order (images first, then documents)
    pub records: Vec<FileRecord>,

    /// Images that received a fallback caption
    pub recovered_captions: usize,
}

/// Sequential batch indexer. At most one batch runs at a time.
pub struct IndexingPipeline {
    models: Arc<ModelLifecycleManager>,
    store: Arc<dyn FileStore>,
    extractor: Arc<dyn TextExtractor>,
    preparer: ImagePreparer,
    reporter: ProgressReporter,
    config: PipelineConfig,

    batch_lock: Mutex<()>,
    shutdown: AtomicBool,
    phase: RwLock<ProcessingPhase>,
}

impl IndexingPipeline {
    pub fn new(
        models: Arc<ModelLifecycleManager>,
        store: Arc<dyn FileStore>,
        extractor: Arc<dyn TextExtractor>,
        resolver: Arc<dyn ContentResolver>,
        reporter: ProgressReporter,
        config: PipelineConfig,
    ) -> Self {
        let preparer = ImagePreparer::new(
            resolver,
            config.work_dir.clone(),
            config.image_max_dimension,
            config.jpeg_quality,
        );
        Self {
            models,
            store,
            extractor,
            preparer,
            reporter,
            config,
            batch_lock: Mutex::new(()),
            shutdown: AtomicBool::new(false),
            phase: RwLock::new(ProcessingPhase::Idle),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Phase of the running (or last) batch
    pub fn current_phase(&self) -> ProcessingPhase {
        *self.phase.read()
    }

    /// Whether a batch is currently running
    pub fn is_busy(&self) -> bool {
        self.batch_lock.try_lock().is_err()
    }

    /// Reject all batches submitted from now on. A running batch finishes.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Wait until no batch is running
    pub async fn wait_idle(&self) {
        let _batch = self.batch_lock.lock().await;
    }

    /// Index a batch of files.
    ///
    /// Returns the persisted records, or the error that aborted the batch.
    /// On error both models are unloaded and the phase is `error`.
    pub async fn index_files(&self, files: Vec<SelectedFile>) -> Result<IndexReport, PipelineError> {
        if self.is_shutdown() {
            return Err(PipelineError::ShuttingDown);
        }
        let _batch = self
            .batch_lock
            .try_lock()
            .map_err(|_| PipelineError::BatchInProgress)?;

        let batch_id = generate_uuid();
        let span = tracing::info_span!("index_batch", %batch_id, files = files.len());

        async move {
            self.reset_phase();

            if files.is_empty() {
                self.enter(ProcessingPhase::Complete)?;
                self.reporter
                    .report(ProcessingPhase::Complete, 0, 0, "Nothing to index");
                return Ok(IndexReport {
                    batch_id,
                    records: Vec::new(),
                    recovered_captions: 0,
                });
            }

            match self.run_batch(batch_id, &files).await {
                Ok(report) => {
                    tracing::info!(
                        indexed = report.records.len(),
                        recovered = report.recovered_captions,
                        "Batch indexed"
                    );
                    Ok(report)
                }
                Err(e) => {
                    self.abort(&e, files.len()).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_batch(&self, batch_id: Uuid, files: &[SelectedFile]) -> Result<IndexReport, PipelineError> {
        let total = files.len();
        let (images, documents): (Vec<&SelectedFile>, Vec<&SelectedFile>) =
            files.iter().partition(|f| f.kind == FileKind::Image);

        self.enter(ProcessingPhase::Selecting)?;
        self.reporter.report(
            ProcessingPhase::Selecting,
            0,
            total,
            format!("Selected {} images and {} documents", images.len(), documents.len()),
        );

        let mut captioned = Vec::with_capacity(total);
        let mut recovered_captions = 0;

        if !images.is_empty() {
            self.enter(ProcessingPhase::LoadingVision)?;
            self.models
                .load_captioner(self.models.captioner_model_id())
                .await?;
        }

        self.enter(ProcessingPhase::Captioning)?;
        for (i, file) in images.iter().enumerate() {
            if i > 0 {
                pause(self.config.caption_cooldown()).await;
            }
            let name = display_label(file);
            self.reporter.report(
                ProcessingPhase::Captioning,
                i,
                total,
                format!("Captioning {}", name),
            );

            let (item, recovered) = self.caption_image(file).await;
            if recovered {
                recovered_captions += 1;
            }
            captioned.push(item);
        }

        for (j, file) in documents.iter().enumerate() {
            let name = display_label(file);
            self.reporter.report(
                ProcessingPhase::Captioning,
                images.len() + j,
                total,
                format!("Reading {}", name),
            );
            let text = self
                .extractor
                .extract_text(&file.uri, self.config.extract_max_chars)
                .await;
            if text.is_empty() {
                tracing::debug!(uri = %file.uri, "No text extracted, using name caption");
            }
            captioned.push(CaptionedItem {
                file: (*file).clone(),
                caption: document_caption(file, &text, self.config.min_extracted_chars),
                thumbnail: None,
            });
        }
        self.reporter
            .report(ProcessingPhase::Captioning, total, total, "Captions ready");

        if !images.is_empty() {
            self.enter(ProcessingPhase::UnloadingVision)?;
            self.reporter
                .report(ProcessingPhase::UnloadingVision, 0, 1, "Unloading vision model");
            self.models.unload_captioner().await;
            self.reporter
                .report(ProcessingPhase::UnloadingVision, 1, 1, "Vision model unloaded");
        }

        self.enter(ProcessingPhase::LoadingEmbedding)?;
        self.models.load_embedder().await?;

        self.enter(ProcessingPhase::Embedding)?;
        let mut embedded = Vec::with_capacity(total);
        let mut model_id = String::new();
        for (i, item) in captioned.into_iter().enumerate() {
            if i > 0 {
                pause(self.config.embed_cooldown()).await;
            }
            let name = display_label(&item.file);
            self.reporter.report(
                ProcessingPhase::Embedding,
                i,
                total,
                format!("Embedding {}", name),
            );

            let embedder = self
                .models
                .current_embedder()
                .ok_or(ModelError::NotLoaded {
                    role: ModelRole::Embedder,
                })?;
            let embedding = embedder
                .embed(item.caption.as_str())
                .await
                .map_err(|cause| PipelineError::Embedding { name, cause })?;
            model_id = embedder.model_id().to_string();

            embedded.push(EmbeddedItem { item, embedding });
        }

        self.enter(ProcessingPhase::Saving)?;
        let mut records = Vec::with_capacity(total);
        for (i, item) in embedded.iter().enumerate() {
            self.reporter.report(
                ProcessingPhase::Saving,
                i,
                total,
                format!("Saving {}", display_label(item.file())),
            );
            records.push(self.store.insert_indexed(item, &model_id).await?);
        }

        self.enter(ProcessingPhase::Complete)?;
        self.reporter.report(
            ProcessingPhase::Complete,
            total,
            total,
            format!("Indexed {} files", total),
        );

        Ok(IndexReport {
            batch_id,
            records,
            recovered_captions,
        })
    }

    /// Caption one image. Failures are recovered with a fallback caption;
    /// the flag reports whether that happened.
    async fn caption_image(&self, file: &SelectedFile) -> (CaptionedItem, bool) {
        let (thumbnail, caption) = match self.preparer.prepare(file).await {
            Ok(prepared) => {
                let caption = self.describe(file, &prepared.path).await;
                (prepared.thumbnail, caption)
            }
            Err(e) => (
                None,
                Err(PipelineError::ItemCaption {
                    name: display_label(file),
                    reason: e.to_string(),
                }),
            ),
        };

        match caption {
            Ok(caption) => (
                CaptionedItem {
                    file: file.clone(),
                    caption,
                    thumbnail,
                },
                false,
            ),
            Err(e) => {
                tracing::warn!(uri = %file.uri, error = %e, "Using fallback caption");
                (
                    CaptionedItem {
                        file: file.clone(),
                        caption: fallback_caption(file),
                        thumbnail,
                    },
                    true,
                )
            }
        }
    }

    async fn describe(&self, file: &SelectedFile, image_path: &Path) -> Result<String, PipelineError> {
        let item_error = |reason: String| PipelineError::ItemCaption {
            name: display_label(file),
            reason,
        };

        // Looked up per image: a search may have swapped in the embedder
        let captioner = self
            .models
            .current_captioner()
            .ok_or_else(|| item_error("captioner is not loaded".to_string()))?;

        let request = CaptionRequest {
            prompt: self.config.caption_prompt.clone(),
            image_path: image_path.to_path_buf(),
            max_tokens: self.config.caption_max_tokens,
            temperature: self.config.caption_temperature,
        };
        let raw = captioner.complete(&request).await;

        if let Err(e) = captioner.reset().await {
            tracing::debug!(error = %e, "Captioner context reset failed");
        }

        let caption = clean_caption(&raw.map_err(|e| item_error(e.to_string()))?);
        if caption.is_empty() {
            return Err(item_error("empty caption".to_string()));
        }
        Ok(caption)
    }

    /// Move to `error`, release both models and report the cause
    async fn abort(&self, error: &PipelineError, total: usize) {
        tracing::error!(error = %error, phase = %self.current_phase(), "Batch aborted");
        *self.phase.write() = ProcessingPhase::Error;
        self.models.unload_all().await;
        self.reporter.report(
            ProcessingPhase::Error,
            0,
            total,
            format!("Indexing failed: {}", error),
        );
    }

    fn reset_phase(&self) {
        *self.phase.write() = ProcessingPhase::Idle;
    }

    fn enter(&self, to: ProcessingPhase) -> Result<(), PipelineError> {
        let mut phase = self.phase.write();
        let from = *phase;
        if !from.can_transition_to(to) {
            return Err(PipelineError::InvalidPhaseTransition { from, to });
        }
        tracing::debug!(%from, %to, "Phase transition");
        *phase = to;
        Ok(())
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
