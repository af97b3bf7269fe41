//! Engine context
//!
//! Built once at startup and shared by handle. Owns the store, the progress
//! reporter, the model lifecycle manager, the indexing pipeline and the
//! search coordinator, wiring them to the same collaborators.
//!
//! Logging is opt-in: call [`Engine::with_logging`] to install the subscriber
//! described by `config.logging`, or install one in the host beforehand.

use std::sync::Arc;

use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{SearchResult, SelectedFile};
use crate::extract::{FileTextExtractor, TextExtractor};
use crate::logging::LoggingSystem;
use crate::models::{ModelLifecycleManager, ModelProvider};
use crate::pipeline::{ContentResolver, FsContentResolver, IndexReport, IndexingPipeline};
use crate::progress::{ProcessingPhase, ProgressReporter};
use crate::search::SearchCoordinator;
use crate::store::{create_database_pool, FileStore, SqliteFileStore};

/// External collaborators the engine drives
#[derive(Clone)]
pub struct EngineCollaborators {
    pub provider: Arc<dyn ModelProvider>,
    pub extractor: Arc<dyn TextExtractor>,
    pub resolver: Arc<dyn ContentResolver>,
}

impl EngineCollaborators {
    /// Use the given model provider with file-backed extraction and resolution
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            extractor: Arc::new(FileTextExtractor::new()),
            resolver: Arc::new(FsContentResolver),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

pub struct Engine {
    config: EngineConfig,
    reporter: ProgressReporter,
    models: Arc<ModelLifecycleManager>,
    store: Arc<dyn FileStore>,
    pipeline: IndexingPipeline,
    search: SearchCoordinator,
    logging: Option<LoggingSystem>,
}

impl Engine {
    /// Validate the configuration, open the SQLite store and build the engine
    pub async fn open(config: EngineConfig, collaborators: EngineCollaborators) -> Result<Self> {
        config.validate()?;

        let pool = create_database_pool(&config.database).await?;
        let store = SqliteFileStore::new(pool).await?;

        tracing::info!(db = ?config.database.db_path, "Engine opened");

        Ok(Self::with_store(config, collaborators, Arc::new(store)))
    }

    /// Build the engine over an existing store
    pub fn with_store(
        config: EngineConfig,
        collaborators: EngineCollaborators,
        store: Arc<dyn FileStore>,
    ) -> Self {
        let reporter = ProgressReporter::new();
        let models = Arc::new(ModelLifecycleManager::new(
            collaborators.provider,
            reporter.clone(),
            &config.models,
        ));
        let pipeline = IndexingPipeline::new(
            models.clone(),
            store.clone(),
            collaborators.extractor,
            collaborators.resolver,
            reporter.clone(),
            config.pipeline.clone(),
        );
        let search = SearchCoordinator::new(models.clone(), store.clone(), config.search.clone());

        Self {
            config,
            reporter,
            models,
            store,
            pipeline,
            search,
            logging: None,
        }
    }

    /// Install the global subscriber from `config.logging` and keep its
    /// writer guards alive for the engine's lifetime.
    pub fn with_logging(mut self) -> Result<Self> {
        let system = LoggingSystem::init(self.config.logging.clone())?;
        self.logging = Some(system);
        Ok(self)
    }

    /// Logging system installed by [`Engine::with_logging`], if any
    pub fn logging(&self) -> Option<&LoggingSystem> {
        self.logging.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Index a batch of files. See [`IndexingPipeline::index_files`].
    pub async fn index_files(&self, files: Vec<SelectedFile>) -> Result<IndexReport> {
        Ok(self.pipeline.index_files(files).await?)
    }

    /// Ranked search over everything indexed so far. Never fails.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search.search(query).await
    }

    /// Progress reporter for observer registration and event subscriptions
    pub fn progress(&self) -> &ProgressReporter {
        &self.reporter
    }

    pub fn models(&self) -> &Arc<ModelLifecycleManager> {
        &self.models
    }

    pub fn current_phase(&self) -> ProcessingPhase {
        self.pipeline.current_phase()
    }

    pub async fn file_count(&self) -> Result<i64> {
        Ok(self.store.count_files().await?)
    }

    /// Reject new batches and queries, let running work finish, then release
    /// both models
    pub async fn shutdown(&self) {
        tracing::info!("Engine shutting down");
        self.pipeline.shutdown();
        self.search.shutdown().await;
        self.pipeline.wait_idle().await;
        self.models.unload_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::EngineError;
    use crate::pipeline::PipelineError;
    use crate::testing::{FakeExtractor, FakeProvider};
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> EngineConfig {
        let mut config = EngineConfig::default().with_data_dir(dir.path());
        config.models = config.models.without_cooldown();
        config.pipeline = config.pipeline.without_cooldowns();
        config
    }

    async fn open_engine(dir: &TempDir, provider: &FakeProvider) -> Engine {
        let extractor = FakeExtractor::new().with_text(
            "/docs/recipe.txt",
            "Slow cooked tomato soup with basil and garlic",
        );
        let collaborators =
            EngineCollaborators::new(provider.clone().shared()).with_extractor(Arc::new(extractor));
        Engine::open(test_config(dir), collaborators).await.unwrap()
    }

    #[tokio::test]
    async fn test_index_then_search() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        let engine = open_engine(&dir, &provider).await;

        let report = engine
            .index_files(vec![
                SelectedFile::document("/docs/recipe.txt", "recipe.txt"),
                SelectedFile::document("/docs/Tax_Return_2023.pdf", "Tax_Return_2023.pdf"),
            ])
            .await
            .unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(engine.file_count().await.unwrap(), 2);
        assert_eq!(engine.current_phase(), ProcessingPhase::Complete);

        let results = engine.search("tomato soup").await;
        assert_eq!(results[0].record.filename, "recipe.txt");

        // The embedder left resident by indexing serves the search
        assert_eq!(provider.stats.inits(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_unloads_and_rejects() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        let engine = open_engine(&dir, &provider).await;
        engine
            .index_files(vec![SelectedFile::document("/docs/recipe.txt", "recipe.txt")])
            .await
            .unwrap();

        engine.shutdown().await;

        assert!(engine.models().resident_role().is_none());
        let result = engine
            .index_files(vec![SelectedFile::document("/docs/recipe.txt", "recipe.txt")])
            .await;
        assert!(matches!(
            result,
            Err(EngineError::Pipeline(PipelineError::ShuttingDown))
        ));
    }

    #[tokio::test]
    async fn test_search_after_shutdown_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        let engine = open_engine(&dir, &provider).await;
        engine
            .index_files(vec![SelectedFile::document("/docs/recipe.txt", "recipe.txt")])
            .await
            .unwrap();
        assert_eq!(engine.search("tomato").await.len(), 1);

        engine.shutdown().await;

        assert!(engine.search("tomato").await.is_empty());
        assert!(engine.models().resident_role().is_none());
        assert_eq!(provider.stats.inits(), 1);
    }

    #[tokio::test]
    async fn test_with_logging_rejects_bad_directive() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config
            .logging
            .module_levels
            .insert("neural_index=".to_string(), crate::logging::LogLevel::Debug);
        let engine = Engine::open(config, EngineCollaborators::new(FakeProvider::new().shared()))
            .await
            .unwrap();

        let result = engine.with_logging();
        assert!(matches!(result, Err(EngineError::Logging(_))));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.search.top_k = 0;

        let result = Engine::open(config, EngineCollaborators::new(FakeProvider::new().shared())).await;
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_progress_observer_receives_batch_updates() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        let engine = open_engine(&dir, &provider).await;
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        engine
            .progress()
            .set_observer(move |p| sink.lock().push(p.phase));

        engine
            .index_files(vec![SelectedFile::document("/docs/recipe.txt", "recipe.txt")])
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.first(), Some(&ProcessingPhase::Selecting));
        assert_eq!(seen.last(), Some(&ProcessingPhase::Complete));
    }
}
