//! Single-flight, latest-wins query execution
//!
//! At most one query runs against the corpus. A query arriving while another
//! runs takes the single pending slot, displacing any query already waiting
//! there. Displaced callers receive an empty result once the running query
//! finishes; the pending query then runs next.
//!
//! After `shutdown` every query resolves empty without touching the models.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};

use crate::core::types::SearchResult;
use crate::models::ModelLifecycleManager;
use crate::store::FileStore;

use super::config::SearchConfig;
use super::error::SearchError;
use super::scoring::HybridScorer;

struct PendingQuery {
    query: String,
    reply: oneshot::Sender<Vec<SearchResult>>,
}

#[derive(Default)]
struct Queue {
    running: bool,
    closed: bool,
    pending: Option<PendingQuery>,
    superseded: Vec<oneshot::Sender<Vec<SearchResult>>>,
}

struct Inner {
    models: Arc<ModelLifecycleManager>,
    store: Arc<dyn FileStore>,
    scorer: HybridScorer,
    queue: Mutex<Queue>,
    idle: Notify,
}

/// Serializes and ranks natural-language queries
#[derive(Clone)]
pub struct SearchCoordinator {
    inner: Arc<Inner>,
}

impl SearchCoordinator {
    pub fn new(models: Arc<ModelLifecycleManager>, store: Arc<dyn FileStore>, config: SearchConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                models,
                store,
                scorer: HybridScorer::new(config),
                queue: Mutex::new(Queue::default()),
                idle: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        self.inner.scorer.config()
    }

    /// Run a query and return at most K results, best first.
    ///
    /// Never fails: empty queries, superseded queries and any failure while
    /// scoring all produce an empty result.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let (reply, receiver) = oneshot::channel();
        let request = PendingQuery {
            query: query.to_string(),
            reply,
        };

        let start = {
            let mut queue = self.inner.queue.lock();
            if queue.closed {
                return Vec::new();
            }
            if queue.running {
                if let Some(displaced) = queue.pending.replace(request) {
                    tracing::debug!(query = %displaced.query, "Queued query superseded");
                    queue.superseded.push(displaced.reply);
                }
                None
            } else {
                queue.running = true;
                Some(request)
            }
        };

        // Queries run on a detached worker so a dropped caller never stalls the queue
        if let Some(first) = start {
            tokio::spawn(self.inner.clone().drain(first));
        }

        receiver.await.unwrap_or_default()
    }

    /// Query waiting for the running one to finish, if any
    pub fn queued_query(&self) -> Option<String> {
        self.inner
            .queue
            .lock()
            .pending
            .as_ref()
            .map(|p| p.query.clone())
    }

    /// Whether a query is executing
    pub fn is_running(&self) -> bool {
        self.inner.queue.lock().running
    }

    /// Stop accepting queries and wait for the running one to finish.
    ///
    /// The queued query is dropped and its caller, like any caller arriving
    /// later, gets an empty result.
    pub async fn shutdown(&self) {
        let orphaned = {
            let mut queue = self.inner.queue.lock();
            queue.closed = true;
            let mut orphaned = std::mem::take(&mut queue.superseded);
            orphaned.extend(queue.pending.take().map(|p| p.reply));
            orphaned
        };
        for reply in orphaned {
            let _ = reply.send(Vec::new());
        }

        loop {
            let idle = self.inner.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if !self.is_running() {
                break;
            }
            idle.await;
        }
        tracing::debug!("Search coordinator closed");
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.queue.lock().closed
    }
}

impl Inner {
    async fn drain(self: Arc<Self>, first: PendingQuery) {
        let mut next = first;
        loop {
            let results = self.execute(&next.query).await;
            // The caller may have gone away
            let _ = next.reply.send(results);

            let (superseded, pending) = {
                let mut queue = self.queue.lock();
                let superseded = std::mem::take(&mut queue.superseded);
                let pending = queue.pending.take();
                if pending.is_none() {
                    queue.running = false;
                }
                (superseded, pending)
            };

            for reply in superseded {
                let _ = reply.send(Vec::new());
            }

            match pending {
                Some(pending) => next = pending,
                None => {
                    self.idle.notify_waiters();
                    break;
                }
            }
        }
    }

    async fn execute(&self, query: &str) -> Vec<SearchResult> {
        match self.try_execute(query).await {
            Ok(results) => {
                tracing::debug!(query, results = results.len(), "Search complete");
                results
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "Search failed, returning no results");
                Vec::new()
            }
        }
    }

    async fn try_execute(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let embedder = self.models.load_embedder().await?;
        let embedding = embedder
            .embed(query)
            .await
            .map_err(SearchError::QueryEmbedding)?;
        let corpus = self.store.fetch_corpus().await?;

        Ok(self
            .scorer
            .rank(query, &embedding, embedder.model_id(), corpus))
    }
}
