//! Model lifecycle manager
//!
//! Owns the captioner and embedder slots and implements:
//! - Mutual exclusion: at most one role resident, with a cooldown pause
//!   between unloading one role and loading the other (also when the
//!   unload was requested explicitly)
//! - Serialized loads: a caller arriving while a load is in flight waits for
//!   it and receives the same instance (or the same failure)
//! - Per-role loading state machine (Unloaded, Downloading, Initializing,
//!   Ready, Failed)

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::progress::{ProcessingPhase, ProgressReporter};

use super::capability::{CaptionModel, EmbeddingModel, ModelLifecycle, ModelProvider};
use super::config::ModelsConfig;
use super::error::{ModelError, ModelResult};

/// One of the two mutually exclusive resident model slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    Captioner,
    Embedder,
}

impl ModelRole {
    /// Pipeline phase under which this role's load progress is reported
    pub fn loading_phase(&self) -> ProcessingPhase {
        match self {
            ModelRole::Captioner => ProcessingPhase::LoadingVision,
            ModelRole::Embedder => ProcessingPhase::LoadingEmbedding,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::Captioner => "captioner",
            ModelRole::Embedder => "embedder",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a role in the loading pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelLoadingState {
    /// Nothing resident
    Unloaded,

    /// Weights are being fetched
    Downloading { progress: f32 },

    /// Weights are being loaded into memory
    Initializing,

    /// Resident and ready for inference
    Ready,

    /// Last load attempt failed; the slot is empty
    Failed { reason: String },
}

impl ModelLoadingState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelLoadingState::Ready)
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            ModelLoadingState::Downloading { .. } | ModelLoadingState::Initializing
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ModelLoadingState::Failed { .. })
    }
}

#[derive(Default)]
struct Slots {
    captioner: Option<Arc<dyn CaptionModel>>,
    embedder: Option<Arc<dyn EmbeddingModel>>,
    states: HashMap<ModelRole, ModelLoadingState>,
    /// Completed load attempts per role
    attempts: HashMap<ModelRole, u64>,
    /// Failure of the most recent attempt per role
    last_failure: HashMap<ModelRole, ModelError>,
    /// A model was released since the last load; the next load cools down first
    needs_settle: bool,
}

/// Loads, switches and unloads the captioner and embedder
pub struct ModelLifecycleManager {
    provider: Arc<dyn ModelProvider>,
    reporter: ProgressReporter,
    switch_cooldown: Duration,
    captioner_model_id: String,

    /// Serializes every load and unload
    transition: Mutex<()>,

    /// Resident handles and states; never held across an await
    slots: RwLock<Slots>,
}

impl ModelLifecycleManager {
    pub fn new(provider: Arc<dyn ModelProvider>, reporter: ProgressReporter, config: &ModelsConfig) -> Self {
        Self {
            provider,
            reporter,
            switch_cooldown: config.switch_cooldown(),
            captioner_model_id: config.captioner_model_id.clone(),
            transition: Mutex::new(()),
            slots: RwLock::new(Slots::default()),
        }
    }

    /// Captioner model id requested by default
    pub fn captioner_model_id(&self) -> &str {
        &self.captioner_model_id
    }

    /// Currently resident captioner, if any
    pub fn current_captioner(&self) -> Option<Arc<dyn CaptionModel>> {
        self.slots.read().captioner.clone()
    }

    /// Currently resident embedder, if any
    pub fn current_embedder(&self) -> Option<Arc<dyn EmbeddingModel>> {
        self.slots.read().embedder.clone()
    }

    /// Role currently holding memory
    pub fn resident_role(&self) -> Option<ModelRole> {
        let slots = self.slots.read();
        if slots.captioner.is_some() {
            Some(ModelRole::Captioner)
        } else if slots.embedder.is_some() {
            Some(ModelRole::Embedder)
        } else {
            None
        }
    }

    /// Loading state of a role
    pub fn role_state(&self, role: ModelRole) -> ModelLoadingState {
        self.slots
            .read()
            .states
            .get(&role)
            .cloned()
            .unwrap_or(ModelLoadingState::Unloaded)
    }

    /// Load the captioner `model_id`, unloading the embedder (or a different
    /// captioner) first
    pub async fn load_captioner(&self, model_id: &str) -> ModelResult<Arc<dyn CaptionModel>> {
        if let Some(captioner) = self.resident_captioner(model_id) {
            return Ok(captioner);
        }

        let seen = self.attempt_marker(ModelRole::Captioner);
        let _guard = self.transition.lock().await;

        if let Some(captioner) = self.resident_captioner(model_id) {
            tracing::debug!(model_id, "Joined in-flight captioner load");
            return Ok(captioner);
        }
        if let Some(failure) = self.joined_failure(ModelRole::Captioner, seen) {
            return Err(failure);
        }

        let previous_embedder = self.slots.write().embedder.take();
        if let Some(embedder) = previous_embedder {
            self.release(ModelRole::Embedder, embedder.as_ref()).await;
        }
        let previous_captioner = self.slots.write().captioner.take();
        if let Some(captioner) = previous_captioner {
            tracing::info!(
                from = captioner.model_id(),
                to = model_id,
                "Switching captioner model"
            );
            self.release(ModelRole::Captioner, captioner.as_ref()).await;
        }
        self.cool_down().await;

        let captioner = self.provider.captioner(model_id);
        self.bring_up(ModelRole::Captioner, captioner.as_ref()).await?;
        self.slots.write().captioner = Some(captioner.clone());

        Ok(captioner)
    }

    /// Load the embedder, unloading the captioner first.
    ///
    /// Idempotent: returns the resident instance when already loaded, and
    /// concurrent callers share a single initialization.
    pub async fn load_embedder(&self) -> ModelResult<Arc<dyn EmbeddingModel>> {
        if let Some(embedder) = self.current_embedder() {
            return Ok(embedder);
        }

        let seen = self.attempt_marker(ModelRole::Embedder);
        let _guard = self.transition.lock().await;

        if let Some(embedder) = self.current_embedder() {
            tracing::debug!("Joined in-flight embedder load");
            return Ok(embedder);
        }
        if let Some(failure) = self.joined_failure(ModelRole::Embedder, seen) {
            return Err(failure);
        }

        let previous_captioner = self.slots.write().captioner.take();
        if let Some(captioner) = previous_captioner {
            self.release(ModelRole::Captioner, captioner.as_ref()).await;
        }
        self.cool_down().await;

        let embedder = self.provider.embedder();
        self.bring_up(ModelRole::Embedder, embedder.as_ref()).await?;
        self.slots.write().embedder = Some(embedder.clone());

        Ok(embedder)
    }

    /// Unload the captioner. No-op when absent.
    pub async fn unload_captioner(&self) {
        let _guard = self.transition.lock().await;
        let captioner = self.slots.write().captioner.take();
        if let Some(captioner) = captioner {
            self.release(ModelRole::Captioner, captioner.as_ref()).await;
        }
    }

    /// Unload the embedder. No-op when absent.
    pub async fn unload_embedder(&self) {
        let _guard = self.transition.lock().await;
        let embedder = self.slots.write().embedder.take();
        if let Some(embedder) = embedder {
            self.release(ModelRole::Embedder, embedder.as_ref()).await;
        }
    }

    /// Unload both roles. No-op for absent roles.
    pub async fn unload_all(&self) {
        let _guard = self.transition.lock().await;
        let (captioner, embedder) = {
            let mut slots = self.slots.write();
            (slots.captioner.take(), slots.embedder.take())
        };
        if let Some(captioner) = captioner {
            self.release(ModelRole::Captioner, captioner.as_ref()).await;
        }
        if let Some(embedder) = embedder {
            self.release(ModelRole::Embedder, embedder.as_ref()).await;
        }
    }

    fn resident_captioner(&self, model_id: &str) -> Option<Arc<dyn CaptionModel>> {
        self.slots
            .read()
            .captioner
            .as_ref()
            .filter(|c| c.model_id() == model_id)
            .cloned()
    }

    fn attempt_marker(&self, role: ModelRole) -> u64 {
        self.slots.read().attempts.get(&role).copied().unwrap_or(0)
    }

    /// Failure of a load attempt that completed while the caller was waiting
    fn joined_failure(&self, role: ModelRole, seen: u64) -> Option<ModelError> {
        let slots = self.slots.read();
        let attempts = slots.attempts.get(&role).copied().unwrap_or(0);
        if attempts == seen {
            return None;
        }
        slots.last_failure.get(&role).cloned()
    }

    fn set_state(&self, role: ModelRole, state: ModelLoadingState) {
        self.slots.write().states.insert(role, state);
    }

    fn finish_attempt(&self, role: ModelRole, failure: Option<ModelError>) {
        let mut slots = self.slots.write();
        *slots.attempts.entry(role).or_insert(0) += 1;
        match failure {
            Some(failure) => {
                slots.states.insert(
                    role,
                    ModelLoadingState::Failed {
                        reason: failure.to_string(),
                    },
                );
                slots.last_failure.insert(role, failure);
            }
            None => {
                slots.states.insert(role, ModelLoadingState::Ready);
                slots.last_failure.remove(&role);
            }
        }
    }

    /// Download then initialize a fresh instance. The caller stores the
    /// handle only after this succeeds.
    async fn bring_up<M>(&self, role: ModelRole, model: &M) -> ModelResult<()>
    where
        M: ModelLifecycle + ?Sized,
    {
        let phase = role.loading_phase();
        tracing::info!(%role, model_id = model.model_id(), "Loading model");

        self.set_state(role, ModelLoadingState::Downloading { progress: 0.0 });
        self.reporter
            .report(phase, 0, 100, format!("Downloading {} model", role));

        let reporter = self.reporter.clone();
        let slots = &self.slots;
        let on_progress = move |fraction: f32| {
            let fraction = fraction.clamp(0.0, 1.0);
            slots
                .write()
                .states
                .insert(role, ModelLoadingState::Downloading { progress: fraction });
            let pct = (fraction * 100.0).round() as usize;
            reporter.report(phase, pct, 100, format!("Downloading {} model ({}%)", role, pct));
        };

        if let Err(cause) = model.download(&on_progress).await {
            tracing::warn!(%role, error = %cause, "Model download failed");
            let failure = ModelError::LoadFailure { role, cause };
            self.finish_attempt(role, Some(failure.clone()));
            return Err(failure);
        }
        self.reporter
            .report(phase, 100, 100, format!("Downloaded {} model", role));

        self.set_state(role, ModelLoadingState::Initializing);
        self.reporter
            .report(phase, 0, 1, format!("Initializing {} model", role));

        if let Err(cause) = model.init().await {
            tracing::warn!(%role, error = %cause, "Model initialization failed");
            if let Err(e) = model.destroy().await {
                tracing::debug!(%role, error = %e, "Cleanup after failed init also failed");
            }
            let failure = ModelError::LoadFailure { role, cause };
            self.finish_attempt(role, Some(failure.clone()));
            return Err(failure);
        }

        self.finish_attempt(role, None);
        self.reporter
            .report(phase, 1, 1, format!("{} model ready", role));
        tracing::info!(%role, model_id = model.model_id(), "Model ready");

        Ok(())
    }

    /// Destroy an instance already removed from its slot
    async fn release<M>(&self, role: ModelRole, model: &M)
    where
        M: ModelLifecycle + ?Sized,
    {
        if let Err(e) = model.destroy().await {
            tracing::warn!(%role, error = %e, "Model destroy failed, dropping handle anyway");
        }
        {
            let mut slots = self.slots.write();
            slots.states.insert(role, ModelLoadingState::Unloaded);
            slots.needs_settle = true;
        }
        tracing::info!(%role, model_id = model.model_id(), "Unloaded model");
    }

    /// Pause after a release so the device settles before the next load.
    /// No-op when nothing was released since the previous load.
    async fn cool_down(&self) {
        let pending = std::mem::take(&mut self.slots.write().needs_settle);
        if !pending || self.switch_cooldown.is_zero() {
            return;
        }
        tracing::debug!(
            cooldown_ms = self.switch_cooldown.as_millis() as u64,
            "Waiting for device to settle after model switch"
        );
        tokio::time::sleep(self.switch_cooldown).await;
    }
}
