//! Progress reporting
//!
//! Turns a phase plus counters into a [`ProcessingProgress`] snapshot and
//! delivers it to:
//! - one registered observer callback (last registration wins)
//! - any number of event-stream subscribers (`tokio::sync::broadcast`)
//!
//! Reporting never blocks and never fails. Subscribers that fall behind lag
//! and skip snapshots instead of stalling the pipeline.

mod phase;


pub use phase::ProcessingPhase;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the progress event stream before slow subscribers lag
const EVENT_BUFFER: usize = 64;

/// Observer callback receiving every snapshot
pub type ProgressObserver = Arc<dyn Fn(&ProcessingProgress) + Send + Sync>;

/// Normalized progress snapshot. Rebuilt on every tick, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingProgress {
    pub phase: ProcessingPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,

    /// `round(100 * current / total)` when `total > 0`, otherwise 0. Capped at 100.
    pub percentage: u8,
}

impl ProcessingProgress {
    pub fn new(phase: ProcessingPhase, current: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            message: message.into(),
            percentage: percentage(current, total),
        }
    }
}

fn percentage(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (100.0 * current as f64 / total as f64).round();
    pct.min(100.0) as u8
}

struct ReporterInner {
    observer: RwLock<Option<ProgressObserver>>,
    events: broadcast::Sender<ProcessingProgress>,
}

/// Cheaply cloneable progress reporter shared by the pipeline and the
/// model lifecycle manager
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<ReporterInner>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(ReporterInner {
                observer: RwLock::new(None),
                events,
            }),
        }
    }

    /// Register the observer callback, replacing any previous one
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(&ProcessingProgress) + Send + Sync + 'static,
    {
        *self.inner.observer.write() = Some(Arc::new(observer));
    }

    /// Remove the observer callback
    pub fn clear_observer(&self) {
        *self.inner.observer.write() = None;
    }

    /// Open a new event stream receiving every subsequent snapshot
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingProgress> {
        self.inner.events.subscribe()
    }

    /// Build a snapshot and push it to the observer and the event stream
    pub fn report(
        &self,
        phase: ProcessingPhase,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> ProcessingProgress {
        let snapshot = ProcessingProgress::new(phase, current, total, message);

        tracing::trace!(
            phase = %snapshot.phase,
            current,
            total,
            percentage = snapshot.percentage,
            "{}",
            snapshot.message
        );

        // Clone the callback out so it never runs under the lock
        let observer = self.inner.observer.read().clone();
        if let Some(observer) = observer {
            observer(&snapshot);
        }

        // No subscribers is not an error
        let _ = self.inner.events.send(snapshot.clone());

        snapshot
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
