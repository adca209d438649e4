//! Job progress events and cancellable long-running calls.

use std::future::Future;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Downloading,
    Probing,
    ExtractingAudio,
    Transcribing,
    Planning,
    DetectingScenes,
    GeneratingTitle,
    Rendering,
    Done,
}

/// Progress event emitted while a job runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Stage { stage: Stage },
    /// Work of unknown length is running; no percentage is available.
    Indeterminate { label: String },
    ClipStarted { index: usize, total: usize },
    ClipFinished { index: usize, path: String },
    ClipFailed { index: usize, error: String },
    /// Encode progress of the current clip, 0-100.
    EncodePercent { index: usize, percent: f64 },
}

/// Non-blocking progress sender. Events are dropped when no one listens or
/// the channel is full.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Reporter that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Reporter plus the receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }

    pub fn stage(&self, stage: Stage) {
        debug!(?stage, "Stage");
        self.send(ProgressEvent::Stage { stage });
    }

    pub fn indeterminate(&self, label: impl Into<String>) {
        self.send(ProgressEvent::Indeterminate {
            label: label.into(),
        });
    }

    pub fn clip_started(&self, index: usize, total: usize) {
        self.send(ProgressEvent::ClipStarted { index, total });
    }

    pub fn clip_finished(&self, index: usize, path: impl Into<String>) {
        self.send(ProgressEvent::ClipFinished {
            index,
            path: path.into(),
        });
    }

    pub fn clip_failed(&self, index: usize, error: impl Into<String>) {
        self.send(ProgressEvent::ClipFailed {
            index,
            error: error.into(),
        });
    }

    pub fn encode_percent(&self, index: usize, percent: f64) {
        self.send(ProgressEvent::EncodePercent {
            index,
            percent: percent.clamp(0.0, 100.0),
        });
    }
}

/// Run `fut` on its own task and race it against `cancel`.
///
/// When cancellation wins the task is aborted and `Cancelled` is returned, so
/// whatever is displaying progress can be torn down without waiting for the
/// call to finish.
pub async fn run_cancellable<F, T>(fut: F, cancel: Option<watch::Receiver<bool>>) -> WorkerResult<T>
where
    F: Future<Output = WorkerResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::spawn(fut);

    let Some(mut cancel) = cancel else {
        return handle
            .await
            .map_err(|e| WorkerError::job_failed(format!("task failed: {}", e)))?;
    };

    if *cancel.borrow() {
        handle.abort();
        return Err(WorkerError::Cancelled);
    }

    loop {
        tokio::select! {
            joined = &mut handle => {
                return joined.map_err(|e| WorkerError::job_failed(format!("task failed: {}", e)))?;
            }
            changed = cancel.changed() => {
                if changed.is_err() {
                    // Sender gone; cancellation can no longer arrive
                    return handle
                        .await
                        .map_err(|e| WorkerError::job_failed(format!("task failed: {}", e)))?;
                }
                if *cancel.borrow() {
                    handle.abort();
                    return Err(WorkerError::Cancelled);
                }
            }
        }
    }
}
