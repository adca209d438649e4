//! Structured job logging.
//!
//! Every line a job emits carries its id, operation and mode, so one job can
//! be followed through a JSON log stream with a single filter.

use std::time::Instant;

use autocut_media::VideoInfo;
use autocut_models::{format_segment, JobId, JobMode, Operation, Segment};
use autocut_planner::PlanOutcome;
use tracing::{error, info, warn, Span};

use crate::error::WorkerError;

/// Job lifecycle logger.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
    mode: Option<&'static str>,
    started: Instant,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: Operation) -> Self {
        Self::named(job_id, operation.as_str())
    }

    /// Logger for an operation name the worker does not recognise.
    pub fn unrecognised(job_id: &JobId, operation: &str) -> Self {
        Self::named(job_id, operation)
    }

    fn named(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
            mode: None,
            started: Instant::now(),
        }
    }

    /// Tag every line with the planning mode. Only meaningful for `process_video`.
    pub fn with_mode(mut self, mode: JobMode) -> Self {
        self.mode = Some(mode.as_str());
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn mode(&self) -> &str {
        self.mode.unwrap_or("-")
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Span for the whole job; nested logs inherit its fields.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation,
            mode = self.mode()
        )
    }

    pub fn started(&self) {
        info!(job_id = %self.job_id, operation = %self.operation, mode = self.mode(), "Job started");
    }

    pub fn source_probed(&self, info: &VideoInfo) {
        info!(
            job_id = %self.job_id,
            duration = info.duration,
            width = info.width,
            height = info.height,
            has_audio = info.has_audio,
            "Source probed"
        );
    }

    pub fn planned(&self, outcome: &PlanOutcome) {
        info!(
            job_id = %self.job_id,
            source = outcome.source.as_str(),
            count = outcome.len(),
            dropped = outcome.dropped.total(),
            segments = %segment_list(&outcome.segments),
            "Segments planned"
        );
    }

    pub fn warnings(&self, warnings: &[String]) {
        for warning in warnings {
            warn!(job_id = %self.job_id, operation = %self.operation, "{}", warning);
        }
    }

    pub fn completed(&self) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            elapsed_ms = self.elapsed_ms(),
            "Job completed"
        );
    }

    pub fn failed(&self, err: &WorkerError) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            elapsed_ms = self.elapsed_ms(),
            cancelled = err.is_cancelled(),
            retryable = err.is_retryable(),
            error = %err,
            "Job failed"
        );
    }
}

/// `HH:MM:SS-HH:MM:SS` ranges joined for a single log field.
pub fn segment_list(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "none".to_string();
    }
    segments
        .iter()
        .map(format_segment)
        .collect::<Vec<_>>()
        .join(", ")
}
