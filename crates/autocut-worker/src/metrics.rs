//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_TOTAL: &str = "autocut_jobs_total";
    pub const SEGMENTS_PLANNED_TOTAL: &str = "autocut_segments_planned_total";
    pub const CLIPS_RENDERED_TOTAL: &str = "autocut_clips_rendered_total";
    pub const CLIPS_FAILED_TOTAL: &str = "autocut_clips_failed_total";
    pub const ENCODER_FALLBACKS_TOTAL: &str = "autocut_encoder_fallbacks_total";
    pub const RENDER_DURATION_SECONDS: &str = "autocut_render_duration_seconds";
    pub const LLM_REQUESTS_TOTAL: &str = "autocut_llm_requests_total";
}

/// Serve metrics on `addr` (`host:port`).
pub fn install_exporter(addr: &str) -> WorkerResult<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| WorkerError::config_error(format!("METRICS_ADDR '{}': {}", addr, e)))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("Prometheus exporter: {}", e)))
}

pub fn record_job(operation: &str, outcome: &'static str) {
    counter!(
        names::JOBS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_plan(source: &'static str, segments: usize) {
    counter!(names::SEGMENTS_PLANNED_TOTAL, "source" => source).increment(segments as u64);
}

pub fn record_clip_rendered(encoder: &'static str, fallback_used: bool, duration_secs: f64) {
    counter!(names::CLIPS_RENDERED_TOTAL, "encoder" => encoder).increment(1);
    if fallback_used {
        counter!(names::ENCODER_FALLBACKS_TOTAL).increment(1);
    }
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

pub fn record_clip_failed() {
    counter!(names::CLIPS_FAILED_TOTAL).increment(1);
}

pub fn record_llm_request(model: &str, success: bool) {
    counter!(
        names::LLM_REQUESTS_TOTAL,
        "model" => model.to_string(),
        "success" => if success { "true" } else { "false" }
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            install_exporter("not an address"),
            Err(WorkerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_plan("proposals", 3);
        record_clip_rendered("software", true, 12.5);
        record_clip_failed();
    }
}
