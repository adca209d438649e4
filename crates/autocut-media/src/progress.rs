//! FFmpeg progress reporting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One `-progress` block from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as `HH:MM:SS.micro`
    pub out_time: String,
    /// Encoding speed relative to realtime
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percentage of an output of `total_secs` written so far.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_secs <= 0.0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / 1000.0) / total_secs * 100.0).clamp(0.0, 100.0)
    }
}

/// Receives encode percentages for the clip being rendered.
pub type PercentSink = Arc<dyn Fn(f64) + Send + Sync + 'static>;
