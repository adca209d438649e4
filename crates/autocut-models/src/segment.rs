//! Clip segment models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An unvalidated `(start, end)` proposal in seconds.
///
/// Candidates come from model text or from consecutive scene boundaries and
/// may be reversed, zero-length or entirely outside the source video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawCandidate {
    pub start: f64,
    pub end: f64,
}

impl RawCandidate {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Signed span; negative when the pair is reversed.
    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

impl From<(f64, f64)> for RawCandidate {
    fn from((start, end): (f64, f64)) -> Self {
        Self::new(start, end)
    }
}

/// A validated time range within the source video.
///
/// Invariant: `0 <= start < end <= total_duration` of the video it was planned
/// against. Segments are only constructed by the planner and are not mutated
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Segment {
    /// Build a segment, returning `None` when the bounds are not ordered or
    /// start before zero.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if start.is_finite() && end.is_finite() && start >= 0.0 && start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Exact identity of the bounds, used for deduplication.
    ///
    /// Two segments share a key only when both bounds are bit-identical; no
    /// floating-point tolerance is applied.
    pub fn key(&self) -> (u64, u64) {
        (self.start.to_bits(), self.end.to_bits())
    }

    /// Whether the segment lies inside `[0, total_duration]`.
    pub fn fits_within(&self, total_duration: f64) -> bool {
        self.start >= 0.0 && self.start < self.end && self.end <= total_duration
    }
}
