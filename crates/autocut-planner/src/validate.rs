//! Candidate validation, deduplication and count limiting.

use std::collections::HashSet;

use autocut_models::{PlannerConfig, RawCandidate, Segment};
use tracing::debug;

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Unclamped duration outside `[min_duration, max_duration]`
    Duration,
    /// Starts at or after the end of the source
    Position,
    /// Non-finite or negative bounds that survived the other checks
    Malformed,
}

/// Validate one candidate against `config`.
///
/// The duration window is checked against the unclamped end, then the start
/// position, and only then is the end clamped to `total_duration`. A candidate
/// whose clamped duration drops below `min_duration` is still accepted.
pub fn validate_candidate(
    candidate: &RawCandidate,
    config: &PlannerConfig,
) -> Result<Segment, Rejection> {
    let duration = candidate.span();
    if duration < config.min_duration || duration > config.max_duration {
        return Err(Rejection::Duration);
    }
    if candidate.start >= config.total_duration {
        return Err(Rejection::Position);
    }

    let end = candidate.end.min(config.total_duration);
    Segment::new(candidate.start, end).ok_or(Rejection::Malformed)
}

/// Validate all candidates in order, calling `on_reject` for each drop.
pub fn validate_all<F>(
    candidates: &[RawCandidate],
    config: &PlannerConfig,
    mut on_reject: F,
) -> Vec<Segment>
where
    F: FnMut(Rejection),
{
    candidates
        .iter()
        .filter_map(|candidate| match validate_candidate(candidate, config) {
            Ok(segment) => Some(segment),
            Err(reason) => {
                debug!(
                    start = candidate.start,
                    end = candidate.end,
                    reason = ?reason,
                    "Dropped candidate"
                );
                on_reject(reason);
                None
            }
        })
        .collect()
}

/// Remove exact duplicates, keeping the first occurrence.
pub fn dedup(segments: Vec<Segment>) -> Vec<Segment> {
    let mut seen = HashSet::with_capacity(segments.len());
    segments
        .into_iter()
        .filter(|segment| seen.insert(segment.key()))
        .collect()
}

/// Keep the first `max_segment_count` segments.
pub fn limit(mut segments: Vec<Segment>, max_segment_count: usize) -> Vec<Segment> {
    segments.truncate(max_segment_count);
    segments
}
