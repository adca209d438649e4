//! SegmentPlanner: candidate source to final clip list.

use autocut_models::{PlannerConfig, RawCandidate, Segment};
use serde::Serialize;
use tracing::{debug, info};

use crate::extract::{BracketedPairExtractor, TimestampExtractor};
use crate::fallback::fallback_segments;
use crate::scenes::boundary_candidates;
use crate::schedule::Schedule;
use crate::validate::{dedup, limit, validate_all, Rejection};

/// Where the planned segments came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Timestamps proposed by the language model
    Proposals,
    /// Consecutive scene-change boundaries
    SceneBoundaries,
    /// A user-chosen cut schedule
    Schedule,
    /// Even tiling after every candidate was rejected
    Fallback,
    /// Nothing usable
    Empty,
}

impl PlanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSource::Proposals => "proposals",
            PlanSource::SceneBoundaries => "scene_boundaries",
            PlanSource::Schedule => "schedule",
            PlanSource::Fallback => "fallback",
            PlanSource::Empty => "empty",
        }
    }
}

/// How many candidates were dropped, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub duration: usize,
    pub position: usize,
    pub malformed: usize,
    pub duplicate: usize,
    pub over_limit: usize,
}

impl DropCounts {
    fn record(&mut self, reason: Rejection) {
        match reason {
            Rejection::Duration => self.duration += 1,
            Rejection::Position => self.position += 1,
            Rejection::Malformed => self.malformed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.duration + self.position + self.malformed + self.duplicate + self.over_limit
    }
}

/// Result of one planning call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    /// Ordered, deduplicated, bounded segments
    pub segments: Vec<Segment>,
    pub source: PlanSource,
    pub dropped: DropCounts,
    /// Number of raw candidates seen before filtering
    pub candidates: usize,
}

impl PlanOutcome {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

/// Input accepted by [`SegmentPlanner::plan`].
#[derive(Debug, Clone, Copy)]
pub enum PlanInput<'a> {
    /// Free-form language-model response
    Text(&'a str),
    /// Already-extracted proposals
    Candidates(&'a [RawCandidate]),
    /// Ordered scene-change timestamps
    Boundaries(&'a [f64]),
    /// User-chosen schedule
    Schedule(Schedule),
}

/// Turns candidate sources into a validated clip list.
///
/// Every call is independent and never fails. Text and candidate inputs fall
/// back to even tiling when nothing survives validation and the source is
/// longer than `min_duration`; scene boundaries and schedules do not.
#[derive(Debug, Clone, Default)]
pub struct SegmentPlanner<E = BracketedPairExtractor> {
    extractor: E,
}

impl SegmentPlanner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: TimestampExtractor> SegmentPlanner<E> {
    /// Use a different text parser.
    pub fn with_extractor(extractor: E) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn plan(&self, input: PlanInput<'_>, config: &PlannerConfig) -> PlanOutcome {
        match input {
            PlanInput::Text(text) => self.plan_text(text, config),
            PlanInput::Candidates(candidates) => self.plan_candidates(candidates, config),
            PlanInput::Boundaries(boundaries) => self.plan_boundaries(boundaries, config),
            PlanInput::Schedule(schedule) => self.plan_schedule(&schedule, config),
        }
    }

    /// Plan from a language-model response.
    pub fn plan_text(&self, text: &str, config: &PlannerConfig) -> PlanOutcome {
        let candidates = self.extractor.extract(text);
        if candidates.is_empty() {
            debug!(text_len = text.len(), "No timestamps found in model response");
        }
        self.plan_candidates(&candidates, config)
    }

    /// Plan from proposals, tiling the source when none survive.
    pub fn plan_candidates(&self, candidates: &[RawCandidate], config: &PlannerConfig) -> PlanOutcome {
        let mut dropped = DropCounts::default();
        let valid = validate_all(candidates, config, |reason| dropped.record(reason));

        let (segments, source) = if valid.is_empty() {
            let tiles = fallback_segments(config);
            if !tiles.is_empty() {
                info!(
                    candidates = candidates.len(),
                    total_duration = config.total_duration,
                    segments = tiles.len(),
                    "No valid proposals, using even tiling"
                );
            }
            (tiles, PlanSource::Fallback)
        } else {
            (valid, PlanSource::Proposals)
        };

        finish(segments, source, dropped, candidates.len(), config)
    }

    /// Plan from scene-change boundaries.
    pub fn plan_boundaries(&self, boundaries: &[f64], config: &PlannerConfig) -> PlanOutcome {
        let candidates = boundary_candidates(boundaries, config.total_duration);
        let mut dropped = DropCounts::default();
        let valid = validate_all(&candidates, config, |reason| dropped.record(reason));
        finish(valid, PlanSource::SceneBoundaries, dropped, candidates.len(), config)
    }

    /// Plan from a fixed or sequential schedule. Only dedup and the count cap
    /// apply; the duration window does not.
    pub fn plan_schedule(&self, schedule: &Schedule, config: &PlannerConfig) -> PlanOutcome {
        let segments = schedule.segments(config.total_duration);
        let candidates = segments.len();
        finish(segments, PlanSource::Schedule, DropCounts::default(), candidates, config)
    }
}

fn finish(
    segments: Vec<Segment>,
    source: PlanSource,
    mut dropped: DropCounts,
    candidates: usize,
    config: &PlannerConfig,
) -> PlanOutcome {
    let before_dedup = segments.len();
    let unique = dedup(segments);
    dropped.duplicate = before_dedup - unique.len();

    let before_limit = unique.len();
    let segments = limit(unique, config.max_segment_count);
    dropped.over_limit = before_limit - segments.len();

    let source = if segments.is_empty() {
        PlanSource::Empty
    } else {
        source
    };

    debug!(
        source = source.as_str(),
        candidates,
        segments = segments.len(),
        dropped = dropped.total(),
        "Planned segments"
    );

    PlanOutcome {
        segments,
        source,
        dropped,
        candidates,
    }
}

/// Plan from a language-model response with the default extractor.
pub fn plan(text: &str, config: &PlannerConfig) -> Vec<Segment> {
    SegmentPlanner::new().plan_text(text, config).segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_text_keeps_only_valid() {
        let config = PlannerConfig::viral_proposals(200.0);
        let outcome = SegmentPlanner::new()
            .plan_text("blah [10-80], [90-85], [9999-10010], [250-330]", &config);
        assert_eq!(outcome.segments, vec![Segment::new(10.0, 80.0).unwrap()]);
        assert_eq!(outcome.source, PlanSource::Proposals);
        assert_eq!(outcome.candidates, 4);
        // [9999-10010] spans 11s, so the duration check rejects it first
        assert_eq!(outcome.dropped.duration, 2);
        assert_eq!(outcome.dropped.position, 1);
    }

    #[test]
    fn test_fallback_when_nothing_parses() {
        let config = PlannerConfig::viral_proposals(600.0);
        let outcome = SegmentPlanner::new().plan_text("no timestamps here", &config);
        assert_eq!(outcome.source, PlanSource::Fallback);
        assert_eq!(outcome.len(), 5);
    }

    #[test]
    fn test_fallback_when_all_rejected() {
        let config = PlannerConfig::viral_proposals(600.0);
        let outcome = SegmentPlanner::new().plan_text("[0-10] [20-25]", &config);
        assert_eq!(outcome.source, PlanSource::Fallback);
        assert_eq!(outcome.dropped.duration, 2);
    }

    #[test]
    fn test_empty_when_short_video() {
        let config = PlannerConfig::viral_proposals(45.0);
        let outcome = SegmentPlanner::new().plan_text("", &config);
        assert!(outcome.is_empty());
        assert_eq!(outcome.source, PlanSource::Empty);
    }

    #[test]
    fn test_duplicates_counted() {
        let config = PlannerConfig::viral_proposals(1000.0);
        let outcome = SegmentPlanner::new().plan_text("[0-90] [0-90] [100-190]", &config);
        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.dropped.duplicate, 1);
    }

    #[test]
    fn test_boundaries_do_not_fall_back() {
        let config = PlannerConfig::viral_proposals(600.0);
        let outcome = SegmentPlanner::new().plan_boundaries(&[0.0, 5.0, 10.0], &config);
        assert!(outcome.is_empty());
        assert_eq!(outcome.source, PlanSource::Empty);
        assert_eq!(outcome.dropped.duration, 3);
    }

    #[test]
    fn test_schedule_skips_duration_window() {
        let config = PlannerConfig::viral_proposals(300.0);
        let outcome = SegmentPlanner::new().plan(
            PlanInput::Schedule(Schedule::Fixed {
                count: 3,
                clip_length: 20.0,
            }),
            &config,
        );
        assert_eq!(outcome.len(), 3);
        assert_eq!(outcome.source, PlanSource::Schedule);
    }

    #[test]
    fn test_schedule_capped() {
        let config = PlannerConfig::viral_proposals(3000.0).with_max_segment_count(2);
        let outcome = SegmentPlanner::new().plan_schedule(
            &Schedule::Sequential {
                count: 6,
                clip_length: 60.0,
                offset: 0.0,
            },
            &config,
        );
        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.dropped.over_limit, 4);
    }

    #[test]
    fn test_custom_extractor() {
        let planner = SegmentPlanner::with_extractor(|_: &str| vec![RawCandidate::new(30.0, 120.0)]);
        let outcome = planner.plan_text("ignored", &PlannerConfig::viral_proposals(500.0));
        assert_eq!(outcome.segments, vec![Segment::new(30.0, 120.0).unwrap()]);
    }

    #[test]
    fn test_plan_shortcut() {
        let segments = plan("[10-80]", &PlannerConfig::viral_proposals(200.0));
        assert_eq!(segments.len(), 1);
    }
}
