//! Clip segment planning.
//!
//! This crate turns a source of candidate time ranges into the final list of
//! clips handed to the renderer:
//! - Timestamp extraction from free-form language-model text
//! - Scene-boundary and fixed-schedule candidate sources
//! - Validation against duration bounds, clamping to the source length
//! - Exact-duplicate removal and a positional count cap
//! - Even tiling when nothing else survives
//!
//! Planning is synchronous and never fails; an empty plan is a valid outcome.

pub mod extract;
pub mod fallback;
pub mod planner;
pub mod scenes;
pub mod schedule;
pub mod validate;

pub use extract::{BracketedPairExtractor, TimestampExtractor};
pub use fallback::fallback_segments;
pub use planner::{plan, DropCounts, PlanInput, PlanOutcome, PlanSource, SegmentPlanner};
pub use scenes::boundary_candidates;
pub use schedule::Schedule;
pub use validate::{dedup, limit, validate_all, validate_candidate, Rejection};
