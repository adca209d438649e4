//! Shared data models for AutoCut.
//!
//! This crate provides Serde-serializable types for:
//! - Clip segments and the raw candidates they are planned from
//! - Planner tuning and per-platform duration presets
//! - Encoder profiles and render options
//! - The job envelope accepted by the worker

pub mod encoding;
pub mod job;
pub mod planner_config;
pub mod render;
pub mod segment;
pub mod timestamp;

// Re-export common types
pub use encoding::{EncoderKind, EncoderProfile, OUTPUT_HEIGHT, OUTPUT_WIDTH};
pub use job::{JobConfig, JobId, JobInput, JobInputError, JobMode, JobRequest, Operation};
pub use planner_config::{Platform, PlannerConfig, PlannerConfigError};
pub use render::{
    CaptionOptions, CaptionPosition, Layout, RenderOptions, Rgb, MAX_RENDER_DURATION,
};
pub use segment::{RawCandidate, Segment};
pub use timestamp::{format_seconds, format_segment};
