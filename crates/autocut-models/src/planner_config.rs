//! Segment planner tuning.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest clip accepted from model proposals (seconds).
pub const DEFAULT_MIN_DURATION: f64 = 60.0;
/// Longest clip accepted from model proposals (seconds).
pub const DEFAULT_MAX_DURATION: f64 = 180.0;
/// Maximum number of clips returned by one planning call.
pub const DEFAULT_MAX_SEGMENT_COUNT: usize = 5;
/// Length of each fallback clip (seconds).
pub const DEFAULT_IDEAL_SEGMENT_LENGTH: f64 = 120.0;

/// Tunables for one planning call.
///
/// `min_duration < max_duration` is expected; [`PlannerConfig::validate`]
/// checks it for configs built from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannerConfig {
    /// Minimum accepted segment duration in seconds
    pub min_duration: f64,
    /// Maximum accepted segment duration in seconds
    pub max_duration: f64,
    /// Positional cap on the number of returned segments
    pub max_segment_count: usize,
    /// Duration of the source video in seconds
    pub total_duration: f64,
    /// Length of each generated fallback segment in seconds
    #[serde(default = "default_ideal_segment_length")]
    pub ideal_segment_length: f64,
}

fn default_ideal_segment_length() -> f64 {
    DEFAULT_IDEAL_SEGMENT_LENGTH
}

impl PlannerConfig {
    /// Config used for language-model proposals: 60-180 s, at most 5 clips.
    pub fn viral_proposals(total_duration: f64) -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            max_segment_count: DEFAULT_MAX_SEGMENT_COUNT,
            total_duration,
            ideal_segment_length: DEFAULT_IDEAL_SEGMENT_LENGTH,
        }
    }

    pub fn with_bounds(mut self, min_duration: f64, max_duration: f64) -> Self {
        self.min_duration = min_duration;
        self.max_duration = max_duration;
        self
    }

    pub fn with_max_segment_count(mut self, max_segment_count: usize) -> Self {
        self.max_segment_count = max_segment_count;
        self
    }

    pub fn with_ideal_segment_length(mut self, ideal_segment_length: f64) -> Self {
        self.ideal_segment_length = ideal_segment_length;
        self
    }

    /// Check the preconditions the planner relies on.
    pub fn validate(&self) -> Result<(), PlannerConfigError> {
        if !(self.min_duration < self.max_duration) {
            return Err(PlannerConfigError::InvertedBounds {
                min: self.min_duration,
                max: self.max_duration,
            });
        }
        if self.max_segment_count == 0 {
            return Err(PlannerConfigError::ZeroSegmentCount);
        }
        if !(self.ideal_segment_length > 0.0) {
            return Err(PlannerConfigError::NonPositiveIdealLength(self.ideal_segment_length));
        }
        if !self.total_duration.is_finite() || self.total_duration < 0.0 {
            return Err(PlannerConfigError::InvalidTotalDuration(self.total_duration));
        }
        Ok(())
    }
}

/// Invalid planner configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerConfigError {
    #[error("min_duration ({min}) must be less than max_duration ({max})")]
    InvertedBounds { min: f64, max: f64 },

    #[error("max_segment_count must be at least 1")]
    ZeroSegmentCount,

    #[error("ideal_segment_length must be positive, got {0}")]
    NonPositiveIdealLength(f64),

    #[error("total_duration must be a non-negative number, got {0}")]
    InvalidTotalDuration(f64),
}

/// Target platform of a tool, carrying its scene-mode duration bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Kwai / TikTok vertical cuts
    #[default]
    Kwai,
    /// Anime episode cuts
    Anime,
    /// Face-tracked talking-head cuts
    ViralPro,
}

impl Platform {
    /// `(min_duration, max_duration)` accepted for scene-boundary segments.
    pub fn duration_bounds(&self) -> (f64, f64) {
        match self {
            Platform::Kwai => (30.0, 180.0),
            Platform::Anime => (50.0, 90.0),
            Platform::ViralPro => (15.0, 300.0),
        }
    }

    /// Default clip cap for scene mode.
    pub fn max_clips(&self) -> usize {
        match self {
            Platform::Kwai => 10,
            Platform::Anime => 15,
            Platform::ViralPro => 10,
        }
    }

    /// Planner config for scene-boundary planning on this platform.
    pub fn planner_config(&self, total_duration: f64) -> PlannerConfig {
        let (min_duration, max_duration) = self.duration_bounds();
        PlannerConfig {
            min_duration,
            max_duration,
            max_segment_count: self.max_clips(),
            total_duration,
            ideal_segment_length: DEFAULT_IDEAL_SEGMENT_LENGTH,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Kwai => "kwai",
            Platform::Anime => "anime",
            Platform::ViralPro => "viral_pro",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viral_proposals_defaults() {
        let config = PlannerConfig::viral_proposals(600.0);
        assert_eq!(config.min_duration, 60.0);
        assert_eq!(config.max_duration, 180.0);
        assert_eq!(config.max_segment_count, 5);
        assert_eq!(config.ideal_segment_length, 120.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = PlannerConfig::viral_proposals(600.0).with_bounds(90.0, 30.0);
        assert!(matches!(
            config.validate(),
            Err(PlannerConfigError::InvertedBounds { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_count() {
        let config = PlannerConfig::viral_proposals(600.0).with_max_segment_count(0);
        assert_eq!(config.validate(), Err(PlannerConfigError::ZeroSegmentCount));
    }

    #[test]
    fn test_platform_bounds_differ() {
        assert_ne!(Platform::Kwai.duration_bounds(), Platform::Anime.duration_bounds());
        let config = Platform::Kwai.planner_config(1200.0);
        assert_eq!(config.min_duration, 30.0);
        assert_eq!(config.max_segment_count, 10);
    }

    #[test]
    fn test_platform_serde() {
        let json = serde_json::to_string(&Platform::ViralPro).unwrap();
        assert_eq!(json, "\"viral_pro\"");
        let parsed: Platform = serde_json::from_str("\"anime\"").unwrap();
        assert_eq!(parsed, Platform::Anime);
    }

    #[test]
    fn test_missing_ideal_length_uses_default() {
        let config: PlannerConfig = serde_json::from_str(
            r#"{"min_duration":30,"max_duration":90,"max_segment_count":3,"total_duration":300}"#,
        )
        .unwrap();
        assert_eq!(config.ideal_segment_length, DEFAULT_IDEAL_SEGMENT_LENGTH);
    }
}
