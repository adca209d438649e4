//! Even tiling used when no content-aware candidate survives.

use autocut_models::{PlannerConfig, Segment};

/// Evenly spaced segments across the whole source.
///
/// Produces `min(max_segment_count, floor(total / ideal_segment_length))`
/// segments of `ideal_segment_length`, each starting at `i * total / n`, the
/// last one clamped to the source length. Segments shorter than
/// `min_duration` are skipped. Returns nothing when the source is not longer
/// than `min_duration`.
pub fn fallback_segments(config: &PlannerConfig) -> Vec<Segment> {
    let total = config.total_duration;
    if !(total > config.min_duration) || !(config.ideal_segment_length > 0.0) {
        return Vec::new();
    }

    let tiles = (total / config.ideal_segment_length).floor() as usize;
    let count = tiles.min(config.max_segment_count);
    if count == 0 {
        return Vec::new();
    }

    let span = total / count as f64;
    (0..count)
        .filter_map(|i| {
            let start = i as f64 * span;
            let end = (start + config.ideal_segment_length).min(total);
            if end - start >= config.min_duration {
                Segment::new(start, end)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_minutes_gives_five_tiles() {
        let segments = fallback_segments(&PlannerConfig::viral_proposals(600.0));
        let bounds: Vec<(f64, f64)> = segments.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(
            bounds,
            vec![
                (0.0, 120.0),
                (120.0, 240.0),
                (240.0, 360.0),
                (360.0, 480.0),
                (480.0, 600.0)
            ]
        );
    }

    #[test]
    fn test_count_capped_and_spread() {
        // 30 min would tile 15 times; capped at 5, spaced 360 s apart
        let segments = fallback_segments(&PlannerConfig::viral_proposals(1800.0));
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[1].start, 360.0);
        assert!(segments.iter().all(|s| s.duration() == 120.0));
    }

    #[test]
    fn test_short_video_has_no_fallback() {
        assert!(fallback_segments(&PlannerConfig::viral_proposals(60.0)).is_empty());
        // Longer than min_duration but shorter than one tile
        assert!(fallback_segments(&PlannerConfig::viral_proposals(100.0)).is_empty());
    }

    #[test]
    fn test_single_tile() {
        let segments = fallback_segments(&PlannerConfig::viral_proposals(150.0));
        assert_eq!(segments.len(), 1);
        assert_eq!((segments[0].start, segments[0].end), (0.0, 120.0));
    }

    #[test]
    fn test_non_positive_ideal_length() {
        let config = PlannerConfig::viral_proposals(600.0).with_ideal_segment_length(0.0);
        assert!(fallback_segments(&config).is_empty());
    }
}
