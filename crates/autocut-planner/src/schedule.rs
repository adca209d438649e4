//! Content-unaware cut schedules chosen by the user.

use autocut_models::Segment;
use serde::{Deserialize, Serialize};

/// Scheduled cuts shorter than this are skipped (seconds).
pub const MIN_SCHEDULED_SPAN: f64 = 10.0;

/// A user-chosen cut layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// `count` cuts spread evenly over the source, each `clip_length` long
    Fixed { count: usize, clip_length: f64 },
    /// `count` back-to-back cuts of `clip_length` starting at `offset`
    Sequential {
        count: usize,
        clip_length: f64,
        offset: f64,
    },
}

impl Schedule {
    /// Segments for a source of `total_duration` seconds.
    pub fn segments(&self, total_duration: f64) -> Vec<Segment> {
        match *self {
            Schedule::Fixed { count, clip_length } => {
                fixed_segments(count, clip_length, total_duration)
            }
            Schedule::Sequential {
                count,
                clip_length,
                offset,
            } => sequential_segments(count, clip_length, offset, total_duration),
        }
    }
}

fn fixed_segments(count: usize, clip_length: f64, total: f64) -> Vec<Segment> {
    if count == 0 || !(clip_length > 0.0) || !(total > 0.0) {
        return Vec::new();
    }

    let interval = total / count as f64;
    (0..count)
        .filter_map(|i| {
            let start = i as f64 * interval;
            let end = (start + clip_length).min(total);
            if end - start > MIN_SCHEDULED_SPAN {
                Segment::new(start, end)
            } else {
                None
            }
        })
        .collect()
}

fn sequential_segments(count: usize, clip_length: f64, offset: f64, total: f64) -> Vec<Segment> {
    if !(clip_length > 0.0) {
        return Vec::new();
    }

    let offset = offset.max(0.0);
    (0..count)
        .map(|i| offset + i as f64 * clip_length)
        .take_while(|&start| start < total)
        .filter_map(|start| Segment::new(start, (start + clip_length).min(total)))
        .collect()
}
