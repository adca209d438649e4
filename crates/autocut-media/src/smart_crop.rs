//! Face-centred 9:16 crop for wide sources.
//!
//! Frames are sampled across the clip and handed to a [`FaceDetector`]. The
//! horizontal face centre is tracked with exponential smoothing; a sample
//! without a face repeats the last known centre (frame centre before the
//! first hit). The crop column is placed on the mean smoothed centre.

use std::path::Path;

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MediaResult;
use crate::frames::{FrameSampling, FrameStream, PixelFormat};
use crate::probe::VideoInfo;

/// Weight of each new observation in the smoothed centre.
pub const SMOOTHING_FACTOR: f64 = 0.1;

/// A detected face, in coordinates relative to the frame (0.0-1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub score: f32,
}

impl FaceBox {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// Face detection model.
///
/// Implementations wrap an external model; this crate only consumes the
/// boxes.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// All faces found in `frame`.
    async fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<FaceBox>>;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

/// Best-scoring face, if any.
pub fn best_face(faces: &[FaceBox]) -> Option<FaceBox> {
    faces
        .iter()
        .copied()
        .filter(|f| f.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

/// Exponentially smoothed horizontal face centre, in source pixels.
#[derive(Debug, Clone)]
pub struct CenterTracker {
    alpha: f64,
    frame_width: f64,
    last_seen: Option<f64>,
    current: Option<f64>,
    smoothed: Vec<f64>,
}

impl CenterTracker {
    pub fn new(frame_width: u32) -> Self {
        Self::with_smoothing(frame_width, SMOOTHING_FACTOR)
    }

    pub fn with_smoothing(frame_width: u32, alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            frame_width: frame_width as f64,
            last_seen: None,
            current: None,
            smoothed: Vec::new(),
        }
    }

    /// Record one sample; `None` means no face was found.
    pub fn observe(&mut self, center_x: Option<f64>) -> f64 {
        let observed = center_x
            .or(self.last_seen)
            .unwrap_or(self.frame_width / 2.0);
        if center_x.is_some() {
            self.last_seen = center_x;
        }

        let next = match self.current {
            Some(current) => current * (1.0 - self.alpha) + observed * self.alpha,
            None => observed,
        };
        self.current = Some(next);
        self.smoothed.push(next);
        next
    }

    pub fn smoothed(&self) -> &[f64] {
        &self.smoothed
    }

    /// Mean of the smoothed centres; frame centre when nothing was observed.
    pub fn mean_center(&self) -> f64 {
        if self.smoothed.is_empty() {
            return self.frame_width / 2.0;
        }
        self.smoothed.iter().sum::<f64>() / self.smoothed.len() as f64
    }
}

/// A full-height crop column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub x: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// 9:16 column of full height centred on `center_x`, kept inside the
    /// frame.
    pub fn centered(frame_width: u32, frame_height: u32, center_x: f64) -> Self {
        // Even width keeps yuv420p happy
        let target = ((frame_height as f64 * 9.0 / 16.0) as u32) & !1;
        let width = target.min(frame_width).max(2);

        let half = width as f64 / 2.0;
        let max_x = frame_width.saturating_sub(width) as f64;
        let x = (center_x - half).clamp(0.0, max_x);

        Self {
            x: x as u32,
            width,
            height: frame_height,
        }
    }

    /// Centre column; used when detection is unavailable.
    pub fn center(frame_width: u32, frame_height: u32) -> Self {
        Self::centered(frame_width, frame_height, frame_width as f64 / 2.0)
    }
}

/// Sampling for face analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmartCropConfig {
    /// Seconds between analysed frames
    pub sample_interval: f64,
    /// Width of the analysis frames (height follows the aspect ratio)
    pub analysis_width: u32,
    pub smoothing: f64,
}

impl Default for SmartCropConfig {
    fn default() -> Self {
        Self {
            sample_interval: 2.0,
            analysis_width: 640,
            smoothing: SMOOTHING_FACTOR,
        }
    }
}

/// Choose the crop column for `[start, end)` of `video`.
///
/// Detector errors count as misses. Decoder failures propagate.
pub async fn plan_smart_crop(
    video: &Path,
    info: &VideoInfo,
    start: f64,
    end: f64,
    detector: &dyn FaceDetector,
    config: SmartCropConfig,
) -> MediaResult<CropWindow> {
    if info.width == 0 || info.height == 0 {
        return Ok(CropWindow::center(info.width.max(2), info.height.max(2)));
    }

    let analysis_width = config.analysis_width.min(info.width).max(2) & !1;
    let analysis_height =
        ((info.height as f64 * analysis_width as f64 / info.width as f64) as u32).max(2) & !1;

    let sampling = FrameSampling {
        sample_fps: 1.0 / config.sample_interval.max(0.1),
        width: analysis_width,
        height: analysis_height,
        format: PixelFormat::Rgb24,
        range: Some((start, (end - start).max(0.0))),
    };

    let mut stream = FrameStream::open(video, sampling).await?;
    let mut tracker = CenterTracker::with_smoothing(info.width, config.smoothing);
    let mut hits = 0usize;

    while let Some(frame) = stream.next_rgb().await? {
        let center = match detector.detect(&frame).await {
            Ok(faces) => best_face(&faces).map(|f| f.center_x() * info.width as f64),
            Err(e) => {
                warn!(detector = detector.name(), error = %e, "Face detection failed on sample");
                None
            }
        };
        hits += center.is_some() as usize;
        tracker.observe(center);
    }
    stream.close().await?;

    let window = CropWindow::centered(info.width, info.height, tracker.mean_center());
    debug!(
        detector = detector.name(),
        samples = tracker.smoothed().len(),
        hits,
        x = window.x,
        width = window.width,
        "Smart crop planned"
    );
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDetector(Vec<FaceBox>);

    #[async_trait]
    impl FaceDetector for FixedDetector {
        async fn detect(&self, _frame: &RgbImage) -> MediaResult<Vec<FaceBox>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn face(x: f64, score: f32) -> FaceBox {
        FaceBox {
            x,
            y: 0.2,
            width: 0.1,
            height: 0.2,
            score,
        }
    }

    #[test]
    fn test_best_face_by_score() {
        let faces = [face(0.1, 0.4), face(0.6, 0.9), face(0.3, 0.7)];
        assert_eq!(best_face(&faces).unwrap().x, 0.6);
        assert!(best_face(&[]).is_none());
    }

    #[test]
    fn test_tracker_starts_at_first_observation() {
        let mut tracker = CenterTracker::new(1920);
        assert_eq!(tracker.observe(Some(400.0)), 400.0);
        // 400 * 0.9 + 1400 * 0.1
        assert!((tracker.observe(Some(1400.0)) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_tracker_miss_repeats_last_seen() {
        let mut tracker = CenterTracker::new(1920);
        tracker.observe(Some(400.0));
        tracker.observe(None);
        assert_eq!(tracker.smoothed(), &[400.0, 400.0]);
    }

    #[test]
    fn test_tracker_miss_before_any_face_uses_frame_center() {
        let mut tracker = CenterTracker::new(1920);
        assert_eq!(tracker.observe(None), 960.0);
        assert_eq!(CenterTracker::new(1280).mean_center(), 640.0);
    }

    #[test]
    fn test_crop_window_clamped() {
        // 1080p source: 607 wide column rounded down to even
        let left = CropWindow::centered(1920, 1080, 0.0);
        assert_eq!(left, CropWindow { x: 0, width: 606, height: 1080 });

        let right = CropWindow::centered(1920, 1080, 1920.0);
        assert_eq!(right.x, 1920 - 606);

        let middle = CropWindow::center(1920, 1080);
        assert_eq!(middle.x, 960 - 303);
    }

    #[test]
    fn test_crop_window_narrow_source() {
        // Already portrait: the column is the whole frame
        let window = CropWindow::centered(720, 1280, 100.0);
        assert_eq!(window, CropWindow { x: 0, width: 720, height: 1280 });
    }

    #[tokio::test]
    async fn test_detector_trait_object() {
        let detector: Box<dyn FaceDetector> = Box::new(FixedDetector(vec![face(0.5, 1.0)]));
        let faces = detector.detect(&RgbImage::new(4, 4)).await.unwrap();
        assert_eq!(best_face(&faces).unwrap().center_x(), 0.55);
    }
}
