//! Scene-change detection by luma histogram correlation.
//!
//! # Algorithm
//! 1. Decode sampled frames as 8-bit grayscale thumbnails
//! 2. Build a 256-bin histogram per frame, L2-normalised
//! 3. Compare consecutive histograms with Pearson correlation
//! 4. Record a boundary when correlation drops below `1 - sensitivity / 100`
//!
//! Boundaries are returned in increasing order and feed the planner's
//! scene-boundary candidate source.

use std::path::Path;

use image::GrayImage;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::frames::{FrameSampling, FrameStream, PixelFormat};

pub const DEFAULT_SENSITIVITY: f64 = 30.0;
pub const MIN_SENSITIVITY: f64 = 10.0;
pub const MAX_SENSITIVITY: f64 = 50.0;

const HISTOGRAM_BINS: usize = 256;

/// Scene detection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneDetectConfig {
    /// Higher values need a bigger change to register a cut (10-50)
    pub sensitivity: f64,
    /// Frames analysed per second of video
    pub sample_fps: f64,
    pub thumb_width: u32,
    pub thumb_height: u32,
}

impl Default for SceneDetectConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            sample_fps: 4.0,
            thumb_width: 160,
            thumb_height: 90,
        }
    }
}

impl SceneDetectConfig {
    /// Clamp sensitivity into the supported range.
    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = if sensitivity.is_finite() {
            sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY)
        } else {
            DEFAULT_SENSITIVITY
        };
        self
    }

    pub fn with_sample_fps(mut self, sample_fps: f64) -> Self {
        self.sample_fps = sample_fps;
        self
    }

    /// Correlation below which consecutive frames are a cut.
    pub fn correlation_threshold(&self) -> f64 {
        1.0 - self.sensitivity / 100.0
    }
}

/// A normalised 256-bin luma histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct LumaHistogram {
    bins: Vec<f64>,
}

impl LumaHistogram {
    pub fn from_gray(frame: &GrayImage) -> Self {
        let mut bins = vec![0.0f64; HISTOGRAM_BINS];
        for pixel in frame.pixels() {
            bins[pixel.0[0] as usize] += 1.0;
        }

        let norm = bins.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut bins {
                *v /= norm;
            }
        }

        Self { bins }
    }

    /// Pearson correlation with `other`, in `[-1, 1]`.
    ///
    /// Two flat histograms (zero variance) correlate at 1.
    pub fn correlation(&self, other: &LumaHistogram) -> f64 {
        let n = self.bins.len() as f64;
        let mean_a = self.bins.iter().sum::<f64>() / n;
        let mean_b = other.bins.iter().sum::<f64>() / n;

        let (mut num, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
        for (a, b) in self.bins.iter().zip(&other.bins) {
            let da = a - mean_a;
            let db = b - mean_b;
            num += da * db;
            var_a += da * da;
            var_b += db * db;
        }

        let denom = (var_a * var_b).sqrt();
        if denom > f64::EPSILON {
            num / denom
        } else {
            1.0
        }
    }
}

/// Streaming detector: feed frames in order, collect boundaries.
#[derive(Debug, Clone)]
pub struct SceneChangeDetector {
    config: SceneDetectConfig,
    threshold: f64,
    previous: Option<LumaHistogram>,
    frame_index: u64,
    boundaries: Vec<f64>,
}

impl SceneChangeDetector {
    pub fn new(config: SceneDetectConfig) -> Self {
        Self {
            threshold: config.correlation_threshold(),
            config,
            previous: None,
            frame_index: 0,
            boundaries: Vec::new(),
        }
    }

    /// Feed the next sampled frame. Returns the boundary timestamp if this
    /// frame starts a new scene.
    pub fn push_frame(&mut self, frame: &GrayImage) -> Option<f64> {
        let histogram = LumaHistogram::from_gray(frame);
        let timestamp = self.frame_index as f64 / self.config.sample_fps;
        self.frame_index += 1;

        let boundary = match &self.previous {
            Some(previous) => {
                let correlation = previous.correlation(&histogram);
                (correlation < self.threshold).then(|| {
                    debug!(
                        timestamp,
                        correlation = format!("{:.3}", correlation),
                        "Scene change"
                    );
                    timestamp
                })
            }
            None => None,
        };

        if let Some(ts) = boundary {
            self.boundaries.push(ts);
        }
        self.previous = Some(histogram);
        boundary
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn into_boundaries(self) -> Vec<f64> {
        self.boundaries
    }
}

/// Decode `video` and return its scene-change timestamps in seconds.
pub async fn detect_scene_changes(
    video: &Path,
    config: SceneDetectConfig,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<Vec<f64>> {
    let sampling = FrameSampling {
        sample_fps: config.sample_fps,
        width: config.thumb_width,
        height: config.thumb_height,
        format: PixelFormat::Gray,
        range: None,
    };

    let mut stream = FrameStream::open(video, sampling).await?;
    let mut detector = SceneChangeDetector::new(config);

    while let Some(frame) = stream.next_gray().await? {
        if cancel_rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false) {
            let _ = stream.close().await;
            return Err(MediaError::Cancelled);
        }
        detector.push_frame(&frame);
    }

    let frames = stream.frames_read();
    stream.close().await?;

    info!(
        frames,
        boundaries = detector.boundaries().len(),
        sensitivity = config.sensitivity,
        "Scene detection complete"
    );

    Ok(detector.into_boundaries())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn flat(value: u8) -> GrayImage {
        GrayImage::from_pixel(16, 9, Luma([value]))
    }

    fn gradient(offset: u8) -> GrayImage {
        GrayImage::from_fn(16, 9, |x, y| Luma([offset.wrapping_add((x * 9 + y) as u8)]))
    }

    #[test]
    fn test_threshold_from_sensitivity() {
        let config = SceneDetectConfig::default();
        assert!((config.correlation_threshold() - 0.7).abs() < 1e-9);
        assert_eq!(SceneDetectConfig::default().with_sensitivity(90.0).sensitivity, 50.0);
        assert_eq!(SceneDetectConfig::default().with_sensitivity(1.0).sensitivity, 10.0);
        assert_eq!(
            SceneDetectConfig::default().with_sensitivity(f64::NAN).sensitivity,
            DEFAULT_SENSITIVITY
        );
    }

    #[test]
    fn test_identical_frames_correlate_fully() {
        let a = LumaHistogram::from_gray(&gradient(0));
        let b = LumaHistogram::from_gray(&gradient(0));
        assert!((a.correlation(&b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_is_unit_length() {
        let h = LumaHistogram::from_gray(&gradient(3));
        let norm: f64 = h.bins.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cut_between_dark_and_bright() {
        let config = SceneDetectConfig::default().with_sample_fps(2.0);
        let mut detector = SceneChangeDetector::new(config);

        assert_eq!(detector.push_frame(&flat(10)), None);
        assert_eq!(detector.push_frame(&flat(10)), None);
        // Frame index 2 at 2 fps
        assert_eq!(detector.push_frame(&flat(240)), Some(1.0));
        assert_eq!(detector.push_frame(&flat(240)), None);
        assert_eq!(detector.push_frame(&flat(10)), Some(2.0));

        assert_eq!(detector.into_boundaries(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_small_shift_is_not_a_cut() {
        let mut detector = SceneChangeDetector::new(SceneDetectConfig::default());
        detector.push_frame(&gradient(0));
        assert_eq!(detector.push_frame(&gradient(0)), None);
        assert!(detector.boundaries().is_empty());
    }

    #[tokio::test]
    async fn test_missing_video() {
        let result =
            detect_scene_changes(Path::new("/nonexistent.mp4"), SceneDetectConfig::default(), None)
                .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
