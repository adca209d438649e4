//! Sequential clip rendering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use autocut_media::{ClipRenderer, PercentSink, RenderRequest, RenderedClip};
use autocut_models::Segment;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::progress::ProgressReporter;

/// A segment that produced no file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipFailure {
    pub index: usize,
    pub segment: Segment,
    pub error: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub clips: Vec<RenderedClip>,
    pub failures: Vec<ClipFailure>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.clips.len() + self.failures.len()
    }
}

/// Index of the clip currently encoding, shared with the renderer's
/// percentage sink.
#[derive(Debug, Clone, Default)]
pub struct CurrentClip(Arc<AtomicUsize>);

impl CurrentClip {
    pub fn set(&self, index: usize) {
        self.0.store(index, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Sink forwarding encode percentages as `EncodePercent` events.
    pub fn percent_sink(&self, reporter: ProgressReporter) -> PercentSink {
        let current = self.clone();
        Arc::new(move |percent| reporter.encode_percent(current.get(), percent))
    }
}

/// Render `requests` one at a time, in order.
///
/// A failed clip is recorded and the batch moves on. Cancellation stops the
/// batch and is returned as an error.
pub async fn render_batch(
    renderer: &dyn ClipRenderer,
    requests: &[RenderRequest],
    reporter: &ProgressReporter,
    current: &CurrentClip,
) -> WorkerResult<BatchReport> {
    let total = requests.len();
    let mut report = BatchReport::default();

    for request in requests {
        current.set(request.index);
        reporter.clip_started(request.index, total);

        match renderer.render(request).await {
            Ok(clip) => {
                metrics::record_clip_rendered(clip.encoder.as_str(), clip.fallback_used, clip.duration);
                reporter.clip_finished(request.index, clip.path.to_string_lossy());
                report.clips.push(clip);
            }
            Err(e) if e.is_cancelled() => {
                warn!(index = request.index, "Render cancelled, stopping batch");
                return Err(WorkerError::Cancelled);
            }
            Err(e) => {
                metrics::record_clip_failed();
                warn!(
                    index = request.index,
                    start = request.segment.start,
                    end = request.segment.end,
                    error = %e,
                    "Clip failed, continuing with next segment"
                );
                reporter.clip_failed(request.index, e.to_string());
                report.failures.push(ClipFailure {
                    index: request.index,
                    segment: request.segment,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        rendered = report.clips.len(),
        failed = report.failures.len(),
        "Batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressEvent;
    use async_trait::async_trait;
    use autocut_media::{MediaError, MediaResult, VideoInfo};
    use autocut_models::{EncoderKind, RenderOptions};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Fails clips whose index is listed, records call order.
    struct ScriptedRenderer {
        fail: Vec<usize>,
        cancel_at: Option<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedRenderer {
        fn new(fail: Vec<usize>, cancel_at: Option<usize>) -> Self {
            Self {
                fail,
                cancel_at,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ClipRenderer for ScriptedRenderer {
        async fn render(&self, request: &RenderRequest) -> MediaResult<RenderedClip> {
            self.calls.lock().unwrap().push(request.index);
            if self.cancel_at == Some(request.index) {
                return Err(MediaError::Cancelled);
            }
            if self.fail.contains(&request.index) {
                return Err(MediaError::EncodeFailed {
                    index: request.index,
                    last_error: "nvenc and libx264 failed".to_string(),
                });
            }
            Ok(RenderedClip {
                path: PathBuf::from(format!("/out/clip_{}.mp4", request.index)),
                segment: request.segment,
                encoder: EncoderKind::Software,
                fallback_used: true,
                duration: request.segment.duration(),
            })
        }
    }

    fn requests(n: usize) -> Vec<RenderRequest> {
        (1..=n)
            .map(|index| RenderRequest {
                source: PathBuf::from("/tmp/source.mp4"),
                source_info: VideoInfo {
                    duration: 1000.0,
                    width: 1920,
                    height: 1080,
                    fps: 30.0,
                    has_audio: true,
                    size: 0,
                },
                segment: Segment::new(index as f64 * 100.0, index as f64 * 100.0 + 60.0).unwrap(),
                index,
                title: None,
                words: Vec::new(),
                crop: None,
                options: RenderOptions::default(),
                output_dir: PathBuf::from("/out"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_batch() {
        let renderer = ScriptedRenderer::new(vec![2], None);
        let (reporter, mut rx) = ProgressReporter::channel(32);

        let report = render_batch(&renderer, &requests(3), &reporter, &CurrentClip::default())
            .await
            .unwrap();

        assert_eq!(*renderer.calls.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(report.clips.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 2);
        assert_eq!(report.attempted(), 3);

        let mut failed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::ClipFailed { index, .. } = event {
                failed.push(index);
            }
        }
        assert_eq!(failed, vec![2]);
    }

    #[tokio::test]
    async fn test_cancel_stops_batch() {
        let renderer = ScriptedRenderer::new(vec![], Some(2));
        let result = render_batch(
            &renderer,
            &requests(4),
            &ProgressReporter::disabled(),
            &CurrentClip::default(),
        )
        .await;

        assert!(matches!(result, Err(WorkerError::Cancelled)));
        assert_eq!(*renderer.calls.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_percent_sink_tags_current_clip() {
        let (reporter, mut rx) = ProgressReporter::channel(4);
        let current = CurrentClip::default();
        let sink = current.percent_sink(reporter);

        current.set(3);
        sink(42.0);

        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::EncodePercent {
                index: 3,
                percent: 42.0
            }
        );
    }
}
