//! Clip rendering.
//!
//! [`ClipRenderer`] turns one planned segment into one vertical MP4. The
//! FFmpeg implementation builds a single filter graph (layout, title,
//! captions, anti-shadowban) and encodes it with each profile from
//! [`EncoderProfile::attempt_order`] until one succeeds.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use autocut_models::{
    EncoderKind, EncoderProfile, RenderOptions, Segment, MAX_RENDER_DURATION,
};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::captions::{scale_timings, words_for_clip, write_ass, WordTiming};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{
    build_render_graph, default_title_font_size, wrap_title, GraphInputs, TitleOverlay,
    SPEED_FACTOR,
};
use crate::fonts::resolve_font;
use crate::output::{clip_file_name, move_file, unique_path};
use crate::probe::VideoInfo;
use crate::progress::PercentSink;
use crate::smart_crop::CropWindow;

/// One clip to render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: PathBuf,
    pub source_info: VideoInfo,
    pub segment: Segment,
    /// 1-based position of the clip in its batch
    pub index: usize,
    pub title: Option<String>,
    /// Source-relative word timings; only used when captions are enabled
    pub words: Vec<WordTiming>,
    /// Crop column for [`autocut_models::Layout::SmartCrop`]
    pub crop: Option<CropWindow>,
    pub options: RenderOptions,
    pub output_dir: PathBuf,
}

impl RenderRequest {
    /// Seconds of source read for this clip.
    pub fn render_duration(&self) -> f64 {
        self.segment.duration().min(MAX_RENDER_DURATION)
    }
}

/// A finished clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedClip {
    pub path: PathBuf,
    pub segment: Segment,
    pub encoder: EncoderKind,
    /// The preferred encoder failed and a later profile produced the file
    pub fallback_used: bool,
    /// Seconds of source covered
    pub duration: f64,
}

/// Renders one segment to a file.
#[async_trait]
pub trait ClipRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> MediaResult<RenderedClip>;
}

/// [`ClipRenderer`] backed by the FFmpeg CLI.
#[derive(Clone)]
pub struct FfmpegClipRenderer {
    runner: FfmpegRunner,
    work_dir: PathBuf,
    font_dir: Option<PathBuf>,
    progress: Option<PercentSink>,
}

impl std::fmt::Debug for FfmpegClipRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegClipRenderer")
            .field("runner", &self.runner)
            .field("work_dir", &self.work_dir)
            .field("font_dir", &self.font_dir)
            .finish()
    }
}

impl FfmpegClipRenderer {
    pub fn new(runner: FfmpegRunner, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            work_dir: work_dir.into(),
            font_dir: None,
            progress: None,
        }
    }

    pub fn with_font_dir(mut self, font_dir: impl Into<PathBuf>) -> Self {
        self.font_dir = Some(font_dir.into());
        self
    }

    /// Report encode percentages of each clip to `sink`.
    pub fn with_progress(mut self, sink: PercentSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Write title line files into `scratch`.
    async fn prepare_title(
        &self,
        scratch: &Path,
        title: &str,
        options: &RenderOptions,
    ) -> MediaResult<Option<TitleOverlay>> {
        let font_size = options.font_size.unwrap_or_else(default_title_font_size);
        let lines = wrap_title(&title.to_uppercase(), font_size);
        if lines.is_empty() {
            return Ok(None);
        }

        let mut line_files = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let path = scratch.join(format!("title_{}.txt", i));
            fs::write(&path, line).await?;
            line_files.push(path);
        }

        Ok(Some(TitleOverlay {
            line_files,
            font_path: resolve_font(self.font_dir.as_deref(), &options.font_filename),
            font_size,
        }))
    }

    /// Write the caption track into `scratch`, if there is anything to show.
    async fn prepare_captions(
        &self,
        scratch: &Path,
        request: &RenderRequest,
    ) -> MediaResult<Option<PathBuf>> {
        let Some(captions) = &request.options.captions else {
            return Ok(None);
        };

        let start = request.segment.start;
        let mut words = words_for_clip(&request.words, start, start + request.render_duration());
        if words.is_empty() {
            debug!(index = request.index, "No words inside clip, captions skipped");
            return Ok(None);
        }
        if request.options.anti_shadowban {
            scale_timings(&mut words, SPEED_FACTOR);
        }

        let path = scratch.join("captions.ass");
        write_ass(&path, &words, captions).await?;
        Ok(Some(path))
    }

    fn encode_command(
        &self,
        request: &RenderRequest,
        graph: &crate::filters::FilterGraph,
        profile: &EncoderProfile,
        output: &Path,
    ) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(&request.source, output)
            .seek(request.segment.start)
            .duration(request.render_duration())
            .filter_complex(graph.graph.clone())
            .map(graph.video_map.clone());
        if let Some(audio) = &graph.audio_map {
            cmd = cmd.map(audio.clone());
        }
        cmd.output_args(profile.to_ffmpeg_args())
    }
}

#[async_trait]
impl ClipRenderer for FfmpegClipRenderer {
    async fn render(&self, request: &RenderRequest) -> MediaResult<RenderedClip> {
        if !request.source.exists() {
            return Err(MediaError::FileNotFound(request.source.clone()));
        }

        fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("autocut-render-")
            .tempdir_in(&self.work_dir)?;

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let overlay = match title {
            Some(title) => {
                self.prepare_title(scratch.path(), title, &request.options)
                    .await?
            }
            None => None,
        };
        let subtitles = self.prepare_captions(scratch.path(), request).await?;

        let graph = build_render_graph(
            &request.options,
            &GraphInputs {
                crop: request.crop,
                title: overlay.as_ref(),
                subtitles: subtitles.as_deref(),
                has_audio: request.source_info.has_audio,
                fps: request.source_info.fps,
            },
        );

        let duration = request.render_duration();
        let output_secs = if request.options.anti_shadowban {
            duration / SPEED_FACTOR
        } else {
            duration
        };
        let scratch_output = scratch.path().join("render.mp4");

        info!(
            index = request.index,
            start = request.segment.start,
            end = request.segment.end,
            duration,
            layout = ?request.options.layout,
            "Rendering clip"
        );

        let profiles = EncoderProfile::attempt_order(request.options.prefer_hardware_encoder);
        let mut last_error = String::from("no encoder attempted");

        for (attempt, profile) in profiles.iter().enumerate() {
            let cmd = self.encode_command(request, &graph, profile, &scratch_output);
            let sink = self.progress.clone();
            let result = self
                .runner
                .run_with_progress(&cmd, move |p| {
                    if let Some(sink) = &sink {
                        sink(p.percentage(output_secs));
                    }
                })
                .await;

            match result {
                Ok(()) => {
                    let file_name = clip_file_name(
                        request.index,
                        title,
                        chrono::Utc::now().timestamp(),
                    );
                    let path = unique_path(&request.output_dir, &file_name);
                    move_file(&scratch_output, &path).await?;

                    info!(
                        index = request.index,
                        encoder = %profile.kind,
                        path = %path.display(),
                        "Clip rendered"
                    );
                    return Ok(RenderedClip {
                        path,
                        segment: request.segment,
                        encoder: profile.kind,
                        fallback_used: attempt > 0,
                        duration,
                    });
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        index = request.index,
                        encoder = %profile.kind,
                        error = %e,
                        stderr = ?stderr_of(&e),
                        "Encode attempt failed"
                    );
                    let _ = fs::remove_file(&scratch_output).await;
                    last_error = e.to_string();
                }
            }
        }

        Err(MediaError::EncodeFailed {
            index: request.index,
            last_error,
        })
    }
}

fn stderr_of(error: &MediaError) -> Option<&str> {
    match error {
        MediaError::FfmpegFailed { stderr, .. } => stderr.as_deref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocut_models::CaptionOptions;
    use tempfile::TempDir;

    fn request(dir: &Path) -> RenderRequest {
        RenderRequest {
            source: dir.join("episode.mp4"),
            source_info: VideoInfo {
                duration: 1400.0,
                width: 1920,
                height: 1080,
                fps: 23.976,
                has_audio: true,
                size: 0,
            },
            segment: Segment::new(100.0, 500.0).unwrap(),
            index: 2,
            title: Some("Goku vs Vegeta".to_string()),
            words: vec![
                WordTiming::new("kakarotto", 101.0, 101.6),
                WordTiming::new("later", 900.0, 900.5),
            ],
            crop: None,
            options: RenderOptions::default(),
            output_dir: dir.join("out"),
        }
    }

    #[test]
    fn test_duration_capped() {
        let dir = TempDir::new().unwrap();
        let req = request(dir.path());
        assert_eq!(req.render_duration(), MAX_RENDER_DURATION);
    }

    #[tokio::test]
    async fn test_prepare_title_writes_uppercase_lines() {
        let dir = TempDir::new().unwrap();
        let renderer = FfmpegClipRenderer::new(FfmpegRunner::new(), dir.path());
        let overlay = renderer
            .prepare_title(dir.path(), "Goku vs Vegeta", &RenderOptions::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(overlay.font_size, 86);
        assert_eq!(overlay.line_files.len(), 1);
        let text = fs::read_to_string(&overlay.line_files[0]).await.unwrap();
        assert_eq!(text, "GOKU VS VEGETA");
    }

    #[tokio::test]
    async fn test_captions_only_when_enabled() {
        let dir = TempDir::new().unwrap();
        let renderer = FfmpegClipRenderer::new(FfmpegRunner::new(), dir.path());

        let mut req = request(dir.path());
        assert!(renderer
            .prepare_captions(dir.path(), &req)
            .await
            .unwrap()
            .is_none());

        req.options.captions = Some(CaptionOptions::default());
        let path = renderer
            .prepare_captions(dir.path(), &req)
            .await
            .unwrap()
            .unwrap();
        let doc = fs::read_to_string(path).await.unwrap();
        assert!(doc.contains("KAKAROTTO"));
        assert!(!doc.contains("LATER"));
        assert!(doc.contains("Dialogue: 0,0:00:01.00,0:00:01.60"));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let renderer = FfmpegClipRenderer::new(FfmpegRunner::new(), dir.path());
        let err = renderer.render(&request(dir.path())).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn test_encode_command_maps_streams() {
        let dir = TempDir::new().unwrap();
        let renderer = FfmpegClipRenderer::new(FfmpegRunner::new(), dir.path());
        let req = request(dir.path());
        let graph = build_render_graph(
            &req.options,
            &GraphInputs {
                has_audio: true,
                fps: 24.0,
                ..Default::default()
            },
        );
        let args = renderer
            .encode_command(&req, &graph, &EncoderProfile::software(), Path::new("o.mp4"))
            .build_args();

        let maps: Vec<_> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-map")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(maps, vec!["[vout]", "0:a:0"]);
        assert!(args.contains(&"300.000".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }
}
