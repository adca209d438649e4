//! FFmpeg CLI wrapper for AutoCut.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeouts via tokio
//! - Probe and audio extraction
//! - Histogram scene-change detection
//! - Face-centred smart crop
//! - Word captions, title overlay and the clip renderer

pub mod audio;
pub mod captions;
pub mod command;
pub mod error;
pub mod filters;
pub mod fonts;
pub mod frames;
pub mod output;
pub mod probe;
pub mod progress;
pub mod renderer;
pub mod scene_detect;
pub mod smart_crop;

pub use audio::{extract_audio, TRANSCRIPTION_SAMPLE_RATE};
pub use captions::{build_ass, words_for_clip, WordTiming, MIN_WORD_DURATION};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::{build_render_graph, wrap_title, SPEED_FACTOR};
pub use fonts::resolve_font;
pub use output::{clip_file_name, sanitize_title};
pub use probe::{probe_video, VideoInfo};
pub use progress::{FfmpegProgress, PercentSink};
pub use renderer::{ClipRenderer, FfmpegClipRenderer, RenderRequest, RenderedClip};
pub use scene_detect::{detect_scene_changes, SceneChangeDetector, SceneDetectConfig};
pub use smart_crop::{
    plan_smart_crop, CenterTracker, CropWindow, FaceBox, FaceDetector, SmartCropConfig,
};
