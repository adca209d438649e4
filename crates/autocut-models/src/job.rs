//! Job envelope accepted by the worker.
//!
//! ```json
//! { "input": { "operation": "process_video", "video_url": "https://...",
//!              "anime_name": "Naruto", "mode": "auto", "config": { ... } } }
//! ```

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::planner_config::Platform;
use crate::render::{CaptionOptions, CaptionPosition, Layout, RenderOptions, Rgb};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operations the worker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Download, plan and render clips
    ProcessVideo,
    /// Download an audio file and return its transcript
    TranscribeAudio,
    /// Produce a title from a dialogue excerpt
    GenerateTitle,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ProcessVideo => "process_video",
            Operation::TranscribeAudio => "transcribe_audio",
            Operation::GenerateTitle => "generate_title",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "process_video" => Some(Operation::ProcessVideo),
            "transcribe_audio" => Some(Operation::TranscribeAudio),
            "generate_title" => Some(Operation::GenerateTitle),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the candidate segments for a `process_video` job come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Transcribe, ask the language model for timestamps, fall back to tiling
    #[default]
    Auto,
    /// Evenly spaced cuts of a fixed length
    Manual,
    /// Histogram scene-change boundaries
    Scenes,
    /// Back-to-back cuts from a start offset
    Sequential,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Auto => "auto",
            JobMode::Manual => "manual",
            JobMode::Scenes => "scenes",
            JobMode::Sequential => "sequential",
        }
    }
}

/// Top-level envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRequest {
    pub input: JobInput,
}

/// The `input` object of a job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobInput {
    /// Operation name; unknown names are reported back rather than rejected here
    #[serde(default = "default_operation")]
    pub operation: String,

    #[serde(default)]
    pub video_url: Option<String>,

    #[serde(default)]
    pub audio_url: Option<String>,

    #[serde(default = "default_anime_name")]
    pub anime_name: String,

    /// Dialogue excerpt for `generate_title`
    #[serde(default)]
    pub dialogue: Option<String>,

    #[serde(default)]
    pub mode: JobMode,

    #[serde(default)]
    pub config: JobConfig,
}

fn default_operation() -> String {
    Operation::ProcessVideo.as_str().to_string()
}

fn default_anime_name() -> String {
    "Anime".to_string()
}

impl JobInput {
    /// Resolve the operation name.
    pub fn operation(&self) -> Option<Operation> {
        Operation::parse(&self.operation)
    }

    /// Parsed `video_url`, when present and an http(s) URL.
    pub fn video_url(&self) -> Result<Url, JobInputError> {
        parse_http_url(self.video_url.as_deref(), "video_url")
    }

    /// Parsed `audio_url`, when present and an http(s) URL.
    pub fn audio_url(&self) -> Result<Url, JobInputError> {
        parse_http_url(self.audio_url.as_deref(), "audio_url")
    }
}

fn parse_http_url(value: Option<&str>, field: &'static str) -> Result<Url, JobInputError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(JobInputError::MissingField(field))?;
    let url = Url::parse(raw).map_err(|e| JobInputError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(JobInputError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Problems with the `input` object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobInputError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
}

/// The `config` object of a job. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JobConfig {
    // Title overlay
    #[serde(default)]
    pub font_filename: Option<String>,
    #[serde(default)]
    pub font_size: Option<u32>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub stroke_color: Option<String>,
    #[serde(default)]
    pub stroke_width: Option<u32>,
    #[serde(default)]
    pub pos_vertical: Option<f64>,

    // Composition
    #[serde(default)]
    pub template_path: Option<String>,
    #[serde(default)]
    pub video_pos_vertical: Option<f64>,
    #[serde(default)]
    pub smart_crop: bool,
    #[serde(default)]
    pub anti_shadowban: bool,
    #[serde(default)]
    pub prefer_hardware_encoder: Option<bool>,

    // Captions
    #[serde(default)]
    pub captions: bool,
    #[serde(default)]
    pub caption_position: Option<CaptionPosition>,
    #[serde(default)]
    pub caption_highlight: Option<bool>,

    /// Generate titles with the language model
    #[serde(default, alias = "usar_ia")]
    pub use_ai: bool,

    // Planning
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub min_duration: Option<f64>,
    #[serde(default)]
    pub max_duration: Option<f64>,
    #[serde(default)]
    pub max_clips: Option<usize>,
    /// Number of cuts for manual / sequential mode
    #[serde(default)]
    pub clip_count: Option<usize>,
    /// Cut length in seconds for manual / sequential mode
    #[serde(default)]
    pub clip_duration: Option<f64>,
    /// Sequential mode start offset in minutes
    #[serde(default)]
    pub start_minute: Option<f64>,
    /// Scene detection sensitivity (10-50)
    #[serde(default)]
    pub sensitivity: Option<f64>,
}

impl JobConfig {
    /// Build render options, applying defaults for anything unset.
    pub fn render_options(&self, default_prefer_hardware: bool) -> RenderOptions {
        let defaults = RenderOptions::default();
        RenderOptions {
            layout: if self.smart_crop {
                Layout::SmartCrop
            } else {
                Layout::Fit
            },
            background: defaults.background,
            template_path: self.template_path.clone(),
            video_pos_vertical: self
                .video_pos_vertical
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(defaults.video_pos_vertical),
            font_filename: self
                .font_filename
                .clone()
                .unwrap_or(defaults.font_filename),
            font_size: self.font_size,
            text_color: self
                .text_color
                .as_deref()
                .map(Rgb::parse_or_white)
                .unwrap_or(defaults.text_color),
            stroke_color: self
                .stroke_color
                .as_deref()
                .map(Rgb::parse_or_white)
                .unwrap_or(defaults.stroke_color),
            stroke_width: self.stroke_width.unwrap_or(defaults.stroke_width),
            pos_vertical: self
                .pos_vertical
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(defaults.pos_vertical),
            anti_shadowban: self.anti_shadowban,
            prefer_hardware_encoder: self
                .prefer_hardware_encoder
                .unwrap_or(default_prefer_hardware),
            captions: self.captions.then(|| CaptionOptions {
                position: self.caption_position.unwrap_or_default(),
                highlight: self.caption_highlight.unwrap_or(true),
                ..CaptionOptions::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_envelope() {
        let json = r##"{
            "input": {
                "video_url": "https://cdn.example.com/ep1.mp4",
                "anime_name": "Naruto",
                "mode": "auto",
                "config": {
                    "font_size": 70,
                    "text_color": "#FFD700",
                    "stroke_color": "#000000",
                    "stroke_width": 6,
                    "pos_vertical": 0.15,
                    "anti_shadowban": true,
                    "usar_ia": true
                }
            }
        }"##;
        let request: JobRequest = serde_json::from_str(json).unwrap();
        let input = request.input;

        assert_eq!(input.operation(), Some(Operation::ProcessVideo));
        assert_eq!(input.mode, JobMode::Auto);
        assert_eq!(input.anime_name, "Naruto");
        assert!(input.config.use_ai);
        assert!(input.config.anti_shadowban);
        assert_eq!(input.video_url().unwrap().host_str(), Some("cdn.example.com"));

        let options = input.config.render_options(true);
        assert_eq!(options.text_color, Rgb(255, 215, 0));
        assert_eq!(options.font_size, Some(70));
        assert_eq!(options.layout, Layout::Fit);
        assert!(options.captions.is_none());
    }

    #[test]
    fn test_minimal_envelope_defaults() {
        let request: JobRequest = serde_json::from_str(r#"{"input":{}}"#).unwrap();
        assert_eq!(request.input.operation, "process_video");
        assert_eq!(request.input.anime_name, "Anime");
        assert_eq!(request.input.mode, JobMode::Auto);
        assert_eq!(
            request.input.video_url(),
            Err(JobInputError::MissingField("video_url"))
        );
    }

    #[test]
    fn test_unknown_operation_is_kept() {
        let request: JobRequest =
            serde_json::from_str(r#"{"input":{"operation":"explode"}}"#).unwrap();
        assert_eq!(request.input.operation, "explode");
        assert!(request.input.operation().is_none());
    }

    #[test]
    fn test_non_http_url_rejected() {
        let input: JobInput =
            serde_json::from_str(r#"{"video_url":"file:///etc/passwd"}"#).unwrap();
        assert!(matches!(
            input.video_url(),
            Err(JobInputError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_render_options_smart_crop_and_captions() {
        let config: JobConfig = serde_json::from_str(
            r#"{"smart_crop":true,"captions":true,"caption_position":"bottom","prefer_hardware_encoder":false}"#,
        )
        .unwrap();
        let options = config.render_options(true);
        assert_eq!(options.layout, Layout::SmartCrop);
        assert!(!options.prefer_hardware_encoder);
        let captions = options.captions.unwrap();
        assert_eq!(captions.position, CaptionPosition::Bottom);
        assert!(captions.highlight);
    }

    #[test]
    fn test_job_id_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }
}
