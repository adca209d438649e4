//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default transcript characters sent with a proposal request.
pub const DEFAULT_TRANSCRIPT_CHAR_BUDGET: usize = 12_000;

/// Default Gemini models, tried in order.
pub const DEFAULT_GEMINI_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scratch space for downloads and intermediate files
    pub work_dir: PathBuf,
    /// Where finished clips are written
    pub output_dir: PathBuf,
    /// Transcript characters included in a proposal prompt
    pub transcript_char_budget: usize,
    /// Upper bound on a single language-model call
    pub llm_timeout: Duration,
    /// Upper bound on a single FFmpeg encode
    pub render_timeout: Duration,
    pub prefer_hardware_encoder: bool,
    pub whisper_bin: String,
    pub whisper_model: String,
    /// Language passed to the transcriber
    pub transcript_language: String,
    /// Directory searched recursively for title fonts
    pub font_dir: Option<PathBuf>,
    /// Prometheus listen address; metrics are off when unset
    pub metrics_addr: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/autocut"),
            output_dir: PathBuf::from("/tmp/autocut/output"),
            transcript_char_budget: DEFAULT_TRANSCRIPT_CHAR_BUDGET,
            llm_timeout: Duration::from_secs(300),
            render_timeout: Duration::from_secs(1800),
            prefer_hardware_encoder: true,
            whisper_bin: "whisper".to_string(),
            whisper_model: "medium".to_string(),
            transcript_language: "pt".to_string(),
            font_dir: None,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("AUTOCUT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("AUTOCUT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            transcript_char_budget: std::env::var("AUTOCUT_TRANSCRIPT_CHAR_BUDGET")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.transcript_char_budget),
            llm_timeout: std::env::var("AUTOCUT_LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.llm_timeout),
            render_timeout: std::env::var("AUTOCUT_RENDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_timeout),
            prefer_hardware_encoder: std::env::var("AUTOCUT_PREFER_HARDWARE_ENCODER")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.prefer_hardware_encoder),
            whisper_bin: std::env::var("AUTOCUT_WHISPER_BIN").unwrap_or(defaults.whisper_bin),
            whisper_model: std::env::var("AUTOCUT_WHISPER_MODEL").unwrap_or(defaults.whisper_model),
            transcript_language: std::env::var("AUTOCUT_TRANSCRIPT_LANGUAGE")
                .unwrap_or(defaults.transcript_language),
            font_dir: std::env::var("AUTOCUT_FONT_DIR").ok().map(PathBuf::from),
            metrics_addr: std::env::var("METRICS_ADDR").ok().filter(|s| !s.is_empty()),
        }
    }
}

/// Gemini API settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub models: Vec<String>,
    pub base_url: String,
}

impl GeminiConfig {
    /// `None` when `GEMINI_API_KEY` is not set; AI features are then skipped.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let models = std::env::var("GEMINI_MODELS")
            .ok()
            .map(|s| parse_model_list(&s))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(default_models);

        Some(Self {
            api_key,
            models,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
        })
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            models: default_models(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }
}

fn default_models() -> Vec<String> {
    DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect()
}

fn parse_model_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
