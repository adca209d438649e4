//! Video encoder profiles.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Hardware (NVENC) video codec
pub const HARDWARE_VIDEO_CODEC: &str = "h264_nvenc";
/// Software video codec
pub const SOFTWARE_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// Constant quality shared by both profiles (0-51, lower is better)
pub const DEFAULT_QUALITY: u8 = 23;

/// Output canvas for vertical clips.
pub const OUTPUT_WIDTH: u32 = 1080;
pub const OUTPUT_HEIGHT: u32 = 1920;

/// Which kind of encoder produced (or should produce) a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    /// Accelerator-backed encoder (NVENC)
    Hardware,
    /// CPU encoder (x264)
    Software,
}

impl EncoderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderKind::Hardware => "hardware",
            EncoderKind::Software => "software",
        }
    }
}

impl std::fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encoder settings for a single render attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncoderProfile {
    pub kind: EncoderKind,

    /// Video codec (e.g., "h264_nvenc", "libx264")
    pub codec: String,

    /// Encoding preset
    pub preset: String,

    /// Constant quality (`-cq:v` for NVENC, `-crf` for x264)
    pub quality: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl EncoderProfile {
    /// NVENC profile: variable bitrate, 5M target / 8M peak.
    pub fn hardware() -> Self {
        Self {
            kind: EncoderKind::Hardware,
            codec: HARDWARE_VIDEO_CODEC.to_string(),
            preset: "fast".to_string(),
            quality: DEFAULT_QUALITY,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            extra_args: vec![
                "-rc:v".to_string(),
                "vbr".to_string(),
                "-b:v".to_string(),
                "5M".to_string(),
                "-maxrate:v".to_string(),
                "8M".to_string(),
                "-bufsize:v".to_string(),
                "10M".to_string(),
            ],
        }
    }

    /// x264 profile used as the fallback when the hardware encoder fails.
    pub fn software() -> Self {
        Self {
            kind: EncoderKind::Software,
            codec: SOFTWARE_VIDEO_CODEC.to_string(),
            preset: "ultrafast".to_string(),
            quality: DEFAULT_QUALITY,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            extra_args: Vec::new(),
        }
    }

    /// Profiles to try in order.
    pub fn attempt_order(prefer_hardware: bool) -> Vec<Self> {
        if prefer_hardware {
            vec![Self::hardware(), Self::software()]
        } else {
            vec![Self::software()]
        }
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-profile:v".to_string(),
            "high".to_string(),
            "-level".to_string(),
            "4.1".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ];

        // CRF is not used with NVENC, use -cq instead
        match self.kind {
            EncoderKind::Hardware => {
                args.extend_from_slice(&["-cq:v".to_string(), self.quality.to_string()])
            }
            EncoderKind::Software => {
                args.extend_from_slice(&["-crf".to_string(), self.quality.to_string()])
            }
        }

        args.extend(self.extra_args.clone());

        args.extend_from_slice(&[
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]);

        args
    }
}
