//! Per-clip render options.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Longest clip the renderer will produce (seconds).
pub const MAX_RENDER_DURATION: f64 = 300.0;

/// An RGB colour, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const GOLD: Rgb = Rgb(255, 215, 0);
    /// Dark purple canvas behind fitted video
    pub const CANVAS: Rgb = Rgb(20, 10, 40);

    /// Parse `#RRGGBB`, `RRGGBB` or a basic colour name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            return Some(Rgb(channel(0)?, channel(2)?, channel(4)?));
        }

        match value.to_ascii_lowercase().as_str() {
            "white" => Some(Self::WHITE),
            "black" => Some(Self::BLACK),
            "yellow" => Some(Self::YELLOW),
            "gold" => Some(Self::GOLD),
            "red" => Some(Rgb(255, 0, 0)),
            "green" => Some(Rgb(0, 128, 0)),
            "blue" => Some(Rgb(0, 0, 255)),
            _ => None,
        }
    }

    /// Parse, falling back to white for anything unrecognised.
    pub fn parse_or_white(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::WHITE)
    }

    /// `#RRGGBB` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// FFmpeg colour syntax (`0xRRGGBB`).
    pub fn to_ffmpeg(&self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// ASS subtitle colour syntax (`&H00BBGGRR`).
    pub fn to_ass(&self) -> String {
        format!("&H00{:02X}{:02X}{:02X}", self.2, self.1, self.0)
    }
}

impl From<String> for Rgb {
    fn from(value: String) -> Self {
        Self::parse_or_white(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// How the source frame is placed on the vertical canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Scale to canvas width over a solid or template background
    #[default]
    Fit,
    /// Crop a 9:16 column around the tracked face
    SmartCrop,
}

/// Vertical placement of word captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPosition {
    Top,
    #[default]
    Center,
    Bottom,
}

impl CaptionPosition {
    /// Vertical anchor as a fraction of frame height.
    pub fn fraction(&self) -> f64 {
        match self {
            CaptionPosition::Top => 0.2,
            CaptionPosition::Center => 0.5,
            CaptionPosition::Bottom => 0.8,
        }
    }
}

/// Word-level caption styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionOptions {
    #[serde(default)]
    pub position: CaptionPosition,
    /// Draw each word in yellow instead of white
    #[serde(default = "default_true")]
    pub highlight: bool,
    #[serde(default = "default_caption_font")]
    pub font_name: String,
    #[serde(default = "default_caption_size")]
    pub font_size: u32,
}

fn default_true() -> bool {
    true
}
fn default_caption_font() -> String {
    "Arial".to_string()
}
fn default_caption_size() -> u32 {
    70
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            position: CaptionPosition::default(),
            highlight: true,
            font_name: default_caption_font(),
            font_size: default_caption_size(),
        }
    }
}

/// Everything the clip renderer needs besides the segment itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    #[serde(default)]
    pub layout: Layout,

    /// Canvas colour for [`Layout::Fit`]
    #[serde(default = "default_canvas")]
    pub background: Rgb,

    /// Background image for [`Layout::Fit`], overrides `background`
    #[serde(default)]
    pub template_path: Option<String>,

    /// Vertical placement of the fitted video (0.0 top, 1.0 bottom)
    #[serde(default = "default_video_position")]
    pub video_pos_vertical: f64,

    /// Title font file, resolved against the font directory
    #[serde(default = "default_font_filename")]
    pub font_filename: String,

    /// Title font size; defaults to 8% of the canvas width
    #[serde(default)]
    pub font_size: Option<u32>,

    #[serde(default = "default_text_color")]
    pub text_color: Rgb,

    #[serde(default = "default_stroke_color")]
    pub stroke_color: Rgb,

    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,

    /// Vertical placement of the title (0.0 top, 1.0 bottom)
    #[serde(default = "default_title_position")]
    pub pos_vertical: f64,

    /// Speed ramp, light noise and contrast tweak
    #[serde(default)]
    pub anti_shadowban: bool,

    /// Try NVENC before x264
    #[serde(default = "default_true")]
    pub prefer_hardware_encoder: bool,

    /// Word captions; `None` disables them
    #[serde(default)]
    pub captions: Option<CaptionOptions>,
}

fn default_canvas() -> Rgb {
    Rgb::CANVAS
}
fn default_video_position() -> f64 {
    0.5
}
fn default_font_filename() -> String {
    "arial.ttf".to_string()
}
fn default_text_color() -> Rgb {
    Rgb::WHITE
}
fn default_stroke_color() -> Rgb {
    Rgb::BLACK
}
fn default_stroke_width() -> u32 {
    6
}
fn default_title_position() -> f64 {
    0.15
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            background: default_canvas(),
            template_path: None,
            video_pos_vertical: default_video_position(),
            font_filename: default_font_filename(),
            font_size: None,
            text_color: default_text_color(),
            stroke_color: default_stroke_color(),
            stroke_width: default_stroke_width(),
            pos_vertical: default_title_position(),
            anti_shadowban: false,
            prefer_hardware_encoder: true,
            captions: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("#FFD700"), Some(Rgb(255, 215, 0)));
        assert_eq!(Rgb::parse("000000"), Some(Rgb::BLACK));
        assert_eq!(Rgb::parse("Yellow"), Some(Rgb::YELLOW));
        assert_eq!(Rgb::parse("#GGGGGG"), None);
        assert_eq!(Rgb::parse_or_white("not a colour"), Rgb::WHITE);
    }

    #[test]
    fn test_rgb_formats() {
        let gold = Rgb(255, 215, 0);
        assert_eq!(gold.to_hex(), "#FFD700");
        assert_eq!(gold.to_ffmpeg(), "0xFFD700");
        assert_eq!(gold.to_ass(), "&H0000D7FF");
    }

    #[test]
    fn test_render_options_from_partial_json() {
        let options: RenderOptions =
            serde_json::from_str(r##"{"text_color":"#FFD700","anti_shadowban":true}"##).unwrap();
        assert_eq!(options.text_color, Rgb(255, 215, 0));
        assert!(options.anti_shadowban);
        assert_eq!(options.stroke_width, 6);
        assert_eq!(options.pos_vertical, 0.15);
        assert!(options.prefer_hardware_encoder);
        assert!(options.captions.is_none());
    }

    #[test]
    fn test_caption_position_fraction() {
        assert_eq!(CaptionPosition::Top.fraction(), 0.2);
        assert_eq!(CaptionPosition::Bottom.fraction(), 0.8);
    }
}
