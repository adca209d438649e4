//! FFmpeg filter graphs for vertical clips.
//!
//! A render is a single-input `-filter_complex` graph ending in `[vout]`
//! (and `[aout]` when the audio is retimed). Background images are pulled in
//! with the `movie` source filter so the command keeps one input.

use std::path::{Path, PathBuf};

use autocut_models::{Layout, RenderOptions, OUTPUT_HEIGHT, OUTPUT_WIDTH};

use crate::smart_crop::CropWindow;

/// Playback speed applied by the anti-shadowban treatment.
pub const SPEED_FACTOR: f64 = 1.05;

/// Light temporal noise and a contrast nudge.
pub const ANTI_SHADOWBAN_FILTER: &str = "noise=alls=1:allf=t,eq=contrast=1.02";

/// Title lines never exceed this share of the canvas width.
const TITLE_WIDTH_BUDGET: f64 = 0.9;
/// Rough advance of one glyph relative to the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.55;
const MAX_TITLE_LINES: usize = 2;
/// Offset of the first title line below the anchor, and the gap between lines.
const TITLE_TOP_PADDING: u32 = 20;
const TITLE_LINE_GAP: u32 = 15;

/// Escape a path for use inside a single-quoted filter argument.
///
/// Backslash escapes pass through the graph-level quotes untouched and are
/// resolved by the option parser. Quotes cannot be escaped inside quotes, so
/// a `'` closes the quote, is emitted escaped, and the quote is reopened.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'\\''")
}

/// Default title size: 8% of the canvas width.
pub fn default_title_font_size() -> u32 {
    (OUTPUT_WIDTH as f64 * 0.08) as u32
}

/// Greedy word wrap into at most two lines that fit the width budget.
///
/// Words that do not fit once two lines are full are dropped.
pub fn wrap_title(text: &str, font_size: u32) -> Vec<String> {
    let budget = OUTPUT_WIDTH as f64 * TITLE_WIDTH_BUDGET;
    let glyph = font_size as f64 * GLYPH_WIDTH_RATIO;
    let fits = |line: &str| line.chars().count() as f64 * glyph <= budget;

    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        current.push(word);
        if !fits(&current.join(" ")) {
            current.pop();
            if !current.is_empty() {
                lines.push(current.join(" "));
            }
            current = vec![word];
            if lines.len() >= MAX_TITLE_LINES {
                current.clear();
                break;
            }
        }
    }
    if !current.is_empty() && lines.len() < MAX_TITLE_LINES {
        lines.push(current.join(" "));
    }

    lines.truncate(MAX_TITLE_LINES);
    lines
}

/// Title text prepared for `drawtext`.
///
/// Each line lives in its own text file so no user text is ever spliced into
/// the filter string.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleOverlay {
    pub line_files: Vec<PathBuf>,
    pub font_path: PathBuf,
    pub font_size: u32,
}

impl TitleOverlay {
    /// Top edge of each line on the canvas.
    pub fn line_offsets(&self, pos_vertical: f64) -> Vec<u32> {
        let anchor = (OUTPUT_HEIGHT as f64 * pos_vertical.clamp(0.0, 1.0)).round() as u32;
        (0..self.line_files.len() as u32)
            .map(|i| anchor + TITLE_TOP_PADDING + i * (self.font_size + TITLE_LINE_GAP))
            .collect()
    }
}

/// Everything the graph depends on besides the render options.
#[derive(Debug, Clone, Default)]
pub struct GraphInputs<'a> {
    pub crop: Option<CropWindow>,
    pub title: Option<&'a TitleOverlay>,
    pub subtitles: Option<&'a Path>,
    pub has_audio: bool,
    /// Source frame rate, used for the generated background
    pub fps: f64,
}

/// A finished filter graph and the output streams to map.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub graph: String,
    pub video_map: String,
    pub audio_map: Option<String>,
}

/// Build the complete graph for one clip.
pub fn build_render_graph(options: &RenderOptions, inputs: &GraphInputs<'_>) -> FilterGraph {
    let speed = if options.anti_shadowban {
        format!("setpts=PTS/{},", SPEED_FACTOR)
    } else {
        String::new()
    };

    let mut chains = match (options.layout, inputs.crop) {
        (Layout::SmartCrop, Some(crop)) => vec![smart_crop_chain(&speed, crop)],
        _ => fit_chains(&speed, options, inputs.fps),
    };

    let mut post: Vec<String> = Vec::new();
    if let Some(title) = inputs.title {
        post.extend(title_filters(title, options));
    }
    if let Some(subtitles) = inputs.subtitles {
        post.push(format!(
            "subtitles='{}'",
            escape_filter_path(&subtitles.to_string_lossy())
        ));
    }
    if options.anti_shadowban {
        post.push(ANTI_SHADOWBAN_FILTER.to_string());
    }
    post.push("format=yuv420p".to_string());
    chains.push(format!("[base]{}[vout]", post.join(",")));

    let audio_map = match (inputs.has_audio, options.anti_shadowban) {
        (false, _) => None,
        (true, true) => {
            chains.push(format!("[0:a]atempo={}[aout]", SPEED_FACTOR));
            Some("[aout]".to_string())
        }
        (true, false) => Some("0:a:0".to_string()),
    };

    FilterGraph {
        graph: chains.join(";"),
        video_map: "[vout]".to_string(),
        audio_map,
    }
}

/// Scale to canvas width and lay over a colour or template background.
fn fit_chains(speed: &str, options: &RenderOptions, fps: f64) -> Vec<String> {
    let fps = if fps > 0.0 { fps } else { 30.0 };
    let background = match options.template_path.as_deref() {
        Some(template) => format!(
            "movie='{}',scale={w}:{h},setsar=1,loop=loop=-1:size=1:start=0,fps={fps}[bg]",
            escape_filter_path(template),
            w = OUTPUT_WIDTH,
            h = OUTPUT_HEIGHT,
        ),
        None => format!(
            "color=c={}:s={}x{}:r={}[bg]",
            options.background.to_ffmpeg(),
            OUTPUT_WIDTH,
            OUTPUT_HEIGHT,
            fps
        ),
    };

    vec![
        background,
        format!("[0:v]{}scale={}:-2,setsar=1[fg]", speed, OUTPUT_WIDTH),
        format!(
            "[bg][fg]overlay=(W-w)/2:(H-h)*{:.3}:shortest=1[base]",
            options.video_pos_vertical.clamp(0.0, 1.0)
        ),
    ]
}

/// Crop the tracked column and fill the canvas with it.
fn smart_crop_chain(speed: &str, crop: CropWindow) -> String {
    format!(
        "[0:v]{speed}crop={cw}:{ch}:{cx}:0,\
         scale={w}:{h}:force_original_aspect_ratio=increase,\
         crop={w}:{h},setsar=1[base]",
        speed = speed,
        cw = crop.width,
        ch = crop.height,
        cx = crop.x,
        w = OUTPUT_WIDTH,
        h = OUTPUT_HEIGHT,
    )
}

fn title_filters(title: &TitleOverlay, options: &RenderOptions) -> Vec<String> {
    let font = escape_filter_path(&title.font_path.to_string_lossy());
    title
        .line_files
        .iter()
        .zip(title.line_offsets(options.pos_vertical))
        .map(|(file, y)| {
            format!(
                "drawtext=fontfile='{font}':textfile='{file}':expansion=none:\
                 fontsize={size}:fontcolor={color}:borderw={border}:bordercolor={stroke}:\
                 x=(w-text_w)/2:y={y}",
                font = font,
                file = escape_filter_path(&file.to_string_lossy()),
                size = title.font_size,
                color = options.text_color.to_ffmpeg(),
                border = options.stroke_width,
                stroke = options.stroke_color.to_ffmpeg(),
                y = y,
            )
        })
        .collect()
}
