//! Word-by-word captions as an ASS subtitle track.
//!
//! Each transcribed word becomes one event, shown alone and in upper case at
//! the configured anchor. The track is burnt in by the `subtitles` filter.

use std::path::Path;

use autocut_models::{CaptionOptions, Rgb, OUTPUT_HEIGHT, OUTPUT_WIDTH};
use serde::{Deserialize, Serialize};

use crate::error::MediaResult;

/// Shortest time a word stays on screen (seconds).
pub const MIN_WORD_DURATION: f64 = 0.1;

/// A transcribed word with source-relative timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }
}

/// Words overlapping `[start, end)`, shifted so the clip starts at zero.
///
/// Words straddling the edges are trimmed to the clip.
pub fn words_for_clip(words: &[WordTiming], start: f64, end: f64) -> Vec<WordTiming> {
    words
        .iter()
        .filter(|w| w.end > start && w.start < end && !w.word.trim().is_empty())
        .map(|w| {
            WordTiming::new(
                w.word.trim(),
                (w.start.max(start) - start).max(0.0),
                w.end.min(end) - start,
            )
        })
        .collect()
}

/// Stretch timings by `1 / speed` to follow a sped-up render.
pub fn scale_timings(words: &mut [WordTiming], speed: f64) {
    if !(speed > 0.0) || speed == 1.0 {
        return;
    }
    for w in words.iter_mut() {
        w.start /= speed;
        w.end /= speed;
    }
}

/// Build a complete ASS document for the given clip-relative words.
pub fn build_ass(words: &[WordTiming], options: &CaptionOptions) -> String {
    let colour = if options.highlight {
        Rgb::YELLOW
    } else {
        Rgb::WHITE
    };
    let x = OUTPUT_WIDTH / 2;
    let y = (OUTPUT_HEIGHT as f64 * options.position.fraction()).round() as u32;

    let mut doc = format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         PlayResX: {w}\n\
         PlayResY: {h}\n\
         WrapStyle: 2\n\
         ScaledBorderAndShadow: yes\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
         Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, \
         Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Word,{font},{size},{colour},{colour},{outline},&H80000000,\
         -1,0,0,0,100,100,0,0,1,4,2,5,20,20,20,1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
        w = OUTPUT_WIDTH,
        h = OUTPUT_HEIGHT,
        font = options.font_name,
        size = options.font_size,
        colour = colour.to_ass(),
        outline = Rgb::BLACK.to_ass(),
    );

    for word in words {
        let end = word.end.max(word.start + MIN_WORD_DURATION);
        doc.push_str(&format!(
            "Dialogue: 0,{},{},Word,,0,0,0,,{{\\an5\\pos({},{})}}{}\n",
            ass_time(word.start),
            ass_time(end),
            x,
            y,
            escape_ass_text(&word.word.to_uppercase()),
        ));
    }

    doc
}

/// Write the ASS document for `words` to `path`.
pub async fn write_ass(path: &Path, words: &[WordTiming], options: &CaptionOptions) -> MediaResult<()> {
    tokio::fs::write(path, build_ass(words, options)).await?;
    Ok(())
}

/// `H:MM:SS.cc`
fn ass_time(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    format!(
        "{}:{:02}:{:02}.{:02}",
        centis / 360_000,
        (centis / 6_000) % 60,
        (centis / 100) % 60,
        centis % 100
    )
}

fn escape_ass_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocut_models::CaptionPosition;

    #[test]
    fn test_words_for_clip_shifts_and_trims() {
        let words = vec![
            WordTiming::new("before", 5.0, 9.5),
            WordTiming::new("edge", 9.8, 10.4),
            WordTiming::new("inside", 12.0, 12.5),
            WordTiming::new("  ", 13.0, 13.2),
            WordTiming::new("after", 70.0, 71.0),
        ];
        let clip = words_for_clip(&words, 10.0, 70.0);
        assert_eq!(clip.len(), 2);
        assert_eq!(clip[0].word, "edge");
        assert_eq!(clip[0].start, 0.0);
        assert!((clip[0].end - 0.4).abs() < 1e-9);
        assert_eq!(clip[1].start, 2.0);
    }

    #[test]
    fn test_scale_timings() {
        let mut words = vec![WordTiming::new("a", 1.05, 2.1)];
        scale_timings(&mut words, 1.05);
        assert!((words[0].start - 1.0).abs() < 1e-9);
        assert!((words[0].end - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_ass_time() {
        assert_eq!(ass_time(0.0), "0:00:00.00");
        assert_eq!(ass_time(61.257), "0:01:01.26");
        assert_eq!(ass_time(3725.5), "1:02:05.50");
    }

    #[test]
    fn test_build_ass() {
        let options = CaptionOptions {
            position: CaptionPosition::Bottom,
            ..Default::default()
        };
        let doc = build_ass(
            &[WordTiming::new("hola", 1.0, 1.02), WordTiming::new("{x}", 2.0, 2.5)],
            &options,
        );

        assert!(doc.contains("PlayResX: 1080"));
        // Yellow in BGR order
        assert!(doc.contains("&H0000FFFF"));
        // Short word stretched to the minimum
        assert!(doc.contains("Dialogue: 0,0:00:01.00,0:00:01.10,Word,,0,0,0,,{\\an5\\pos(540,1536)}HOLA"));
        assert!(doc.contains("\\{X\\}"));
    }

    #[test]
    fn test_plain_white_without_highlight() {
        let options = CaptionOptions {
            highlight: false,
            ..Default::default()
        };
        let doc = build_ass(&[], &options);
        assert!(doc.contains("Style: Word,Arial,70,&H00FFFFFF,&H00FFFFFF"));
        assert!(!doc.contains("Dialogue:"));
    }
}
