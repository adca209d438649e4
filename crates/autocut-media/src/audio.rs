//! Audio extraction for transcription.

use std::path::Path;

use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Sample rate expected by speech models.
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16_000;

/// Write the audio of `video` (or of `[start, start + duration)`) to `output`
/// as 16 kHz mono 16-bit PCM WAV.
pub async fn extract_audio(
    runner: &FfmpegRunner,
    video: &Path,
    output: &Path,
    range: Option<(f64, f64)>,
) -> MediaResult<()> {
    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    let cmd = audio_command(video, output, range);
    debug!(video = %video.display(), output = %output.display(), "Extracting audio");
    runner.run(&cmd).await
}

fn audio_command(video: &Path, output: &Path, range: Option<(f64, f64)>) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(video, output);
    if let Some((start, duration)) = range {
        cmd = cmd.seek(start.max(0.0)).duration(duration);
    }
    cmd.no_video().output_args([
        "-ac".to_string(),
        "1".to_string(),
        "-ar".to_string(),
        TRANSCRIPTION_SAMPLE_RATE.to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_file_command() {
        let args = audio_command(Path::new("ep.mp4"), Path::new("ep.wav"), None).build_args();
        assert!(!args.contains(&"-ss".to_string()));
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"16000".to_string()));
        assert!(args.contains(&"pcm_s16le".to_string()));
    }

    #[test]
    fn test_segment_command() {
        let args =
            audio_command(Path::new("ep.mp4"), Path::new("c.wav"), Some((90.0, 60.0))).build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "90.000");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "60.000");
    }

    #[tokio::test]
    async fn test_missing_source() {
        let err = extract_audio(
            &FfmpegRunner::new(),
            Path::new("/nonexistent/video.mp4"),
            Path::new("/tmp/out.wav"),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
