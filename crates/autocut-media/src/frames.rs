//! Sampled raw frames decoded by FFmpeg.
//!
//! FFmpeg scales and converts the frames itself and writes them to stdout as
//! `rawvideo`; frames are read one at a time so long sources never sit in
//! memory.

use std::path::Path;
use std::process::Stdio;

use image::{GrayImage, RgbImage};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};

/// Pixel layout of the decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray,
    Rgb24,
}

impl PixelFormat {
    fn ffmpeg_name(&self) -> &'static str {
        match self {
            PixelFormat::Gray => "gray",
            PixelFormat::Rgb24 => "rgb24",
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb24 => 3,
        }
    }
}

/// What to decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSampling {
    /// Frames per second of source time
    pub sample_fps: f64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Optional `(start, duration)` window in seconds
    pub range: Option<(f64, f64)>,
}

impl FrameSampling {
    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    fn args(&self, path: &Path) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        if let Some((start, duration)) = self.range {
            args.extend([
                "-ss".to_string(),
                format!("{:.3}", start.max(0.0)),
                "-t".to_string(),
                format!("{:.3}", duration),
            ]);
        }
        args.extend([
            "-i".to_string(),
            path.to_string_lossy().to_string(),
            "-an".to_string(),
            "-vf".to_string(),
            format!(
                "fps={},scale={}:{}",
                self.sample_fps, self.width, self.height
            ),
            "-pix_fmt".to_string(),
            self.format.ffmpeg_name().to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-".to_string(),
        ]);
        args
    }
}

/// A running decoder yielding one frame at a time.
pub struct FrameStream {
    child: Child,
    stdout: ChildStdout,
    sampling: FrameSampling,
    index: u64,
}

impl FrameStream {
    pub async fn open(path: &Path, sampling: FrameSampling) -> MediaResult<Self> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        if sampling.width == 0 || sampling.height == 0 || !(sampling.sample_fps > 0.0) {
            return Err(MediaError::invalid_video("Invalid frame sampling"));
        }
        check_ffmpeg()?;

        let args = sampling.args(path);
        debug!("Decoding frames: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None))?;

        Ok(Self {
            child,
            stdout,
            sampling,
            index: 0,
        })
    }

    /// Next raw frame, or `None` at the end of the stream.
    pub async fn next_raw(&mut self) -> MediaResult<Option<Vec<u8>>> {
        let mut buffer = vec![0u8; self.sampling.frame_len()];
        match self.stdout.read_exact(&mut buffer).await {
            Ok(_) => {
                self.index += 1;
                Ok(Some(buffer))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Next frame as a grayscale image. Requires [`PixelFormat::Gray`].
    pub async fn next_gray(&mut self) -> MediaResult<Option<GrayImage>> {
        debug_assert_eq!(self.sampling.format, PixelFormat::Gray);
        let (w, h) = (self.sampling.width, self.sampling.height);
        Ok(self
            .next_raw()
            .await?
            .and_then(|raw| GrayImage::from_raw(w, h, raw)))
    }

    /// Next frame as an RGB image. Requires [`PixelFormat::Rgb24`].
    pub async fn next_rgb(&mut self) -> MediaResult<Option<RgbImage>> {
        debug_assert_eq!(self.sampling.format, PixelFormat::Rgb24);
        let (w, h) = (self.sampling.width, self.sampling.height);
        Ok(self
            .next_raw()
            .await?
            .and_then(|raw| RgbImage::from_raw(w, h, raw)))
    }

    /// Frames returned so far.
    pub fn frames_read(&self) -> u64 {
        self.index
    }

    /// Stop decoding and reap the process.
    pub async fn close(mut self) -> MediaResult<()> {
        let _ = self.child.start_kill();
        match self.child.wait().await {
            Ok(status) if !status.success() && self.index == 0 => {
                warn!(code = ?status.code(), "Frame decoder produced no frames");
                Err(MediaError::ffmpeg_failed(
                    "Frame decoder produced no frames",
                    None,
                    status.code(),
                ))
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_args() {
        let sampling = FrameSampling {
            sample_fps: 4.0,
            width: 160,
            height: 90,
            format: PixelFormat::Gray,
            range: Some((12.0, 30.0)),
        };
        let args = sampling.args(Path::new("in.mp4"));
        assert!(args.contains(&"fps=4,scale=160:90".to_string()));
        assert!(args.contains(&"gray".to_string()));
        assert!(args.contains(&"12.000".to_string()));
        assert_eq!(sampling.frame_len(), 160 * 90);
    }

    #[test]
    fn test_rgb_frame_len() {
        let sampling = FrameSampling {
            sample_fps: 0.5,
            width: 64,
            height: 36,
            format: PixelFormat::Rgb24,
            range: None,
        };
        assert_eq!(sampling.frame_len(), 64 * 36 * 3);
        assert!(!sampling.args(Path::new("in.mp4")).contains(&"-ss".to_string()));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let sampling = FrameSampling {
            sample_fps: 1.0,
            width: 16,
            height: 16,
            format: PixelFormat::Gray,
            range: None,
        };
        let result = FrameStream::open(Path::new("/nonexistent.mp4"), sampling).await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
