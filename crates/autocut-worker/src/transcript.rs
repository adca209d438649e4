//! Speech transcription seam and the Whisper CLI implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use autocut_media::WordTiming;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};
use crate::session::ManagedModel;

/// Transcribed text plus word timings relative to the audio start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub words: Vec<WordTiming>,
}

impl Transcript {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Text spoken inside `[start, end)`.
    pub fn text_between(&self, start: f64, end: f64) -> String {
        self.words
            .iter()
            .filter(|w| w.start >= start && w.start < end)
            .map(|w| w.word.trim())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Speech-to-text model.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> WorkerResult<Transcript>;

    fn name(&self) -> &str;
}

/// Runs the `whisper` command-line tool with word timestamps.
#[derive(Debug, Clone)]
pub struct WhisperCli {
    binary: String,
    model: String,
    language: String,
    output_dir: PathBuf,
}

impl WhisperCli {
    pub fn new(
        binary: impl Into<String>,
        model: impl Into<String>,
        language: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            language: language.into(),
            output_dir: output_dir.into(),
        }
    }

    fn args(&self, audio: &Path) -> Vec<String> {
        vec![
            audio.to_string_lossy().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--language".to_string(),
            self.language.clone(),
            "--task".to_string(),
            "transcribe".to_string(),
            "--word_timestamps".to_string(),
            "True".to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            self.output_dir.to_string_lossy().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ]
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, audio: &Path) -> WorkerResult<Transcript> {
        if !audio.exists() {
            return Err(WorkerError::transcription_failed(format!(
                "audio not found: {}",
                audio.display()
            )));
        }
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let args = self.args(audio);
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                WorkerError::transcription_failed(format!("failed to run {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(WorkerError::transcription_failed(format!(
                "{} exited with {:?}: {}",
                self.binary,
                output.status.code(),
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }

        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let json_path = self.output_dir.join(format!("{}.json", stem));
        let raw = tokio::fs::read(&json_path).await?;
        let transcript = parse_whisper_json(&raw)?;
        let _ = tokio::fs::remove_file(&json_path).await;

        // Size only; transcript text stays out of the logs
        info!(
            chars = transcript.char_count(),
            words = transcript.words.len(),
            "Transcription complete"
        );
        Ok(transcript)
    }

    fn name(&self) -> &str {
        "whisper"
    }
}

#[async_trait]
impl ManagedModel for WhisperCli {
    fn name(&self) -> &str {
        "whisper"
    }

    /// The model itself loads per invocation; only the binary is checked.
    async fn load(&self) -> WorkerResult<()> {
        which::which(&self.binary).map_err(|e| {
            WorkerError::config_error(format!("{} not found: {}", self.binary, e))
        })?;
        Ok(())
    }

    fn release(&self) {}
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// Parse Whisper's JSON output.
pub fn parse_whisper_json(raw: &[u8]) -> WorkerResult<Transcript> {
    let output: WhisperOutput = serde_json::from_slice(raw)?;
    let words = output
        .segments
        .into_iter()
        .flat_map(|s| s.words)
        .filter(|w| w.start.is_finite() && w.end.is_finite())
        .map(|w| WordTiming::new(w.word.trim(), w.start, w.end))
        .filter(|w| !w.word.is_empty())
        .collect();

    Ok(Transcript {
        text: output.text.trim().to_string(),
        words,
    })
}
