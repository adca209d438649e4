//! AutoCut job worker.
//!
//! This crate provides:
//! - Job envelope handling for `process_video`, `transcribe_audio` and
//!   `generate_title`
//! - Language-model proposals and viral titles (Gemini)
//! - Whisper transcription
//! - Scoped model sessions and progress events
//! - Sequential clip rendering with per-clip failure isolation

pub mod config;
pub mod download;
pub mod error;
pub mod job;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod proposals;
pub mod retry;
pub mod session;
pub mod titles;
pub mod transcript;

pub use config::{GeminiConfig, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use job::JobHandler;
pub use llm::{CompletionRequest, GeminiClient, LanguageModel};
pub use logging::JobLogger;
pub use pipeline::{render_batch, BatchReport, ClipFailure};
pub use progress::{ProgressEvent, ProgressReporter, Stage};
pub use session::{ManagedModel, ModelSession};
pub use transcript::{Transcriber, Transcript, WhisperCli};
