//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("AI request failed: {0}")]
    AiFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid job input: {0}")]
    InvalidInput(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Media error: {0}")]
    Media(#[from] autocut_media::MediaError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn transcription_failed(msg: impl Into<String>) -> Self {
        Self::TranscriptionFailed(msg.into())
    }

    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::DownloadFailed(_) | WorkerError::AiFailed(_) => true,
            WorkerError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Whether the caller asked for the work to stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled)
            || matches!(self, WorkerError::Media(e) if e.is_cancelled())
    }
}

impl From<autocut_models::JobInputError> for WorkerError {
    fn from(err: autocut_models::JobInputError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(WorkerError::ai_failed("503").is_retryable());
        assert!(WorkerError::download_failed("reset").is_retryable());
        assert!(!WorkerError::invalid_input("bad url").is_retryable());
        assert!(!WorkerError::UnknownOperation("x".into()).is_retryable());
    }

    #[test]
    fn test_cancelled_through_media() {
        assert!(WorkerError::Cancelled.is_cancelled());
        assert!(WorkerError::Media(autocut_media::MediaError::Cancelled).is_cancelled());
        assert!(!WorkerError::job_failed("x").is_cancelled());
    }

    #[test]
    fn test_from_job_input_error() {
        let err: WorkerError = autocut_models::JobInputError::MissingField("video_url").into();
        assert_eq!(
            err.to_string(),
            "Invalid job input: missing required field 'video_url'"
        );
    }
}
