//! Job envelope handling.
//!
//! [`JobHandler::handle`] always answers with a JSON value: the operation's
//! result, or `{"error": "..."}` when the job had to be aborted.

use std::path::Path;
use std::sync::Arc;

use autocut_media::{
    detect_scene_changes, extract_audio, plan_smart_crop, probe_video, ClipRenderer, CropWindow,
    FaceDetector, FfmpegClipRenderer, FfmpegRunner, RenderRequest, SceneDetectConfig,
    SmartCropConfig, VideoInfo,
};
use autocut_models::{
    JobConfig, JobId, JobInput, JobMode, JobRequest, Layout, Operation, PlannerConfig,
    Segment,
};
use autocut_planner::{PlanOutcome, Schedule, SegmentPlanner};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::watch;
use tracing::{info, warn, Instrument};

use crate::config::{GeminiConfig, WorkerConfig};
use crate::download::download_to_file;
use crate::error::{WorkerError, WorkerResult};
use crate::llm::{GeminiClient, LanguageModel};
use crate::logging::JobLogger;
use crate::metrics;
use crate::pipeline::{render_batch, BatchReport, CurrentClip};
use crate::progress::{run_cancellable, ProgressReporter, Stage};
use crate::proposals::propose_segments;
use crate::session::{ManagedModel, ModelSession};
use crate::titles::generate_title;
use crate::transcript::{Transcriber, Transcript, WhisperCli};

/// Default cut count for manual and sequential modes.
pub const DEFAULT_CLIP_COUNT: usize = 5;
/// Default cut length for manual and sequential modes (seconds).
pub const DEFAULT_CLIP_DURATION: f64 = 60.0;
/// Default scene-detection sensitivity.
pub const DEFAULT_SENSITIVITY: f64 = 30.0;

/// Runs jobs against the configured collaborators.
pub struct JobHandler {
    config: WorkerConfig,
    http: Client,
    runner: FfmpegRunner,
    planner: SegmentPlanner,
    language_model: Option<Arc<dyn LanguageModel>>,
    transcriber: Arc<dyn Transcriber>,
    face_detector: Option<Arc<dyn FaceDetector>>,
    renderer: Option<Arc<dyn ClipRenderer>>,
    managed_models: Vec<Arc<dyn ManagedModel>>,
    reporter: ProgressReporter,
    current_clip: CurrentClip,
    cancel: Option<watch::Receiver<bool>>,
}

impl JobHandler {
    /// Handler wired to Whisper, FFmpeg and, when configured, Gemini.
    pub fn from_config(config: WorkerConfig, gemini: Option<GeminiConfig>) -> WorkerResult<Self> {
        let language_model: Option<Arc<dyn LanguageModel>> = match gemini {
            Some(gemini) => Some(Arc::new(GeminiClient::new(gemini, config.llm_timeout)?)),
            None => None,
        };
        let whisper = Arc::new(WhisperCli::new(
            config.whisper_bin.clone(),
            config.whisper_model.clone(),
            config.transcript_language.clone(),
            config.work_dir.join("transcripts"),
        ));
        let runner = FfmpegRunner::new().with_timeout(config.render_timeout.as_secs());

        Ok(Self {
            http: Client::builder().build()?,
            runner,
            planner: SegmentPlanner::new(),
            language_model,
            transcriber: whisper.clone(),
            face_detector: None,
            renderer: None,
            managed_models: vec![whisper],
            reporter: ProgressReporter::disabled(),
            current_clip: CurrentClip::default(),
            cancel: None,
            config,
        })
    }

    pub fn with_language_model(mut self, model: Option<Arc<dyn LanguageModel>>) -> Self {
        self.language_model = model;
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn with_face_detector(mut self, detector: Arc<dyn FaceDetector>) -> Self {
        self.face_detector = Some(detector);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ClipRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Models loaded for the duration of each `process_video` job.
    pub fn with_managed_models(mut self, models: Vec<Arc<dyn ManagedModel>>) -> Self {
        self.managed_models = models;
        self
    }

    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.runner = self.runner.clone().with_cancel(cancel.clone());
        self.cancel = Some(cancel);
        self
    }

    /// Run one job and build its response.
    pub async fn handle(&self, request: JobRequest) -> Value {
        let input = request.input;
        let job_id = JobId::new();

        let Some(operation) = input.operation() else {
            let err = WorkerError::UnknownOperation(input.operation.clone());
            JobLogger::unrecognised(&job_id, &input.operation).failed(&err);
            metrics::record_job(&input.operation, "rejected");
            return error_response(&err);
        };

        let mut logger = JobLogger::new(&job_id, operation);
        if operation == Operation::ProcessVideo {
            logger = logger.with_mode(input.mode);
        }
        let span = logger.span();
        async {
            logger.started();
            let result = match operation {
                Operation::ProcessVideo => self.process_video(&input, &logger).await,
                Operation::TranscribeAudio => self.transcribe_audio(&input).await,
                Operation::GenerateTitle => self.generate_title(&input).await,
            };

            match result {
                Ok(mut response) => {
                    logger.completed();
                    metrics::record_job(operation.as_str(), "completed");
                    if let Value::Object(map) = &mut response {
                        map.insert("job_id".to_string(), json!(job_id));
                        map.insert(
                            "finished_at".to_string(),
                            json!(chrono::Utc::now().to_rfc3339()),
                        );
                    }
                    response
                }
                Err(e) => {
                    logger.failed(&e);
                    metrics::record_job(operation.as_str(), "failed");
                    error_response(&e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn process_video(&self, input: &JobInput, logger: &JobLogger) -> WorkerResult<Value> {
        let url = input.video_url()?;
        let job_dir = self.job_dir().await?;
        let mut warnings: Vec<String> = Vec::new();

        self.reporter.stage(Stage::Downloading);
        let source = download_to_file(&self.http, &url, job_dir.path(), "source", "mp4")
            .await
            .map_err(|e| match e {
                WorkerError::InvalidInput(msg) => WorkerError::download_failed(msg),
                other => other,
            })?;

        let result = self
            .process_source(input, logger, &source, job_dir.path(), &mut warnings)
            .await;

        if let Err(e) = tokio::fs::remove_file(&source).await {
            warn!(path = %source.display(), error = %e, "Failed to remove source video");
        }

        let (outcome, report) = result?;
        logger.warnings(&warnings);

        Ok(json!({
            "status": "completed",
            "mode": input.mode.as_str(),
            "plan_source": outcome.source.as_str(),
            "segments": outcome.segments,
            "dropped": outcome.dropped,
            "warnings": warnings,
            "clips": report.clips,
            "failures": report.failures,
        }))
    }

    async fn process_source(
        &self,
        input: &JobInput,
        logger: &JobLogger,
        source: &Path,
        job_dir: &Path,
        warnings: &mut Vec<String>,
    ) -> WorkerResult<(PlanOutcome, BatchReport)> {
        self.reporter.stage(Stage::Probing);
        let info = probe_video(source).await?;
        logger.source_probed(&info);

        let _session = match ModelSession::acquire(self.managed_models.clone()).await {
            Ok(session) => Some(session),
            Err(e) => {
                warnings.push(format!("Models unavailable: {}", e));
                None
            }
        };

        let cfg = &input.config;
        let needs_transcript = input.mode == JobMode::Auto || cfg.captions || cfg.use_ai;
        let transcript = if needs_transcript {
            self.transcribe_source(source, job_dir, &info, warnings).await?
        } else {
            None
        };

        self.reporter.stage(Stage::Planning);
        let outcome = self
            .plan(input, source, &info, transcript.as_ref(), warnings)
            .await?;
        metrics::record_plan(outcome.source.as_str(), outcome.len());
        logger.planned(&outcome);
        if outcome.is_empty() {
            warnings.push("No segments could be planned".to_string());
            return Ok((outcome, BatchReport::default()));
        }

        let titles = self
            .titles(input, &outcome.segments, transcript.as_ref())
            .await;
        let requests = self
            .render_requests(input, source, &info, &outcome.segments, titles, transcript)
            .await?;

        self.reporter.stage(Stage::Rendering);
        let renderer = self.renderer();
        let report = render_batch(
            renderer.as_ref(),
            &requests,
            &self.reporter,
            &self.current_clip,
        )
        .await?;
        self.reporter.stage(Stage::Done);
        Ok((outcome, report))
    }

    /// Transcribe the whole source. Failures become warnings.
    async fn transcribe_source(
        &self,
        source: &Path,
        job_dir: &Path,
        info: &VideoInfo,
        warnings: &mut Vec<String>,
    ) -> WorkerResult<Option<Transcript>> {
        if !info.has_audio {
            warnings.push("Source has no audio track; transcription skipped".to_string());
            return Ok(None);
        }

        self.reporter.stage(Stage::ExtractingAudio);
        let audio = job_dir.join("audio.wav");
        if let Err(e) = extract_audio(&self.runner, source, &audio, None).await {
            if e.is_cancelled() {
                return Err(WorkerError::Cancelled);
            }
            warnings.push(format!("Audio extraction failed: {}", e));
            return Ok(None);
        }

        self.reporter.stage(Stage::Transcribing);
        self.reporter.indeterminate("transcribing");
        let transcriber = Arc::clone(&self.transcriber);
        let audio_path = audio.clone();
        let result = run_cancellable(
            async move { transcriber.transcribe(&audio_path).await },
            self.cancel.clone(),
        )
        .await;
        let _ = tokio::fs::remove_file(&audio).await;

        match result {
            Ok(transcript) => Ok(Some(transcript)),
            Err(WorkerError::Cancelled) => Err(WorkerError::Cancelled),
            Err(e) => {
                warnings.push(format!("Transcription unavailable: {}", e));
                Ok(None)
            }
        }
    }

    async fn plan(
        &self,
        input: &JobInput,
        source: &Path,
        info: &VideoInfo,
        transcript: Option<&Transcript>,
        warnings: &mut Vec<String>,
    ) -> WorkerResult<PlanOutcome> {
        let cfg = &input.config;
        let total = info.duration;

        match input.mode {
            JobMode::Auto => {
                let config = checked(apply_overrides(PlannerConfig::viral_proposals(total), cfg))?;
                let text = transcript
                    .map(|t| t.text.clone())
                    .filter(|t| !t.trim().is_empty());

                match (self.language_model.clone(), text) {
                    (Some(model), Some(text)) => {
                        self.reporter.indeterminate("asking language model");
                        let budget = self.config.transcript_char_budget;
                        let (outcome, warning) = run_cancellable(
                            async move {
                                let planner = SegmentPlanner::new();
                                Ok(propose_segments(model.as_ref(), &planner, &text, &config, budget)
                                    .await)
                            },
                            self.cancel.clone(),
                        )
                        .await?;
                        warnings.extend(warning);
                        Ok(outcome)
                    }
                    (None, _) => {
                        warnings.push("No language model configured; clips evenly tiled".to_string());
                        Ok(self.planner.plan_text("", &config))
                    }
                    (Some(_), None) => {
                        warnings.push("No transcript; clips evenly tiled".to_string());
                        Ok(self.planner.plan_text("", &config))
                    }
                }
            }
            JobMode::Scenes => {
                let platform = cfg.platform.unwrap_or_default();
                let config = checked(apply_overrides(platform.planner_config(total), cfg))?;
                let detect = SceneDetectConfig::default()
                    .with_sensitivity(cfg.sensitivity.unwrap_or(DEFAULT_SENSITIVITY));

                self.reporter.stage(Stage::DetectingScenes);
                let boundaries = match detect_scene_changes(source, detect, self.cancel.clone()).await
                {
                    Ok(boundaries) => boundaries,
                    Err(e) if e.is_cancelled() => return Err(WorkerError::Cancelled),
                    Err(e) => {
                        warnings.push(format!("Scene detection failed: {}", e));
                        Vec::new()
                    }
                };
                info!(boundaries = boundaries.len(), platform = %platform, "Scene changes detected");
                Ok(self.planner.plan_boundaries(&boundaries, &config))
            }
            JobMode::Manual | JobMode::Sequential => {
                let count = cfg.clip_count.unwrap_or(DEFAULT_CLIP_COUNT);
                let clip_length = cfg.clip_duration.unwrap_or(DEFAULT_CLIP_DURATION);
                let schedule = if input.mode == JobMode::Manual {
                    Schedule::Fixed { count, clip_length }
                } else {
                    Schedule::Sequential {
                        count,
                        clip_length,
                        offset: cfg.start_minute.unwrap_or(0.0).max(0.0) * 60.0,
                    }
                };
                let config = PlannerConfig::viral_proposals(total)
                    .with_max_segment_count(cfg.max_clips.unwrap_or(count).max(1));
                Ok(self.planner.plan_schedule(&schedule, &config))
            }
        }
    }

    /// One title per segment when AI titles are requested and there is
    /// dialogue to work from.
    async fn titles(
        &self,
        input: &JobInput,
        segments: &[Segment],
        transcript: Option<&Transcript>,
    ) -> Vec<Option<String>> {
        let mut titles = Vec::with_capacity(segments.len());
        for segment in segments {
            let dialogue = transcript
                .map(|t| t.text_between(segment.start, segment.end))
                .unwrap_or_default();
            if !input.config.use_ai || dialogue.is_empty() {
                titles.push(None);
                continue;
            }
            self.reporter.stage(Stage::GeneratingTitle);
            let title = generate_title(
                self.language_model.as_deref(),
                &input.anime_name,
                &dialogue,
            )
            .await;
            titles.push(Some(title));
        }
        titles
    }

    async fn render_requests(
        &self,
        input: &JobInput,
        source: &Path,
        info: &VideoInfo,
        segments: &[Segment],
        titles: Vec<Option<String>>,
        transcript: Option<Transcript>,
    ) -> WorkerResult<Vec<RenderRequest>> {
        let options = input
            .config
            .render_options(self.config.prefer_hardware_encoder);
        let words = match (&options.captions, transcript) {
            (Some(_), Some(t)) => t.words,
            _ => Vec::new(),
        };

        let mut requests = Vec::with_capacity(segments.len());
        for ((i, segment), title) in segments.iter().enumerate().zip(titles) {
            let crop = match options.layout {
                Layout::SmartCrop => Some(self.crop_for(source, info, segment).await?),
                Layout::Fit => None,
            };
            requests.push(RenderRequest {
                source: source.to_path_buf(),
                source_info: info.clone(),
                segment: *segment,
                index: i + 1,
                title,
                words: words.clone(),
                crop,
                options: options.clone(),
                output_dir: self.config.output_dir.clone(),
            });
        }
        Ok(requests)
    }

    /// Smart-crop column for one segment; centred when no detector is set
    /// or the analysis fails.
    async fn crop_for(
        &self,
        source: &Path,
        info: &VideoInfo,
        segment: &Segment,
    ) -> WorkerResult<CropWindow> {
        let Some(detector) = &self.face_detector else {
            return Ok(CropWindow::center(info.width, info.height));
        };

        match plan_smart_crop(
            source,
            info,
            segment.start,
            segment.end,
            detector.as_ref(),
            SmartCropConfig::default(),
        )
        .await
        {
            Ok(window) => Ok(window),
            Err(e) if e.is_cancelled() => Err(WorkerError::Cancelled),
            Err(e) => {
                warn!(start = segment.start, error = %e, "Smart crop analysis failed, centring");
                Ok(CropWindow::center(info.width, info.height))
            }
        }
    }

    async fn transcribe_audio(&self, input: &JobInput) -> WorkerResult<Value> {
        let url = input.audio_url()?;
        let job_dir = self.job_dir().await?;

        self.reporter.stage(Stage::Downloading);
        let extension = Path::new(url.path())
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("audio")
            .to_string();
        let audio = download_to_file(&self.http, &url, job_dir.path(), "audio", &extension).await?;

        self.reporter.stage(Stage::Transcribing);
        self.reporter.indeterminate("transcribing");
        let transcriber = Arc::clone(&self.transcriber);
        let audio_path = audio.clone();
        let result = run_cancellable(
            async move { transcriber.transcribe(&audio_path).await },
            self.cancel.clone(),
        )
        .await;
        let _ = tokio::fs::remove_file(&audio).await;
        let transcript = result?;

        Ok(json!({
            "text": transcript.text,
            "chars": transcript.char_count(),
            "words": transcript.words,
        }))
    }

    async fn generate_title(&self, input: &JobInput) -> WorkerResult<Value> {
        self.reporter.stage(Stage::GeneratingTitle);
        let dialogue = input.dialogue.as_deref().unwrap_or("");
        let title = generate_title(self.language_model.as_deref(), &input.anime_name, dialogue).await;
        Ok(json!({ "title": title }))
    }

    fn renderer(&self) -> Arc<dyn ClipRenderer> {
        if let Some(renderer) = &self.renderer {
            return Arc::clone(renderer);
        }
        let mut renderer = FfmpegClipRenderer::new(self.runner.clone(), self.config.work_dir.clone())
            .with_progress(self.current_clip.percent_sink(self.reporter.clone()));
        if let Some(font_dir) = &self.config.font_dir {
            renderer = renderer.with_font_dir(font_dir.clone());
        }
        Arc::new(renderer)
    }

    async fn job_dir(&self) -> WorkerResult<TempDir> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        Ok(tempfile::Builder::new()
            .prefix("autocut-job-")
            .tempdir_in(&self.config.work_dir)?)
    }
}

impl std::fmt::Debug for JobHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandler")
            .field("config", &self.config)
            .field(
                "language_model",
                &self.language_model.as_ref().map(|m| m.name().to_string()),
            )
            .field("transcriber", &self.transcriber.name())
            .field("face_detector", &self.face_detector.as_ref().map(|d| d.name()))
            .finish()
    }
}

/// Apply envelope overrides to a planner preset.
pub fn apply_overrides(mut config: PlannerConfig, job: &JobConfig) -> PlannerConfig {
    if let Some(min) = job.min_duration {
        config.min_duration = min;
    }
    if let Some(max) = job.max_duration {
        config.max_duration = max;
    }
    if let Some(max_clips) = job.max_clips {
        config.max_segment_count = max_clips;
    }
    config
}

fn checked(config: PlannerConfig) -> WorkerResult<PlannerConfig> {
    config
        .validate()
        .map_err(|e| WorkerError::invalid_input(e.to_string()))?;
    Ok(config)
}

/// `{"error": "..."}`
pub fn error_response(error: &WorkerError) -> Value {
    json!({ "error": error.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionRequest;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Canned(&'static str);

    #[async_trait]
    impl LanguageModel for Canned {
        async fn complete(&self, _request: &CompletionRequest) -> WorkerResult<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn handler(dir: &TempDir) -> JobHandler {
        let config = WorkerConfig {
            work_dir: dir.path().join("work"),
            output_dir: dir.path().join("out"),
            ..WorkerConfig::default()
        };
        JobHandler::from_config(config, None).unwrap()
    }

    fn request(json: Value) -> JobRequest {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let dir = TempDir::new().unwrap();
        let response = handler(&dir)
            .handle(request(json!({"input": {"operation": "explode"}})))
            .await;
        assert!(response["error"].as_str().unwrap().contains("explode"));
    }

    #[tokio::test]
    async fn test_generate_title_operation() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir)
            .with_language_model(Some(Arc::new(Canned("Naruto desperta a raposa"))));
        let response = handler
            .handle(request(json!({"input": {
                "operation": "generate_title",
                "anime_name": "Naruto",
                "dialogue": "kurama me empreste seu poder"
            }})))
            .await;
        assert_eq!(response["title"], "NARUTO DESPERTA A RAPOSA");
        assert!(response["job_id"].is_string());
    }

    #[tokio::test]
    async fn test_missing_video_url_is_error() {
        let dir = TempDir::new().unwrap();
        let response = handler(&dir).handle(request(json!({"input": {}}))).await;
        assert!(response["error"].as_str().unwrap().contains("video_url"));
    }

    #[tokio::test]
    async fn test_download_failure_aborts_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let response = handler(&dir)
            .handle(request(json!({"input": {
                "video_url": format!("{}/ep1.mp4", server.uri()),
                "mode": "manual"
            }})))
            .await;

        let error = response["error"].as_str().unwrap();
        assert!(error.starts_with("Download failed"));
        assert!(response.get("clips").is_none());
    }

    struct FixedTranscriber;

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, audio: &Path) -> WorkerResult<Transcript> {
            assert!(audio.exists());
            Ok(Transcript {
                text: "Eu sou o rei dos piratas".to_string(),
                words: Vec::new(),
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_transcribe_audio_operation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 512]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let handler = handler(&dir).with_transcriber(Arc::new(FixedTranscriber));
        let response = handler
            .handle(request(json!({"input": {
                "operation": "transcribe_audio",
                "audio_url": format!("{}/voice.ogg", server.uri())
            }})))
            .await;

        assert_eq!(response["text"], "Eu sou o rei dos piratas");
        assert_eq!(response["chars"], 24);
        assert!(response["finished_at"].is_string());
    }

    #[test]
    fn test_apply_overrides() {
        let job: JobConfig =
            serde_json::from_str(r#"{"min_duration":30,"max_clips":8}"#).unwrap();
        let config = apply_overrides(PlannerConfig::viral_proposals(900.0), &job);
        assert_eq!(config.min_duration, 30.0);
        assert_eq!(config.max_duration, 180.0);
        assert_eq!(config.max_segment_count, 8);
    }

    #[test]
    fn test_inverted_overrides_rejected() {
        let job: JobConfig =
            serde_json::from_str(r#"{"min_duration":200,"max_duration":100}"#).unwrap();
        let result = checked(apply_overrides(PlannerConfig::viral_proposals(900.0), &job));
        assert!(matches!(result, Err(WorkerError::InvalidInput(_))));
    }
}
