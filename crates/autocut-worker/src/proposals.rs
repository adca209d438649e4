//! Viral-moment proposals from a transcript.
//!
//! The model is asked for `[INICIO-FIM]` pairs; its raw reply goes straight
//! to the planner. A failed call counts as zero candidates.

use autocut_models::PlannerConfig;
use autocut_planner::{PlanOutcome, SegmentPlanner};
use tracing::{info, warn};

use crate::llm::{CompletionRequest, LanguageModel};

const SYSTEM_PROMPT: &str = "Você é um editor de vídeo especialista. \
Analise o roteiro completo e identifique os melhores momentos para clipes virais. \
Retorne APENAS uma lista de timestamps no formato [INICIO-FIM]. \
Exemplo: [0-120], [300-450], [600-750]";

/// The transcript prefix that fits in `budget` characters.
///
/// Cuts on a character boundary; returns the whole text when it fits.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the proposal request for a source of `total_duration` seconds.
pub fn proposal_request(
    transcript: &str,
    total_duration: f64,
    config: &PlannerConfig,
    char_budget: usize,
) -> CompletionRequest {
    let sent = truncate_chars(transcript, char_budget);
    let sent_chars = sent.chars().count();
    if sent.len() < transcript.len() {
        warn!(
            transcript_chars = transcript.chars().count(),
            sent_chars,
            "Transcript truncated for proposal request"
        );
    }

    let user = format!(
        "Duração total do vídeo: {total} segundos.\n\n\
         Identifique 3-{count} momentos virais (cada um com {min}-{max} segundos de duração).\n\n\
         Roteiro (primeiros {sent_chars} caracteres):\n{sent}\n\n\
         Retorne APENAS os timestamps no formato [INICIO-FIM], separados por vírgula:",
        total = total_duration.round() as u64,
        count = config.max_segment_count.max(3),
        min = config.min_duration.round() as u64,
        max = config.max_duration.round() as u64,
        sent_chars = sent_chars,
        sent = sent,
    );

    CompletionRequest::new(SYSTEM_PROMPT, user).with_temperature(0.3)
}

/// Ask `model` for proposals and plan them.
///
/// Returns the outcome plus a warning when the model call failed.
pub async fn propose_segments(
    model: &dyn LanguageModel,
    planner: &SegmentPlanner,
    transcript: &str,
    config: &PlannerConfig,
    char_budget: usize,
) -> (PlanOutcome, Option<String>) {
    let request = proposal_request(transcript, config.total_duration, config, char_budget);

    let (text, warning) = match model.complete(&request).await {
        Ok(text) => (text, None),
        Err(e) => {
            warn!(model = model.name(), error = %e, "Proposal request failed, planning without candidates");
            (String::new(), Some(format!("Language model unavailable: {}", e)))
        }
    };

    let outcome = planner.plan_text(&text, config);
    info!(
        source = outcome.source.as_str(),
        segments = outcome.len(),
        candidates = outcome.candidates,
        dropped = outcome.dropped.total(),
        "Proposals planned"
    );
    (outcome, warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{WorkerError, WorkerResult};
    use async_trait::async_trait;
    use autocut_planner::PlanSource;

    struct Canned(Result<&'static str, &'static str>);

    #[async_trait]
    impl LanguageModel for Canned {
        async fn complete(&self, _request: &CompletionRequest) -> WorkerResult<String> {
            self.0
                .map(str::to_string)
                .map_err(WorkerError::ai_failed)
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_truncate_chars_on_boundary() {
        assert_eq!(truncate_chars("ação rápida", 3), "açã");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_prompt_mentions_budget_and_format() {
        let config = PlannerConfig::viral_proposals(1420.0);
        let request = proposal_request(&"x".repeat(50), 1420.0, &config, 20);
        assert!(request.user.contains("1420 segundos"));
        assert!(request.user.contains("3-5 momentos"));
        assert!(request.user.contains("60-180 segundos"));
        assert!(request.user.contains("primeiros 20 caracteres"));
        assert!(request.user.contains("[INICIO-FIM]"));
        assert!(request.system.contains("[0-120]"));
    }

    #[tokio::test]
    async fn test_propose_segments_from_reply() {
        let planner = SegmentPlanner::new();
        let config = PlannerConfig::viral_proposals(1000.0);
        let (outcome, warning) = propose_segments(
            &Canned(Ok("Claro! [0-120], [300-450]")),
            &planner,
            "texto",
            &config,
            12_000,
        )
        .await;

        assert!(warning.is_none());
        assert_eq!(outcome.source, PlanSource::Proposals);
        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.segments[1].start, 300.0);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let planner = SegmentPlanner::new();
        let config = PlannerConfig::viral_proposals(600.0);
        let (outcome, warning) =
            propose_segments(&Canned(Err("quota")), &planner, "texto", &config, 12_000).await;

        assert!(warning.unwrap().contains("quota"));
        assert_eq!(outcome.source, PlanSource::Fallback);
        assert_eq!(outcome.len(), 5);
    }
}
