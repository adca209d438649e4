//! Viral title generation.
//!
//! The model's reply is cleaned and normalised to 4-9 uppercase words of at
//! most 80 characters. When the model is unavailable or says too little, the
//! title is built from keywords of the dialogue.

use tracing::{info, warn};

use crate::llm::{CompletionRequest, LanguageModel};

/// Dialogue characters included in the prompt and in keyword extraction.
pub const DIALOGUE_CHAR_LIMIT: usize = 300;
pub const MAX_TITLE_CHARS: usize = 80;
pub const MIN_TITLE_WORDS: usize = 4;
pub const MAX_TITLE_WORDS: usize = 9;
/// Cleaned replies shorter than this fall back to keywords.
const MIN_MODEL_TITLE_CHARS: usize = 10;
const MAX_KEYWORDS: usize = 7;

const STOP_WORDS: &[&str] = &[
    "O", "A", "E", "DE", "DA", "DO", "EM", "NA", "NO", "QUE", "PARA", "COM", "POR", "SEM", "É",
    "SÃO",
];

const SYSTEM_PROMPT: &str = "You are a title generator. \
Respond ONLY with the title. \
NO explanations. NO reasoning. NO thinking process. \
JUST the title in Portuguese, uppercase, 4-9 words.";

fn dialogue_excerpt(dialogue: &str) -> &str {
    crate::proposals::truncate_chars(dialogue, DIALOGUE_CHAR_LIMIT)
}

/// Prompt for a title of a clip from `name`.
pub fn title_request(name: &str, dialogue: &str) -> CompletionRequest {
    let user = format!(
        "Anime: {}\nDialogue: \"{}\"\n\nCreate viral TikTok title (Portuguese, UPPERCASE, 4-9 words):",
        name,
        dialogue_excerpt(dialogue)
    );
    CompletionRequest::new(SYSTEM_PROMPT, user)
        .with_max_output_tokens(30)
        .with_temperature(0.7)
        .with_stop(["\n", ".", "Explanation:", "Reasoning:"])
}

/// Strip quotes and markers, keep the first line.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.replace(['"', '\''], "").trim().to_string();
    for marker in ["Title:", "Título:", "**", "*", ":", "-"] {
        text = text.replace(marker, "");
    }
    let first_line = text.lines().next().unwrap_or("").trim();
    first_line.trim_start_matches(',').trim().to_string()
}

/// Title from dialogue keywords: uppercase words longer than three
/// characters, minus stop words, first seven.
pub fn keyword_title(name: &str, dialogue: &str) -> String {
    let upper = dialogue_excerpt(dialogue).to_uppercase();
    let keywords: Vec<&str> = upper
        .split_whitespace()
        .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(w))
        .take(MAX_KEYWORDS)
        .collect();

    if keywords.len() >= MIN_TITLE_WORDS {
        keywords.join(" ")
    } else {
        let mut words = keywords;
        let suffix = format!("EM {}", name.to_uppercase());
        words.push(&suffix);
        words.join(" ")
    }
}

/// Last-resort title.
pub fn default_title(name: &str) -> String {
    format!("{} CENA ÉPICA", name.to_uppercase())
}

/// Uppercase, cap at 80 characters on a word boundary, then bring the word
/// count into 4-9.
pub fn normalize_title(title: &str, name: &str) -> String {
    let mut title = title.to_uppercase().trim().to_string();

    if title.chars().count() > MAX_TITLE_CHARS {
        let cut: String = title.chars().take(MAX_TITLE_CHARS).collect();
        title = match cut.rsplit_once(' ') {
            Some((head, _)) => head.trim().to_string(),
            None => cut.trim().to_string(),
        };
    }

    let words: Vec<&str> = title.split_whitespace().collect();
    if words.len() < MIN_TITLE_WORDS {
        format!("{} EM {}", words.join(" "), name.to_uppercase())
            .trim()
            .to_string()
    } else if words.len() > MAX_TITLE_WORDS {
        words[..MAX_TITLE_WORDS].join(" ")
    } else {
        words.join(" ")
    }
}

/// Generate a title, never failing.
pub async fn generate_title(model: Option<&dyn LanguageModel>, name: &str, dialogue: &str) -> String {
    let Some(model) = model else {
        return fallback_title(name, dialogue);
    };

    match model.complete(&title_request(name, dialogue)).await {
        Ok(raw) => {
            let cleaned = clean_response(&raw);
            let title = if cleaned.chars().count() < MIN_MODEL_TITLE_CHARS {
                warn!(raw_chars = raw.chars().count(), "Title reply too short, using keywords");
                keyword_title(name, dialogue)
            } else {
                cleaned
            };
            let title = normalize_title(&title, name);
            info!(title = %title, "Title generated");
            title
        }
        Err(e) => {
            warn!(model = model.name(), error = %e, "Title generation failed, using keywords");
            fallback_title(name, dialogue)
        }
    }
}

fn fallback_title(name: &str, dialogue: &str) -> String {
    let title = keyword_title(name, dialogue);
    if title.trim().is_empty() {
        default_title(name)
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{WorkerError, WorkerResult};
    use async_trait::async_trait;

    struct Canned(Result<&'static str, &'static str>);

    #[async_trait]
    impl LanguageModel for Canned {
        async fn complete(&self, _request: &CompletionRequest) -> WorkerResult<String> {
            self.0.map(str::to_string).map_err(WorkerError::ai_failed)
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_clean_response() {
        assert_eq!(
            clean_response("**Título: \"GOKU DESPERTA O PODER\"**\nExplicação..."),
            "GOKU DESPERTA O PODER"
        );
        assert_eq!(clean_response(", - NARUTO VOLTOU"), "NARUTO VOLTOU");
    }

    #[test]
    fn test_keyword_title() {
        let dialogue = "eu nunca vou desistir dos meus amigos, esse é o meu jeito ninja";
        assert_eq!(
            keyword_title("Naruto", dialogue),
            "NUNCA DESISTIR MEUS AMIGOS, ESSE JEITO NINJA"
        );
        assert_eq!(keyword_title("Naruto", "sim não"), "EM NARUTO");
    }

    #[test]
    fn test_normalize_pads_short_titles() {
        assert_eq!(normalize_title("luta final", "Bleach"), "LUTA FINAL EM BLEACH");
    }

    #[test]
    fn test_normalize_truncates_long_titles() {
        let title = normalize_title("um dois três quatro cinco seis sete oito nove dez onze", "X");
        assert_eq!(title.split_whitespace().count(), 9);
        assert!(title.ends_with("NOVE"));

        let long = "PALAVRA ".repeat(20);
        let title = normalize_title(&long, "X");
        assert!(title.chars().count() <= MAX_TITLE_CHARS);
        assert!(!title.ends_with(' '));
    }

    #[test]
    fn test_request_caps_dialogue() {
        let request = title_request("One Piece", &"a".repeat(1000));
        assert!(request.user.contains(&format!("\"{}\"", "a".repeat(300))));
        assert!(!request.user.contains(&"a".repeat(301)));
        assert_eq!(request.max_output_tokens, Some(30));
    }

    #[tokio::test]
    async fn test_generate_title_from_model() {
        let title = generate_title(
            Some(&Canned(Ok("Título: Luffy enfrenta Kaido no topo"))),
            "One Piece",
            "",
        )
        .await;
        assert_eq!(title, "LUFFY ENFRENTA KAIDO NO TOPO");
    }

    #[tokio::test]
    async fn test_short_reply_uses_keywords() {
        let title = generate_title(
            Some(&Canned(Ok("OK"))),
            "Naruto",
            "acredite sempre naquilo",
        )
        .await;
        assert_eq!(title, "ACREDITE SEMPRE NAQUILO EM NARUTO");
    }

    #[tokio::test]
    async fn test_model_failure_uses_keywords() {
        let title = generate_title(
            Some(&Canned(Err("down"))),
            "Naruto",
            "acredite sempre naquilo",
        )
        .await;
        assert_eq!(title, "ACREDITE SEMPRE NAQUILO EM NARUTO");

        assert_eq!(generate_title(None, "Naruto", "").await, "EM NARUTO");
        assert_eq!(default_title("Naruto"), "NARUTO CENA ÉPICA");
    }
}
