use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{GeneratorKind, Settings};
use crate::error::NoteError;
use crate::{LearningLevel, VideoInfo};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sections every study note must contain, in order
pub const SECTIONS: [&str; 7] = [
    "Learning Objectives",
    "Key Concepts",
    "Concept Map",
    "Detailed Analysis",
    "Summary",
    "Applications",
    "Self-Assessment",
];

const ROLE_PROMPT: &str = "You are an experienced instructor who turns video transcripts into structured study notes. \
Write the note in Markdown, in the same language as the transcript.";

const BEGINNER_INSTRUCTIONS: &str = "Write for a beginner. Define every technical term the first time it appears, \
prefer concrete examples over abstractions, and keep the self-assessment questions focused on recall and understanding.";

const ADVANCED_INSTRUCTIONS: &str = "Write for an advanced learner. Assume the fundamentals are known, \
go deeper into trade-offs, edge cases and connections to related topics, and make the self-assessment questions \
require analysis and application.";

/// Why a single completion call failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("content blocked: {0}")]
    Blocked(String),

    #[error("{0}")]
    Failed(String),
}

impl CompletionError {
    /// Classify an otherwise opaque failure message by its keywords
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("quota") || lower.contains("rate limit") {
            CompletionError::Quota(message)
        } else if lower.contains("timeout") || lower.contains("timed out") || lower.contains("deadline") {
            CompletionError::Timeout(message)
        } else if lower.contains("safety") || lower.contains("blocked") {
            CompletionError::Blocked(message)
        } else {
            CompletionError::Failed(message)
        }
    }
}

impl From<CompletionError> for NoteError {
    fn from(e: CompletionError) -> Self {
        match e {
            CompletionError::Quota(_) => NoteError::QuotaExceeded,
            CompletionError::Timeout(_) => NoteError::Timeout,
            CompletionError::Blocked(_) => NoteError::ContentBlocked,
            CompletionError::Failed(message) => NoteError::GenerationFailed(message),
        }
    }
}

/// A text-completion service addressed by model identifier
#[async_trait]
pub trait Completion: Send + Sync {
    /// False when calls cannot possibly succeed, e.g. without a credential
    fn is_configured(&self) -> bool;

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, CompletionError>;
}

/// Build the single prompt sent to the completion service
pub fn build_prompt(transcript: &str, video: Option<&VideoInfo>, level: LearningLevel) -> String {
    let mut prompt = String::from(ROLE_PROMPT);

    prompt.push_str("\n\nThe note must contain these sections, each as a level-2 Markdown heading, in this order:\n");
    for (i, section) in SECTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {section}\n", i + 1));
    }
    prompt.push_str(
        "\nUnder Key Concepts give each keyword with a short explanation. \
         Under Concept Map show how the concepts connect, as an indented tree.\n",
    );

    if let Some(video) = video {
        prompt.push_str(&format!(
            "\nThis note is based on the following YouTube video:\nTitle: {}\nVideo ID: {}\n",
            video.title, video.video_id
        ));
    }

    prompt.push('\n');
    prompt.push_str(match level {
        LearningLevel::Beginner => BEGINNER_INSTRUCTIONS,
        LearningLevel::Advanced => ADVANCED_INSTRUCTIONS,
    });

    prompt.push_str("\n\nTranscript:\n");
    prompt.push_str(transcript);
    prompt
}

/// Gemini `generateContent` client
pub struct Gemini {
    client: reqwest::Client,
    api_key: Option<String>,
    timeout: Duration,
}

impl Gemini {
    pub fn new(client: reqwest::Client, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client,
            api_key,
            timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

#[async_trait]
impl Completion for Gemini {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::Failed("Gemini API key not set".to_string()))?;

        debug!("Requesting completion from Gemini model {model} ({} prompt chars)", prompt.len());

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(format!("{GEMINI_API_BASE}/models/{model}:generateContent"))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &body));
        }

        let parsed: GenerateContentResponse = resp.json().await.map_err(from_reqwest)?;
        extract_text(parsed)
    }
}

fn from_reqwest(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(e.to_string())
    } else {
        CompletionError::classify(e.to_string())
    }
}

fn classify_http_failure(status: u16, body: &str) -> CompletionError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let api_status = envelope.as_ref().and_then(|e| e.error.status.clone()).unwrap_or_default();
    let message = envelope
        .and_then(|e| e.error.message)
        .map(|m| format!("Gemini API returned {status}: {m}"))
        .unwrap_or_else(|| format!("Gemini API returned {status}: {body}"));

    match (status, api_status.as_str()) {
        (429, _) | (_, "RESOURCE_EXHAUSTED") => CompletionError::Quota(message),
        (408 | 504, _) | (_, "DEADLINE_EXCEEDED") => CompletionError::Timeout(message),
        _ => CompletionError::classify(message),
    }
}

fn extract_text(resp: GenerateContentResponse) -> Result<String, CompletionError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(CompletionError::Blocked(format!("prompt blocked: {reason}")));
    }

    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(CompletionError::Failed("no candidates returned".to_string()));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII")) => {
                Err(CompletionError::Blocked(format!("response blocked: {reason}")))
            }
            Some(reason) => Err(CompletionError::Failed(format!("empty response (finish reason {reason})"))),
            None => Err(CompletionError::Failed("empty response".to_string())),
        };
    }

    Ok(text)
}

/// Produces the Markdown note for a resolved transcript
#[derive(Clone)]
pub enum NoteGenerator {
    /// Built locally from the transcript, no network
    Simple,
    /// Completion service tried across `models` in order
    Remote {
        backend: Arc<dyn Completion>,
        models: Vec<String>,
    },
}

impl NoteGenerator {
    pub fn from_settings(settings: &Settings, client: reqwest::Client) -> Self {
        match settings.generator {
            GeneratorKind::Simple => NoteGenerator::Simple,
            GeneratorKind::Gemini => NoteGenerator::Remote {
                backend: Arc::new(Gemini::new(
                    client,
                    settings.api_key.clone(),
                    settings.completion_timeout,
                )),
                models: settings.models.clone(),
            },
        }
    }

    pub async fn generate(
        &self,
        transcript: &str,
        video: Option<&VideoInfo>,
        level: LearningLevel,
    ) -> crate::error::Result<String> {
        match self {
            NoteGenerator::Simple => Ok(simple_note(transcript, video, level)),
            NoteGenerator::Remote { backend, models } => {
                if !backend.is_configured() {
                    return Err(NoteError::MissingCredential);
                }
                let prompt = build_prompt(transcript, video, level);
                complete_with_fallback(backend.as_ref(), models, &prompt).await
            }
        }
    }
}

/// Try each model once, in order, returning the first success
async fn complete_with_fallback(
    backend: &dyn Completion,
    models: &[String],
    prompt: &str,
) -> crate::error::Result<String> {
    let mut last_err = None;
    for model in models {
        match backend.complete(model, prompt).await {
            Ok(text) => {
                info!("Generated note with model {model} ({} chars)", text.len());
                return Ok(text);
            }
            Err(e) => {
                warn!("Model {model} failed: {e}");
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => e.into(),
        None => NoteError::GenerationFailed("no model identifiers configured".to_string()),
    })
}

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "because", "been", "before", "being", "but", "could", "does", "each", "from", "have",
    "here", "into", "just", "like", "more", "most", "only", "other", "over", "some", "such", "than", "that", "their",
    "them", "then", "there", "these", "they", "this", "those", "very", "want", "were", "what", "when", "where",
    "which", "while", "will", "with", "would", "your", "you're", "really", "going", "know", "think", "thing",
    "things", "okay", "right",
];

const MAX_CONCEPTS: usize = 5;
const MAX_ANALYSIS_POINTS: usize = 10;
const SUMMARY_SENTENCES: usize = 3;

/// Deterministic note built without a language model
pub fn simple_note(transcript: &str, video: Option<&VideoInfo>, level: LearningLevel) -> String {
    let sentences = split_sentences(transcript);
    let concepts = key_concepts(transcript, MAX_CONCEPTS);
    let title = video.map(|v| v.title.as_str()).unwrap_or("Study Note");

    let mut md = format!("# {title}\n\n");
    if let Some(video) = video {
        md.push_str(&format!("> Source: https://www.youtube.com/watch?v={}\n", video.video_id));
    }
    md.push_str(&format!("> Level: {level}\n\n"));

    md.push_str(&format!("## {}\n\n", SECTIONS[0]));
    if concepts.is_empty() {
        md.push_str("- Follow the main line of argument in the material\n");
    }
    for (concept, _) in &concepts {
        match level {
            LearningLevel::Beginner => md.push_str(&format!("- Explain what **{concept}** means in your own words\n")),
            LearningLevel::Advanced => md.push_str(&format!("- Analyse the role of **{concept}** and its limits\n")),
        }
    }

    md.push_str(&format!("\n## {}\n\n", SECTIONS[1]));
    for (concept, count) in &concepts {
        let context = sentences
            .iter()
            .find(|s| s.to_lowercase().contains(concept.as_str()))
            .map(|s| shorten(s, 160))
            .unwrap_or_default();
        md.push_str(&format!("- **{concept}** ({count} mentions): {context}\n"));
    }

    md.push_str(&format!("\n## {}\n\n```text\n{title}\n", SECTIONS[2]));
    for (i, (concept, _)) in concepts.iter().enumerate() {
        let branch = if i + 1 == concepts.len() { "└──" } else { "├──" };
        md.push_str(&format!("{branch} {concept}\n"));
    }
    md.push_str("```\n");

    md.push_str(&format!("\n## {}\n\n", SECTIONS[3]));
    for (i, sentence) in sentences.iter().take(MAX_ANALYSIS_POINTS).enumerate() {
        md.push_str(&format!("{}. {}\n", i + 1, shorten(sentence, 200)));
    }

    md.push_str(&format!("\n## {}\n\n", SECTIONS[4]));
    let summary = sentences
        .iter()
        .take(SUMMARY_SENTENCES)
        .map(|s| shorten(s, 200))
        .collect::<Vec<_>>()
        .join(" ");
    md.push_str(&summary);
    md.push('\n');

    md.push_str(&format!("\n## {}\n\n", SECTIONS[5]));
    for (concept, _) in &concepts {
        md.push_str(&format!("- Find an example from your own work where **{concept}** applies\n"));
    }

    md.push_str(&format!("\n## {}\n\n", SECTIONS[6]));
    for (i, (concept, _)) in concepts.iter().enumerate() {
        let question = match level {
            LearningLevel::Beginner => format!("What is {concept}, and how is it described in the material?"),
            LearningLevel::Advanced => format!("When would {concept} fail to hold, and what would you use instead?"),
        };
        md.push_str(&format!("{}. {question}\n", i + 1));
    }

    md
}

/// Sentences with their terminators kept, whitespace collapsed
fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?', '\n', '。'])
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .collect()
}

fn shorten(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Most frequent non-trivial words, ties broken by first appearance
fn key_concepts(text: &str, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let words = text
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| w.chars().count() >= 4 && !STOPWORDS.contains(&w.as_str()));

    for (position, word) in words.enumerate() {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(word, (count, _))| (word, count))
        .collect()
}
