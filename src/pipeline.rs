//! Validate, resolve, generate: one pass per request

use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::config::{Locale, Settings};
use crate::error::{NoteError, Result};
use crate::notes::NoteGenerator;
use crate::transcript::{cap_length, join_segments};
use crate::youtube::{CAPTION_LANGUAGES, CaptionSource, MetadataSource, YouTube};
use crate::{DEFAULT_TITLE, LearningLevel, VideoInfo, extract_video_id};

/// Transcripts shorter than this (after trimming) are rejected
pub const MIN_TRANSCRIPT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Url,
    Text,
}

/// A validated request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRequest {
    pub kind: InputKind,
    pub value: String,
    pub level: LearningLevel,
}

impl NoteRequest {
    /// Parse and validate a raw JSON body
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| NoteError::InvalidRequest(format!("request body is not valid JSON: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(NoteError::InvalidRequest("request body must be a JSON object".to_string()));
        };

        let input_type = required_str(&fields, "inputType")?;
        let input_value = required_str(&fields, "inputValue")?;

        let kind = match input_type {
            "url" => InputKind::Url,
            "text" => InputKind::Text,
            other => {
                return Err(NoteError::InvalidRequest(format!(
                    "inputType must be \"url\" or \"text\", got \"{other}\""
                )));
            }
        };

        if input_value.trim().is_empty() {
            return Err(NoteError::InvalidRequest("inputValue must not be empty".to_string()));
        }

        let level = fields
            .get("learningLevel")
            .and_then(Value::as_str)
            .map(LearningLevel::parse)
            .unwrap_or_default();

        Ok(Self {
            kind,
            value: input_value.to_string(),
            level,
        })
    }
}

fn required_str<'a>(fields: &'a serde_json::Map<String, Value>, key: &str) -> Result<&'a str> {
    match fields.get(key) {
        None | Some(Value::Null) => Err(NoteError::InvalidRequest(format!("{key} is required"))),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(NoteError::InvalidRequest(format!("{key} must be a string"))),
    }
}

/// Success payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResult {
    pub markdown_content: String,
    pub video_title: String,
}

/// Transcript ready for generation
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub transcript: String,
    pub video: Option<VideoInfo>,
}

impl Resolved {
    pub fn title(&self) -> &str {
        self.video.as_ref().map(|v| v.title.as_str()).unwrap_or(DEFAULT_TITLE)
    }
}

#[derive(Clone)]
pub struct Pipeline {
    captions: Arc<dyn CaptionSource>,
    metadata: Arc<dyn MetadataSource>,
    generator: NoteGenerator,
    max_transcript_chars: usize,
    locale: Locale,
}

impl Pipeline {
    pub fn new(
        captions: Arc<dyn CaptionSource>,
        metadata: Arc<dyn MetadataSource>,
        generator: NoteGenerator,
        max_transcript_chars: usize,
    ) -> Self {
        Self {
            captions,
            metadata,
            generator,
            max_transcript_chars,
            locale: Locale::default(),
        }
    }

    /// Language for the recovery hints attached to errors
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Wire the real YouTube and completion clients from settings
    pub fn from_settings(settings: &Settings) -> Self {
        let client = reqwest::Client::new();
        let youtube = Arc::new(YouTube::new(client.clone(), settings.lookup_timeout));
        Self::new(
            youtube.clone(),
            youtube,
            NoteGenerator::from_settings(settings, client),
            settings.max_transcript_chars,
        )
        .with_locale(settings.locale)
    }

    /// Run the whole request: validate, resolve, generate
    pub async fn run(&self, body: &[u8]) -> Result<NoteResult> {
        let request = NoteRequest::parse(body)?;
        info!(
            "Request: type={:?}, value length={}, level={}",
            request.kind,
            request.value.chars().count(),
            request.level
        );

        let resolved = self.resolve(&request).await?;
        let markdown_content = self
            .generator
            .generate(&resolved.transcript, resolved.video.as_ref(), request.level)
            .await?;

        Ok(NoteResult {
            markdown_content,
            video_title: resolved.title().to_string(),
        })
    }

    /// Turn the request input into a bounded transcript
    pub async fn resolve(&self, request: &NoteRequest) -> Result<Resolved> {
        let (transcript, video) = match request.kind {
            InputKind::Url => {
                let video_id = extract_video_id(&request.value).ok_or(NoteError::InvalidUrl)?;
                debug!("Resolved video id {video_id}");

                let video = self.metadata.video_info(&video_id).await;
                let segments = self.captions.fetch_captions(&video_id, &CAPTION_LANGUAGES).await?;
                debug!("Fetched {} caption segments for {video_id}", segments.len());

                (join_segments(&segments), Some(video))
            }
            InputKind::Text => (request.value.clone(), None),
        };

        let length = transcript.trim().chars().count();
        if length < MIN_TRANSCRIPT_CHARS {
            return Err(NoteError::TextTooShort(length));
        }

        Ok(Resolved {
            transcript: cap_length(transcript, self.max_transcript_chars),
            video,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Segment;
    use crate::youtube::CaptionError;
    use async_trait::async_trait;

    struct FixedCaptions(std::result::Result<Vec<Segment>, CaptionError>);

    #[async_trait]
    impl CaptionSource for FixedCaptions {
        async fn fetch_captions(
            &self,
            _video_id: &str,
            languages: &[&str],
        ) -> std::result::Result<Vec<Segment>, CaptionError> {
            assert_eq!(languages, ["ko", "en"]);
            self.0.clone()
        }
    }

    struct NoMetadata;

    #[async_trait]
    impl MetadataSource for NoMetadata {
        async fn video_info(&self, video_id: &str) -> VideoInfo {
            VideoInfo::fallback(video_id)
        }
    }

    fn pipeline(captions: std::result::Result<Vec<Segment>, CaptionError>, cap: usize) -> Pipeline {
        Pipeline::new(
            Arc::new(FixedCaptions(captions)),
            Arc::new(NoMetadata),
            NoteGenerator::Simple,
            cap,
        )
    }

    fn segments(texts: &[&str]) -> Vec<Segment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Segment {
                text: t.to_string(),
                start: i as f64,
                duration: 1.0,
            })
            .collect()
    }

    fn url_request(value: &str) -> NoteRequest {
        NoteRequest {
            kind: InputKind::Url,
            value: value.to_string(),
            level: LearningLevel::Beginner,
        }
    }

    fn text_request(value: &str) -> NoteRequest {
        NoteRequest {
            kind: InputKind::Text,
            value: value.to_string(),
            level: LearningLevel::Beginner,
        }
    }

    #[test]
    fn test_parse_valid() {
        let req = NoteRequest::parse(br#"{"inputType": "url", "inputValue": "https://youtu.be/dQw4w9WgXcQ", "learningLevel": "advanced"}"#).unwrap();
        assert_eq!(req.kind, InputKind::Url);
        assert_eq!(req.level, LearningLevel::Advanced);
    }

    #[test]
    fn test_parse_default_level() {
        let req = NoteRequest::parse(br#"{"inputType": "text", "inputValue": "hello"}"#).unwrap();
        assert_eq!(req.level, LearningLevel::Beginner);
        let req = NoteRequest::parse(br#"{"inputType": "text", "inputValue": "hello", "learningLevel": 3}"#).unwrap();
        assert_eq!(req.level, LearningLevel::Beginner);
    }

    #[test]
    fn test_parse_missing_fields() {
        let err = NoteRequest::parse(br#"{"inputValue": "hello"}"#).unwrap_err();
        assert!(matches!(&err, NoteError::InvalidRequest(m) if m.contains("inputType")));
        let err = NoteRequest::parse(br#"{"inputType": "text"}"#).unwrap_err();
        assert!(matches!(&err, NoteError::InvalidRequest(m) if m.contains("inputValue")));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(NoteRequest::parse(b"not json"), Err(NoteError::InvalidRequest(_))));
        assert!(matches!(NoteRequest::parse(b"[1, 2]"), Err(NoteError::InvalidRequest(_))));
        assert!(matches!(NoteRequest::parse(b""), Err(NoteError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_rejects_blank_value_and_unknown_type() {
        let err = NoteRequest::parse(br#"{"inputType": "text", "inputValue": "   "}"#).unwrap_err();
        assert!(matches!(&err, NoteError::InvalidRequest(m) if m.contains("empty")));
        let err = NoteRequest::parse(br#"{"inputType": "file", "inputValue": "x"}"#).unwrap_err();
        assert!(matches!(err, NoteError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_resolve_url_joins_captions() {
        let long = "a caption line that is long enough to pass the minimum";
        let p = pipeline(Ok(segments(&["Hello", long])), 30_000);
        let resolved = p.resolve(&url_request("https://youtube.com/watch?v=dQw4w9WgXcQ")).await.unwrap();
        assert_eq!(resolved.transcript, format!("Hello {long}"));
        assert_eq!(resolved.title(), "Video_dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_resolve_invalid_url() {
        let p = pipeline(Ok(vec![]), 30_000);
        assert_eq!(p.resolve(&url_request("not a url")).await.unwrap_err(), NoteError::InvalidUrl);
    }

    #[tokio::test]
    async fn test_resolve_caption_errors_are_classified() {
        let cases = [
            (CaptionError::NoTranscript("x".into()), NoteError::NoTranscript),
            (CaptionError::Disabled("x".into()), NoteError::TranscriptsDisabled),
            (CaptionError::VideoUnavailable("x".into()), NoteError::VideoUnavailable),
            (CaptionError::Other("dns".into()), NoteError::Transcript("dns".into())),
        ];
        for (caption_err, expected) in cases {
            let p = pipeline(Err(caption_err), 30_000);
            let err = p.resolve(&url_request("https://youtu.be/dQw4w9WgXcQ")).await.unwrap_err();
            assert_eq!(err, expected);
        }
    }

    #[tokio::test]
    async fn test_resolve_text_too_short() {
        let p = pipeline(Ok(vec![]), 30_000);
        let err = p.resolve(&text_request("   0123456789   ")).await.unwrap_err();
        assert_eq!(err, NoteError::TextTooShort(10));
    }

    #[tokio::test]
    async fn test_resolve_short_captions_rejected() {
        let p = pipeline(Ok(segments(&["too", "short"])), 30_000);
        let err = p.resolve(&url_request("https://youtu.be/dQw4w9WgXcQ")).await.unwrap_err();
        assert_eq!(err, NoteError::TextTooShort(9));
    }

    #[tokio::test]
    async fn test_resolve_text_is_capped() {
        let p = pipeline(Ok(vec![]), 60);
        let resolved = p.resolve(&text_request(&"x".repeat(100))).await.unwrap();
        assert!(resolved.transcript.starts_with(&"x".repeat(60)));
        assert!(!resolved.transcript.starts_with(&"x".repeat(61)));
        assert!(resolved.transcript.contains("truncated"));
        assert_eq!(resolved.title(), DEFAULT_TITLE);
    }

    #[tokio::test]
    async fn test_run_text_with_simple_generator() {
        let p = pipeline(Ok(vec![]), 30_000);
        let body = serde_json::json!({
            "inputType": "text",
            "inputValue": "Photosynthesis converts light into chemical energy. Chlorophyll absorbs light.",
        });
        let result = p.run(body.to_string().as_bytes()).await.unwrap();
        assert_eq!(result.video_title, DEFAULT_TITLE);
        assert!(result.markdown_content.contains("## Summary"));
    }

    #[test]
    fn test_locale_follows_settings() {
        assert_eq!(pipeline(Ok(vec![]), 30_000).locale(), Locale::En);
        let settings = Settings {
            locale: Locale::Ko,
            ..Settings::default()
        };
        assert_eq!(Pipeline::from_settings(&settings).locale(), Locale::Ko);
    }
}
