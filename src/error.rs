//! Errors reported to API clients

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::Locale;

pub type Result<T> = std::result::Result<T, NoteError>;

const EXAMPLE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Every failure a note request can end in
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not a valid YouTube URL. Expected something like {url}", url = EXAMPLE_URL)]
    InvalidUrl,

    #[error("Text is too short ({0} characters). At least {min} characters are required.", min = crate::pipeline::MIN_TRANSCRIPT_CHARS)]
    TextTooShort(usize),

    #[error("No captions are available for this video.")]
    NoTranscript,

    #[error("Captions are disabled for this video.")]
    TranscriptsDisabled,

    #[error("The video is unavailable or cannot be accessed.")]
    VideoUnavailable,

    #[error("Failed to fetch captions: {0}")]
    Transcript(String),

    #[error("The note generator is not configured: GEMINI_API_KEY is not set.")]
    MissingCredential,

    #[error("Note generation failed: {0}")]
    GenerationFailed(String),

    #[error("The AI service quota has been exceeded.")]
    QuotaExceeded,

    #[error("The AI service did not respond in time.")]
    Timeout,

    #[error("The AI service refused to process this content.")]
    ContentBlocked,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl NoteError {
    /// Machine-readable identifier sent as `errorType`
    pub fn error_type(&self) -> &'static str {
        match self {
            NoteError::InvalidRequest(_) => "INVALID_REQUEST",
            NoteError::InvalidUrl => "INVALID_URL",
            NoteError::TextTooShort(_) => "TEXT_TOO_SHORT",
            NoteError::NoTranscript => "NO_TRANSCRIPT",
            NoteError::TranscriptsDisabled => "TRANSCRIPTS_DISABLED",
            NoteError::VideoUnavailable => "VIDEO_UNAVAILABLE",
            NoteError::Transcript(_) => "TRANSCRIPT_ERROR",
            NoteError::MissingCredential => "MISSING_CREDENTIAL",
            NoteError::GenerationFailed(_) => "GENERATION_FAILED",
            NoteError::QuotaExceeded => "QUOTA_EXCEEDED",
            NoteError::Timeout => "TIMEOUT",
            NoteError::ContentBlocked => "CONTENT_BLOCKED",
            NoteError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            NoteError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            NoteError::MissingCredential | NoteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Recovery hint shown next to the error
    pub fn recommendation(&self, locale: Locale) -> Option<&'static str> {
        match locale {
            Locale::En => self.recommendation_en(),
            Locale::Ko => self.recommendation_ko(),
        }
    }

    fn recommendation_en(&self) -> Option<&'static str> {
        match self {
            NoteError::InvalidRequest(_) => None,
            NoteError::InvalidUrl => Some("Paste the full link of a YouTube video, e.g. https://www.youtube.com/watch?v=dQw4w9WgXcQ."),
            NoteError::TextTooShort(_) => Some("Provide a longer transcript so there is enough material for a study note."),
            NoteError::NoTranscript | NoteError::TranscriptsDisabled => {
                Some("Copy the video's transcript and use manual text entry instead of the URL.")
            }
            NoteError::VideoUnavailable => Some("Check that the video is public and the URL is correct."),
            NoteError::Transcript(_) => Some("Try again later, or paste the transcript using manual text entry."),
            NoteError::MissingCredential => Some("Set GEMINI_API_KEY on the server or run it with the simple generator."),
            NoteError::GenerationFailed(_) => Some("Try again in a moment."),
            NoteError::QuotaExceeded => Some("Wait a while before trying again."),
            NoteError::Timeout => Some("Try again, or shorten the transcript."),
            NoteError::ContentBlocked => Some("Remove sensitive content from the transcript and try again."),
            NoteError::Internal(_) => None,
        }
    }

    fn recommendation_ko(&self) -> Option<&'static str> {
        match self {
            NoteError::InvalidRequest(_) => None,
            NoteError::InvalidUrl => Some("유튜브 영상의 전체 링크를 입력해주세요. 예: https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            NoteError::TextTooShort(_) => Some("학습 노트를 만들 수 있도록 더 긴 스크립트를 입력해주세요."),
            NoteError::NoTranscript | NoteError::TranscriptsDisabled => {
                Some("영상의 스크립트를 복사해 스크립트 직접 입력 방식을 이용해주세요.")
            }
            NoteError::VideoUnavailable => Some("영상이 공개 상태인지, URL이 올바른지 확인해주세요."),
            NoteError::Transcript(_) => Some("잠시 후 다시 시도하거나 스크립트 직접 입력 방식을 이용해주세요."),
            NoteError::MissingCredential => Some("서버에 GEMINI_API_KEY를 설정하거나 simple 생성기로 실행해주세요."),
            NoteError::GenerationFailed(_) => Some("잠시 후 다시 시도해주세요."),
            NoteError::QuotaExceeded => Some("API 사용량 한도를 초과했습니다. 잠시 후 다시 시도해주세요."),
            NoteError::Timeout => Some("다시 시도하거나 스크립트를 줄여주세요."),
            NoteError::ContentBlocked => Some("민감한 내용을 제거한 뒤 다시 시도해주세요."),
            NoteError::Internal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses() {
        assert_eq!(NoteError::InvalidUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(NoteError::TranscriptsDisabled.status(), StatusCode::BAD_REQUEST);
        assert_eq!(NoteError::ContentBlocked.status(), StatusCode::BAD_REQUEST);
        assert_eq!(NoteError::QuotaExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(NoteError::MissingCredential.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(NoteError::Internal("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_url_message_has_example() {
        assert!(NoteError::InvalidUrl.to_string().contains(EXAMPLE_URL));
    }

    #[test]
    fn test_disabled_recommends_manual_entry() {
        let hint = NoteError::TranscriptsDisabled.recommendation(Locale::En).unwrap();
        assert!(hint.contains("manual text entry"));
    }

    #[test]
    fn test_korean_hints() {
        let hint = NoteError::NoTranscript.recommendation(Locale::Ko).unwrap();
        assert!(hint.contains("스크립트 직접 입력"));
        assert!(NoteError::InvalidRequest("x".into()).recommendation(Locale::Ko).is_none());
    }

    #[test]
    fn test_every_hinted_error_has_both_languages() {
        let errors = [
            NoteError::InvalidUrl,
            NoteError::TextTooShort(1),
            NoteError::NoTranscript,
            NoteError::TranscriptsDisabled,
            NoteError::VideoUnavailable,
            NoteError::Transcript("x".into()),
            NoteError::MissingCredential,
            NoteError::GenerationFailed("x".into()),
            NoteError::QuotaExceeded,
            NoteError::Timeout,
            NoteError::ContentBlocked,
        ];
        for e in errors {
            assert!(e.recommendation(Locale::En).is_some(), "{e:?}");
            assert!(e.recommendation(Locale::Ko).is_some(), "{e:?}");
        }
    }

    #[test]
    fn test_error_types() {
        assert_eq!(NoteError::Transcript("x".into()).error_type(), "TRANSCRIPT_ERROR");
        assert_eq!(NoteError::TextTooShort(3).error_type(), "TEXT_TOO_SHORT");
        assert_eq!(NoteError::Internal("x".into()).error_type(), "INTERNAL_ERROR");
    }
}
