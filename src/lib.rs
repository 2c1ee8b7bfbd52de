pub mod config;
pub mod error;
pub mod notes;
pub mod pipeline;
pub mod server;
pub mod transcript;
pub mod youtube;

use regex::Regex;
use serde::Serialize;

/// Title used when the note was generated from pasted text
pub const DEFAULT_TITLE: &str = "YouTube_Study";

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Video metadata embedded into the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
}

impl VideoInfo {
    /// Metadata used when the title lookup fails
    pub fn fallback(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: format!("Video_{video_id}"),
        }
    }
}

/// Audience the note is written for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LearningLevel {
    #[default]
    Beginner,
    Advanced,
}

impl LearningLevel {
    /// Anything other than "advanced" means beginner
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("advanced") {
            LearningLevel::Advanced
        } else {
            LearningLevel::Beginner
        }
    }
}

impl std::fmt::Display for LearningLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearningLevel::Beginner => write!(f, "beginner"),
            LearningLevel::Advanced => write!(f, "advanced"),
        }
    }
}

/// Extract the 11-character video ID following `v=` or a path separator
pub fn extract_video_id(input: &str) -> Option<String> {
    let re = Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").ok()?;
    re.captures(input.trim()).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_watch_url_without_www() {
        assert_eq!(
            extract_video_id("https://youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_shorts_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ?feature=share"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_not_a_url() {
        assert_eq!(extract_video_id("not a url"), None);
    }

    #[test]
    fn test_bare_id_needs_separator() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_whitespace_trimming() {
        assert_eq!(
            extract_video_id("  https://youtu.be/dQw4w9WgXcQ  "),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_learning_level_parse() {
        assert_eq!(LearningLevel::parse("advanced"), LearningLevel::Advanced);
        assert_eq!(LearningLevel::parse("Advanced "), LearningLevel::Advanced);
        assert_eq!(LearningLevel::parse("beginner"), LearningLevel::Beginner);
        assert_eq!(LearningLevel::parse("expert"), LearningLevel::Beginner);
    }

    #[test]
    fn test_fallback_video_info() {
        let info = VideoInfo::fallback("dQw4w9WgXcQ");
        assert_eq!(info.title, "Video_dQw4w9WgXcQ");
        assert_eq!(info.video_id, "dQw4w9WgXcQ");
    }
}
