use crate::Segment;

/// Join caption segments into one line of text, in timeline order
pub fn join_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to `max_chars` characters, appending a notice when cut
pub fn cap_length(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut capped = text[..byte_idx].to_string();
            capped.push_str(&format!(
                "\n\n[Transcript truncated to the first {max_chars} characters.]"
            ));
            capped
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str, start: f64) -> Segment {
        Segment {
            text: text.to_string(),
            start,
            duration: 1.5,
        }
    }

    #[test]
    fn test_join_segments() {
        let segments = vec![segment("Hello world", 0.0), segment("This is a test", 1.5)];
        assert_eq!(join_segments(&segments), "Hello world This is a test");
    }

    #[test]
    fn test_join_segments_skips_blank() {
        let segments = vec![segment(" one ", 0.0), segment("  ", 1.0), segment("two", 2.0)];
        assert_eq!(join_segments(&segments), "one two");
    }

    #[test]
    fn test_join_segments_empty() {
        assert_eq!(join_segments(&[]), "");
    }

    #[test]
    fn test_cap_length_under_limit() {
        assert_eq!(cap_length("short".to_string(), 10), "short");
        assert_eq!(cap_length("exactly10!".to_string(), 10), "exactly10!");
    }

    #[test]
    fn test_cap_length_truncates_with_notice() {
        let capped = cap_length("abcdefghij".to_string(), 4);
        assert!(capped.starts_with("abcd\n\n"));
        assert!(capped.contains("truncated"));
    }

    #[test]
    fn test_cap_length_counts_characters() {
        let capped = cap_length("안녕하세요 여러분".to_string(), 5);
        assert!(capped.starts_with("안녕하세요\n\n"));
    }
}
