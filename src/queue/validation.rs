//! Input validation and text normalization.

use super::manager::QueueError;

/// Maximum accepted question length, in characters.
pub const MAX_TEXT_CHARS: usize = 500;

/// Validate question text, returning the trimmed form.
pub fn validate_text(text: &str) -> Result<String, QueueError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(QueueError::Validation("question text is empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err(QueueError::Validation(format!(
            "question text exceeds {} characters",
            MAX_TEXT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalized form used for dedup comparison: trimmed, lowercased,
/// inner whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First blocklist keyword contained in `text`, if any.
/// Matching is case-insensitive on both sides.
pub fn matching_ng_keyword(text: &str, keywords: &[String]) -> Option<String> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .find(|k| haystack.contains(&k.trim().to_lowercase()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_and_oversize() {
        assert!(validate_text("").is_err());
        assert!(validate_text("   ").is_err());
        assert!(validate_text(&"x".repeat(MAX_TEXT_CHARS + 1)).is_err());
        assert_eq!(validate_text("  ok  ").unwrap(), "ok");
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  Hello   World "), "hello world");
        assert_eq!(normalize_text("hello world"), normalize_text("HELLO  WORLD"));
    }

    #[test]
    fn test_ng_keyword_matching() {
        let keywords = vec!["spam".to_string(), "  Bad Word ".to_string()];
        assert_eq!(
            matching_ng_keyword("this is SPAM really", &keywords),
            Some("spam".to_string())
        );
        assert!(matching_ng_keyword("clean text", &keywords).is_none());
        assert!(matching_ng_keyword("a bad word here", &keywords).is_some());
    }
}
