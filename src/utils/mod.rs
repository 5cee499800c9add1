pub mod ip;
pub mod url;

/// Truncate a string to at most `max_chars` characters, respecting character
/// boundaries. User-agent and referer values are stored bounded.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_untouched() {
        assert_eq!(truncate_chars("Mozilla/5.0", 500), "Mozilla/5.0");
    }

    #[test]
    fn test_truncate_long_string() {
        let long = "x".repeat(600);
        let truncated = truncate_chars(&long, 500);
        assert_eq!(truncated.chars().count(), 500);
    }

    #[test]
    fn test_truncate_multibyte_boundary() {
        // Hangul chars are 3 bytes each; truncation must not split them
        let s = "상품페이지".repeat(200);
        let truncated = truncate_chars(&s, 500);
        assert_eq!(truncated.chars().count(), 500);
        assert!(truncated.chars().all(|c| c != '\u{fffd}'));
    }
}
