/// Rough characters-per-token ratio for English text and log output
pub const CHARS_PER_TOKEN: u64 = 4;

/// Approximate token count of `text`, rounded up.
///
/// Counts characters rather than bytes, so multi-byte text is not inflated.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        assert_eq!(estimate_tokens("日本語です"), 2);
    }

    #[test]
    fn test_monotonic_under_append() {
        let mut text = String::new();
        let mut last = 0;
        for i in 0..200 {
            text.push_str(&format!("line {}\n", i));
            let estimate = estimate_tokens(&text);
            assert!(estimate >= last);
            last = estimate;
        }
    }
}
