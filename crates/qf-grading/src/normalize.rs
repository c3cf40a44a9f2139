use unicode_normalization::UnicodeNormalization;

/// Normalize a free-text answer for comparison.
///
/// Accents are removed by decomposing to NFD and dropping combining marks,
/// punctuation is dropped, the result is lowercased and runs of whitespace
/// collapse to a single space.
///
/// # Examples
/// ```
/// use qf_grading::normalize_answer;
///
/// assert_eq!(normalize_answer("  Émile   Zola! "), "emile zola");
/// ```
pub fn normalize_answer(s: &str) -> String {
    s.nfd()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("Paris"), "paris");
        assert_eq!(normalize_answer("  paris  "), "paris");
        assert_eq!(normalize_answer("café"), "cafe");
        assert_eq!(normalize_answer("New   York"), "new york");
        assert_eq!(normalize_answer("it's"), "its");
        assert_eq!(normalize_answer(""), "");
        assert_eq!(normalize_answer("?!"), "");
    }
}
