//! Lexical tokens shared by title ranking and snippet scoring

use once_cell::sync::Lazy;
use regex::Regex;

// ASCII word runs or runs of CJK unified ideographs.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9_]+|[\x{4E00}-\x{9FFF}]+").expect("token pattern is valid")
});

/// Lowercased tokens longer than one character, in order, duplicates kept
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() > 1)
        .collect()
}

/// Number of query tokens contained in `doc` (case-insensitive)
pub fn overlap_score(query_tokens: &[String], doc: &str) -> usize {
    if query_tokens.is_empty() || doc.is_empty() {
        return 0;
    }
    let doc = doc.to_lowercase();
    query_tokens
        .iter()
        .filter(|t| doc.contains(t.as_str()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_script_tokens() {
        assert_eq!(
            tokenize("TSMC 台積電 3nm 法說會!"),
            vec!["tsmc", "台積電", "3nm", "法說會"]
        );
    }

    #[test]
    fn test_single_characters_are_dropped() {
        assert_eq!(tokenize("a 台 b2 x_y"), vec!["b2", "x_y"]);
        assert!(tokenize("  ,.!? ").is_empty());
    }

    #[test]
    fn test_overlap_counts_substring_hits() {
        let tokens = tokenize("台積電 AI 營收");
        assert_eq!(overlap_score(&tokens, "台積電AI伺服器需求強勁"), 2);
        assert_eq!(overlap_score(&tokens, "鴻海法說會"), 0);
        assert_eq!(overlap_score(&[], "anything"), 0);
    }
}
