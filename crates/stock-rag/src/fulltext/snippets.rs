//! Query-relevant excerpts from article text

use super::extract::truncate_chars;
use super::tokenize::{overlap_score, tokenize};

const MIN_PARAGRAPH_CHARS: usize = 80;
const MAX_SNIPPET_CHARS: usize = 380;
const WINDOW_CHARS: usize = 360;
const WINDOW_STRIDE: usize = 180;
const MIN_WINDOW_CHARS: usize = 120;

/// Pick up to `max_snippets` excerpts of `text` that share tokens with `query`.
///
/// Paragraphs (blank-line separated, at least 80 characters) are scored by
/// token overlap. When no paragraph scores, fixed windows over the whole
/// text are scored instead. Highest scores first, ties in document order.
pub fn extract_snippets(query: &str, text: &str, max_snippets: usize) -> Vec<String> {
    if text.is_empty() || max_snippets == 0 {
        return Vec::new();
    }

    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .collect();
    if paragraphs.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, String)> = paragraphs
        .iter()
        .map(|p| (overlap_score(&tokens, p), (*p).to_string()))
        .filter(|(score, _)| *score > 0)
        .collect();

    if scored.is_empty() {
        scored = scored_windows(&tokens, text);
    }

    // Stable: equal scores keep document order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut out: Vec<String> = Vec::with_capacity(max_snippets);
    for (_, snippet) in scored {
        let snippet = clip(&flatten(&snippet));
        if !out.contains(&snippet) {
            out.push(snippet);
        }
        if out.len() >= max_snippets {
            break;
        }
    }
    out
}

fn scored_windows(tokens: &[String], text: &str) -> Vec<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    let last_start = chars.len().saturating_sub(WINDOW_CHARS).max(1);

    (0..last_start)
        .step_by(WINDOW_STRIDE)
        .filter_map(|start| {
            let end = (start + WINDOW_CHARS).min(chars.len());
            let window: String = chars[start..end].iter().collect();
            let window = window.trim();
            if window.chars().count() < MIN_WINDOW_CHARS {
                return None;
            }
            let score = overlap_score(tokens, window);
            (score > 0).then(|| (score, window.to_string()))
        })
        .collect()
}

// Excerpts go on a single context line.
fn flatten(snippet: &str) -> String {
    snippet.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clip(snippet: &str) -> String {
    if snippet.chars().count() > MAX_SNIPPET_CHARS {
        format!("{}...", truncate_chars(snippet, MAX_SNIPPET_CHARS))
    } else {
        snippet.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filler(n: usize) -> String {
        "lorem ".repeat(n)
    }

    #[test]
    fn test_best_paragraphs_first() {
        let text = format!(
            "{} tsmc\n\n{} tsmc revenue\n\n{} nothing\n\n{} revenue",
            filler(20),
            filler(20),
            filler(20),
            filler(20)
        );

        let snippets = extract_snippets("TSMC revenue", &text, 2);

        assert_eq!(snippets.len(), 2);
        assert!(snippets[0].ends_with("tsmc revenue"));
        assert!(snippets[1].ends_with("tsmc"));
    }

    #[test]
    fn test_short_paragraphs_are_ignored() {
        let text = "tsmc revenue grows\n\nshort tsmc";
        assert!(extract_snippets("tsmc", text, 2).is_empty());
    }

    #[test]
    fn test_window_fallback_when_no_paragraph_scores() {
        let text = format!("{}\n\n{}", filler(30), filler(30));
        assert!(extract_snippets("tsmc", &text, 2).is_empty());

        // The keyword sits in a paragraph too short to score on its own.
        let text = format!("{}\n\ntsmc news\n\n{}", filler(20), filler(100));
        let snippets = extract_snippets("tsmc", &text, 2);

        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].contains("tsmc news"));
        assert!(snippets[0].starts_with("lorem"));
        assert!(!snippets[0].contains('\n'));
    }

    #[test]
    fn test_long_paragraphs_are_clipped() {
        let text = format!("tsmc {}", "x".repeat(500));
        let snippets = extract_snippets("tsmc", &text, 2);

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].chars().count(), MAX_SNIPPET_CHARS + 3);
        assert!(snippets[0].ends_with("..."));
    }

    #[test]
    fn test_duplicates_collapse() {
        let para = format!("{} tsmc", filler(20));
        let text = format!("{para}\n\n{para}\n\n{para}");
        assert_eq!(extract_snippets("tsmc", &text, 2), vec![flatten(&para)]);
    }

    #[test]
    fn test_tokenless_query_yields_nothing() {
        let text = format!("{} tsmc", filler(30));
        assert!(extract_snippets("?", &text, 2).is_empty());
        assert!(extract_snippets("tsmc", "", 2).is_empty());
    }
}
