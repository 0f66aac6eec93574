//! Readable text extraction from article HTML

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Pages yielding less text than this are treated as bot walls or shells
pub const MIN_ARTICLE_CHARS: usize = 200;

// Create static selectors to avoid recompiling them each time
static NOISE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, noscript, header, footer, nav, aside")
        .expect("Failed to parse noise selector")
});

static ARTICLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article").expect("Failed to parse article selector"));

static MAIN_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("main").expect("Failed to parse main selector"));

static CONTENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#content").expect("Failed to parse content selector"));

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("Failed to parse body selector"));

static INLINE_WS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\r\x0B\x0C]+").expect("inline whitespace pattern is valid"));

static LINE_EDGE_WS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ?\n ?").expect("line edge pattern is valid"));

static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));

/// Extract the readable text of an article page.
///
/// Strips scripts, styles and page chrome, then reads the first of
/// `<article>`, `<main>`, `#content` or `<body>`. Returns `None` when the
/// result is shorter than [`MIN_ARTICLE_CHARS`]. Output keeps blank lines
/// between blocks and is cut at `max_chars` characters.
pub fn extract_readable_text(html: &str, max_chars: usize) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }

    let mut document = Html::parse_document(html);

    let noise: Vec<_> = document.select(&NOISE_SELECTOR).map(|el| el.id()).collect();
    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let regions = [
        &*ARTICLE_SELECTOR,
        &*MAIN_SELECTOR,
        &*CONTENT_SELECTOR,
        &*BODY_SELECTOR,
    ];
    let region = regions
        .into_iter()
        .find_map(|selector| document.select(selector).next())?;

    let raw = region.text().collect::<Vec<_>>().join("\n");
    let text = normalize_whitespace(&raw);

    if text.chars().count() < MIN_ARTICLE_CHARS {
        return None;
    }

    Some(truncate_chars(&text, max_chars))
}

/// Collapse runs of spaces, trim around newlines, and cap blank lines at one
pub fn normalize_whitespace(text: &str) -> String {
    let text = INLINE_WS.replace_all(text, " ");
    let text = LINE_EDGE_WS.replace_all(&text, "\n");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(word: &str) -> String {
        format!("<p>{}</p>", vec![word; 40].join(" "))
    }

    #[test]
    fn test_prefers_article_and_strips_noise() {
        let html = format!(
            "<html><head><script>var tracking = 1;</script></head><body>\
             <header>Site header</header><nav>Menu</nav>\
             <div>Sidebar teaser</div>\
             <article>{}<aside>Related</aside>{}<style>.x{{}}</style></article>\
             <footer>Copyright</footer></body></html>",
            paragraph("chips"),
            paragraph("demand"),
        );

        let text = extract_readable_text(&html, 20_000).unwrap();

        assert!(text.starts_with("chips chips"));
        assert!(text.contains("demand"));
        for noise in ["tracking", "Site header", "Menu", "Sidebar", "Related", "Copyright", ".x"] {
            assert!(!text.contains(noise), "leaked {noise:?}");
        }
    }

    #[test]
    fn test_falls_back_to_content_then_body() {
        let with_content = format!(
            "<html><body><div>outside</div><div id=\"content\">{}</div></body></html>",
            paragraph("earnings")
        );
        let text = extract_readable_text(&with_content, 20_000).unwrap();
        assert!(!text.contains("outside"));

        let body_only = format!("<html><body>{}</body></html>", paragraph("guidance"));
        assert!(extract_readable_text(&body_only, 20_000).unwrap().contains("guidance"));
    }

    #[test]
    fn test_short_pages_are_rejected() {
        let html = "<html><body><article>Please enable JavaScript.</article></body></html>";
        assert_eq!(extract_readable_text(html, 20_000), None);
        assert_eq!(extract_readable_text("", 20_000), None);
    }

    #[test]
    fn test_output_is_truncated_by_characters() {
        let html = format!("<article>{}</article>", "台積電".repeat(200));
        let text = extract_readable_text(&html, 250).unwrap();
        assert_eq!(text.chars().count(), 250);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  a \t b \n\n\n\n c  \n d "),
            "a b\n\nc\nd"
        );
    }
}
