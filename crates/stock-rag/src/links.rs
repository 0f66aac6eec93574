//! URL normalization and article gating

use url::Url;

/// Hosts rewritten to their canonical form before citation
const CANONICAL_HOSTS: &[(&str, &str)] = &[("sinotrade.com.tw", "www.sinotrade.com.tw")];

/// Normalize a URL for display and fetching.
///
/// Upgrades `http` to `https`, rejects anything without an http(s) scheme
/// and a host, and applies the host rewrites in [`CANONICAL_HOSTS`]. Any
/// failure yields an empty string. Idempotent.
pub fn normalize_url(raw: &str) -> String {
    let Some(mut url) = parse_web_url(raw) else {
        return String::new();
    };

    // Scheme is lowercased by the parser, so `HTTP://` lands here too.
    if url.scheme() == "http" && url.set_scheme("https").is_err() {
        return String::new();
    }

    let host = url.host_str().unwrap_or_default().to_lowercase();
    if let Some(&(_, canonical)) = CANONICAL_HOSTS.iter().find(|(from, _)| *from == host) {
        if url.set_host(Some(canonical)).is_err() {
            return String::new();
        }
    }

    url.to_string()
}

/// `true` when the URL points below a site's homepage.
///
/// Used to decide whether a link is worth citing at all.
pub fn looks_like_article(url: &str) -> bool {
    let Some(parsed) = parse_web_url(url) else {
        return false;
    };
    !is_homepage(&parsed)
}

/// Stricter gate applied before fetching an article body.
///
/// Besides [`looks_like_article`], the path without surrounding slashes must
/// be at least five characters long.
pub fn is_fetchable_article(url: &str) -> bool {
    let Some(parsed) = parse_web_url(url) else {
        return false;
    };
    if is_homepage(&parsed) {
        return false;
    }
    parsed.path().trim_matches('/').chars().count() >= 5
}

fn parse_web_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url.trim()).ok()?;
    let web = matches!(parsed.scheme(), "http" | "https");
    let has_host = parsed.host_str().is_some_and(|h| !h.is_empty());
    (web && has_host).then_some(parsed)
}

fn is_homepage(url: &Url) -> bool {
    matches!(url.path(), "" | "/") && url.query().is_none()
}
