//! Lazy full-text ranking for citation excerpts
//!
//! Only a handful of the merged headlines are worth downloading. They are
//! picked by title overlap with the query, fetched through the cache layer,
//! and cut down to a couple of query-relevant excerpts each.

mod extract;
mod snippets;
mod tokenize;

pub use extract::{MIN_ARTICLE_CHARS, extract_readable_text, normalize_whitespace};
pub use snippets::extract_snippets;
pub use tokenize::{overlap_score, tokenize};

use crate::cache::{CacheLayer, Fetch};
use crate::links::is_fetchable_article;
use crate::news::NewsItem;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Excerpts kept per article
pub const SNIPPETS_PER_ARTICLE: usize = 2;

/// Pick up to `k` candidates (0-based) whose titles best match `query`.
///
/// Candidates with a blank title are never picked. Ties keep list order.
/// When no title shares a token with the query, the first `k` titled
/// candidates are returned instead.
pub fn select_top_k(query: &str, candidates: &[NewsItem], k: usize) -> Vec<usize> {
    let tokens = tokenize(query);

    let mut scored: Vec<(usize, usize)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.title.trim().is_empty())
        .map(|(i, item)| (overlap_score(&tokens, item.title.trim()), i))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let top: Vec<usize> = scored
        .iter()
        .take(k)
        .filter(|(score, _)| *score > 0)
        .map(|&(_, i)| i)
        .collect();
    if !top.is_empty() {
        return top;
    }

    candidates
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.title.trim().is_empty())
        .map(|(i, _)| i)
        .take(k)
        .collect()
}

/// Fetches and excerpts the best-matching articles
pub struct FulltextRanker {
    cache: Arc<CacheLayer>,
    top_k: usize,
}

impl FulltextRanker {
    pub fn new(cache: Arc<CacheLayer>, top_k: usize) -> Self {
        Self { cache, top_k }
    }

    /// Excerpts keyed by 1-based position in `candidates`.
    ///
    /// `rank_query` picks the articles; `snippet_query` scores paragraphs
    /// inside them. Articles that fail the fetch gate, fail to download or
    /// yield no excerpt are left out.
    pub async fn select_and_extract(
        &self,
        rank_query: &str,
        snippet_query: &str,
        candidates: &[NewsItem],
    ) -> BTreeMap<usize, Vec<String>> {
        let mut excerpts = BTreeMap::new();

        for index in select_top_k(rank_query, candidates, self.top_k) {
            let url = candidates[index].url.trim();
            if !is_fetchable_article(url) {
                debug!(index, url, "skipping full text, not an article link");
                continue;
            }

            let Fetch::Found(text) = self.cache.fulltext(url).await else {
                continue;
            };

            let snippets = extract_snippets(snippet_query, &text, SNIPPETS_PER_ARTICLE);
            debug!(index, url, snippets = snippets.len(), "full text excerpted");
            if !snippets.is_empty() {
                excerpts.insert(index + 1, snippets);
            }
        }

        excerpts
    }
}
