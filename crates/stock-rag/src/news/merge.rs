//! Interleave and deduplicate two news lists

use super::{NewsItem, SourceTag};
use std::collections::HashSet;

/// Merge limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Items taken from each source before backfill
    pub take_each: usize,
    /// Maximum merged items
    pub cap: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            take_each: 4,
            cap: 8,
        }
    }
}

/// Merge FinMind (`primary`) and RSS (`secondary`) news into one list.
///
/// Each source contributes `take_each` items. A source that falls short lets
/// the other contribute the deficit on top, once per direction. The two
/// slices are interleaved starting with `primary`, empty titles are
/// dropped, the first occurrence of a trimmed title wins, and the result is
/// cut at `cap` without re-sorting.
pub fn merge_news(
    primary: &[NewsItem],
    secondary: &[NewsItem],
    options: MergeOptions,
) -> Vec<NewsItem> {
    let take = options.take_each;
    let mut primary_len = primary.len().min(take);
    let mut secondary_len = secondary.len().min(take);

    if primary_len < take && secondary.len() > take {
        let deficit = take - primary_len;
        secondary_len = secondary.len().min(take + deficit);
        tracing::debug!(deficit, secondary_len, "primary news short, backfilling from secondary");
    }

    if secondary_len < take && primary.len() > take {
        let deficit = take - secondary_len;
        primary_len = primary.len().min(take + deficit);
        tracing::debug!(deficit, primary_len, "secondary news short, backfilling from primary");
    }

    let primary = tagged(&primary[..primary_len], SourceTag::FinMind);
    let secondary = tagged(&secondary[..secondary_len], SourceTag::Rss);

    let rounds = primary.len().max(secondary.len());
    let interleaved = (0..rounds).flat_map(|i| {
        primary
            .get(i)
            .into_iter()
            .chain(secondary.get(i))
            .cloned()
    });

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(options.cap);
    for item in interleaved {
        let title = item.title_key();
        if title.is_empty() {
            tracing::debug!(source = %item.source, "skipping news item without title");
            continue;
        }
        if !seen.insert(title.to_string()) {
            tracing::debug!(title, source = %item.source, "skipping duplicate headline");
            continue;
        }
        merged.push(item);
    }

    if merged.is_empty() {
        tracing::warn!("no usable news after merge");
    }

    merged.truncate(options.cap);
    merged
}

fn tagged(items: &[NewsItem], tag: SourceTag) -> Vec<NewsItem> {
    items
        .iter()
        .cloned()
        .map(|mut item| {
            item.source_tag = tag;
            if item.source.trim().is_empty() {
                item.source = tag.default_label().to_string();
            }
            item
        })
        .collect()
}
