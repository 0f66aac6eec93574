//! News items and multi-source merging

mod merge;

pub use merge::{MergeOptions, merge_news};

use serde::{Deserialize, Serialize};

/// Which upstream a news item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// FinMind structured news dataset
    FinMind,
    /// Keyword RSS search feed
    Rss,
}

impl SourceTag {
    /// Label used when an item carries no publisher name
    pub fn default_label(&self) -> &'static str {
        match self {
            Self::FinMind => "FinMind",
            Self::Rss => "Google RSS",
        }
    }
}

/// A headline with its publisher, date and link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub source: String,
    pub published_at: String,
    pub url: String,
    pub source_tag: SourceTag,
}

impl NewsItem {
    pub fn new(
        title: impl Into<String>,
        source: impl Into<String>,
        published_at: impl Into<String>,
        url: impl Into<String>,
        source_tag: SourceTag,
    ) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            published_at: published_at.into(),
            url: url.into(),
            source_tag,
        }
    }

    /// Dedup identity
    pub fn title_key(&self) -> &str {
        self.title.trim()
    }
}
