//! Google News RSS search client

use super::FeedSource;
use crate::config::RagConfig;
use crate::error::{Result, StockError};
use crate::news::{NewsItem, SourceTag};
use async_trait::async_trait;
use reqwest::Client;
use rss::Channel;
use url::Url;

const SEARCH_URL: &str = "https://news.google.com/rss/search";

/// Entries kept from one feed
const FEED_LIMIT: usize = 8;

/// Keyword search over the Google News RSS feed
#[derive(Debug, Clone)]
pub struct GoogleNewsClient {
    client: Client,
    language: String,
}

impl GoogleNewsClient {
    pub fn new(client: Client, language: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
        }
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::new(client, config.feed_language.clone()))
    }

    /// Search URL for `<company> <ticker>`, Taiwan edition
    pub fn search_url(&self, company: &str, ticker: &str) -> Result<Url> {
        let query = if ticker.is_empty() {
            company.to_string()
        } else {
            format!("{company} {ticker}")
        };

        Url::parse_with_params(
            SEARCH_URL,
            &[
                ("q", query.as_str()),
                ("hl", self.language.as_str()),
                ("gl", "TW"),
                ("ceid", "TW:zh-Hant"),
            ],
        )
        .map_err(|e| StockError::Other(format!("Invalid feed URL: {e}")))
    }
}

#[async_trait]
impl FeedSource for GoogleNewsClient {
    async fn search_news(&self, company: &str, ticker: &str) -> Result<Vec<NewsItem>> {
        let url = self.search_url(company, ticker)?;
        tracing::debug!(%url, "fetching news feed");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        let items = parse_feed(&body)?;
        tracing::info!(company, ticker, entries = items.len(), "news feed fetched");
        Ok(items)
    }
}

/// Parse an RSS document into at most eight news items
pub fn parse_feed(xml: &[u8]) -> Result<Vec<NewsItem>> {
    let channel = Channel::read_from(xml)?;

    Ok(channel
        .items()
        .iter()
        .take(FEED_LIMIT)
        .map(|item| {
            NewsItem::new(
                item.title().unwrap_or_default(),
                item.source().and_then(|s| s.title()).unwrap_or_default(),
                item.pub_date().unwrap_or_default(),
                item.link().unwrap_or_default(),
                SourceTag::Rss,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"台積電 2330" - Google News</title>
    <link>https://news.google.com</link>
    <description>Google News</description>
    <item>
      <title>台積電營收創新高 - 經濟日報</title>
      <link>https://news.google.com/rss/articles/abc123</link>
      <pubDate>Mon, 06 Jan 2025 02:00:00 GMT</pubDate>
      <source url="https://money.udn.com">經濟日報</source>
    </item>
    <item>
      <title>外資調升目標價</title>
      <link>https://news.google.com/rss/articles/def456</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed() {
        let items = parse_feed(FEED.as_bytes()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "台積電營收創新高 - 經濟日報");
        assert_eq!(items[0].source, "經濟日報");
        assert_eq!(items[0].published_at, "Mon, 06 Jan 2025 02:00:00 GMT");
        assert_eq!(items[0].source_tag, SourceTag::Rss);
        assert_eq!(items[1].source, "");
        assert_eq!(items[1].published_at, "");
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(matches!(
            parse_feed(b"<html>not a feed</html>"),
            Err(StockError::FeedError(_))
        ));
    }

    #[test]
    fn test_search_url_encodes_query() {
        let client = GoogleNewsClient::new(Client::new(), "zh-TW");
        let url = client.search_url("台積電", "2330").unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0], ("q".to_string(), "台積電 2330".to_string()));
        assert_eq!(pairs[1], ("hl".to_string(), "zh-TW".to_string()));
        assert_eq!(url.host_str(), Some("news.google.com"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_search_news_live() {
        let client = GoogleNewsClient::new(Client::new(), "zh-TW");
        let items = client.search_news("台積電", "2330").await.unwrap();
        assert!(items.len() <= FEED_LIMIT);
    }
}
