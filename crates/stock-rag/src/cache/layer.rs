//! Read-through caches for price, news, article text and assembled context

use super::{CacheStatsSnapshot, Fetch, TtlCache};
use crate::api::{CompanyNewsSource, PageFetcher, PriceSource};
use crate::clock::Clock;
use crate::config::RagConfig;
use crate::error::StockError;
use crate::fulltext::extract_readable_text;
use crate::news::NewsItem;
use crate::price::PriceQuote;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Counters for every cache in a [`CacheLayer`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheLayerStats {
    pub price: CacheStatsSnapshot,
    pub news: CacheStatsSnapshot,
    pub fulltext: CacheStatsSnapshot,
    pub context: CacheStatsSnapshot,
}

/// Cached access to the per-query upstreams
///
/// | cache    | key       | failure cached? |
/// |----------|-----------|-----------------|
/// | price    | ticker    | no              |
/// | news     | ticker    | yes, as empty   |
/// | fulltext | URL       | no              |
/// | context  | raw query | n/a             |
pub struct CacheLayer {
    prices: Arc<dyn PriceSource>,
    company_news: Arc<dyn CompanyNewsSource>,
    pages: Arc<dyn PageFetcher>,
    price: TtlCache<String, PriceQuote>,
    news: TtlCache<String, Vec<NewsItem>>,
    fulltext: TtlCache<String, String>,
    context: TtlCache<String, String>,
    fulltext_max_chars: usize,
}

impl CacheLayer {
    pub fn new(
        config: &RagConfig,
        clock: Arc<dyn Clock>,
        prices: Arc<dyn PriceSource>,
        company_news: Arc<dyn CompanyNewsSource>,
        pages: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            prices,
            company_news,
            pages,
            price: TtlCache::new("price", config.cache_ttl_price, Arc::clone(&clock)),
            news: TtlCache::new("news", config.cache_ttl_news, Arc::clone(&clock)),
            fulltext: TtlCache::new("fulltext", config.cache_ttl_fulltext, Arc::clone(&clock)),
            context: TtlCache::new("context", config.cache_ttl_context, clock),
            fulltext_max_chars: config.fulltext_max_chars,
        }
    }

    /// Latest quote for a ticker. Needs two daily closes; anything less or
    /// a failed call is not cached.
    pub async fn price(&self, ticker: &str) -> Fetch<PriceQuote> {
        let result = self
            .price
            .get_or_fetch(ticker.to_string(), || async {
                let closes = self.prices.daily_closes(ticker).await?;
                PriceQuote::from_closes(ticker, &closes).ok_or_else(|| {
                    StockError::DataUnavailable {
                        symbol: ticker.to_string(),
                        reason: format!("{} daily closes, need two", closes.len()),
                    }
                })
            })
            .await;

        match result {
            Ok(quote) => Fetch::Found(quote),
            Err(e) if e.is_absence() => {
                info!(ticker, reason = %e, "no price quote");
                Fetch::Empty
            }
            Err(e) => {
                warn!(ticker, error = %e, "price fetch failed");
                Fetch::Failed(e)
            }
        }
    }

    /// Structured headlines for a company. A failed call is stored as an
    /// empty list so the upstream is not retried until the entry expires.
    pub async fn news(&self, ticker: &str, company: &str) -> Fetch<Vec<NewsItem>> {
        let key = ticker.to_string();
        if let Some(items) = self.news.get(&key).await {
            return found_or_empty(items);
        }

        match self.company_news.company_news(ticker, company).await {
            Ok(items) => {
                self.news.insert(key, items.clone()).await;
                found_or_empty(items)
            }
            Err(e) => {
                warn!(ticker, error = %e, "company news fetch failed, caching empty result");
                self.news.insert(key, Vec::new()).await;
                Fetch::Failed(e)
            }
        }
    }

    /// Readable text of an article page. Failed downloads and pages with
    /// too little text are not cached.
    pub async fn fulltext(&self, url: &str) -> Fetch<String> {
        let result = self
            .fulltext
            .get_or_fetch(url.to_string(), || async {
                let html = self.pages.fetch_html(url).await?;
                extract_readable_text(&html, self.fulltext_max_chars)
                    .ok_or_else(|| StockError::NoContent(url.to_string()))
            })
            .await;

        match result {
            Ok(text) => Fetch::Found(text),
            Err(e) if e.is_absence() => {
                info!(url, "page has no usable text");
                Fetch::Empty
            }
            Err(e) => {
                warn!(url, error = %e, "page fetch failed");
                Fetch::Failed(e)
            }
        }
    }

    /// Previously assembled context for this exact query text
    pub async fn context(&self, query: &str) -> Option<String> {
        self.context.get(&query.to_string()).await
    }

    pub async fn store_context(&self, query: &str, context: String) {
        self.context.insert(query.to_string(), context).await;
    }

    pub fn stats(&self) -> CacheLayerStats {
        CacheLayerStats {
            price: self.price.stats(),
            news: self.news.stats(),
            fulltext: self.fulltext.stats(),
            context: self.context.stats(),
        }
    }
}

fn found_or_empty(items: Vec<NewsItem>) -> Fetch<Vec<NewsItem>> {
    if items.is_empty() {
        Fetch::Empty
    } else {
        Fetch::Found(items)
    }
}
