//! Query to context pipeline
//!
//! [`ContextAssembler::build_context`] turns one free-text question into the
//! grounded context handed to the summarizer: a price line, numbered news
//! citations and, for the best-matching articles, excerpts cited with the
//! same numbers. It never fails; missing pieces are left out and a total
//! miss yields [`NO_INFO_MESSAGE`].

use crate::api::{
    CompanyNewsSource, DirectorySource, FeedSource, FinMindClient, GoogleNewsClient, PageFetcher,
    PriceSource, WebPageFetcher,
};
use crate::cache::{
    CacheLayer, CacheLayerStats, CacheStatsSnapshot, DirectoryCache, Fetch,
    spawn_directory_refresh,
};
use crate::clock::{Clock, SystemClock};
use crate::config::RagConfig;
use crate::directory::{StockDirectory, StockRecord};
use crate::error::Result;
use crate::fulltext::FulltextRanker;
use crate::links::{looks_like_article, normalize_url};
use crate::news::{MergeOptions, NewsItem, merge_news};
use crate::price::PriceQuote;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Reply when the query names no known company
pub const NOT_FOUND_MESSAGE: &str =
    "Sorry, no listed company matches this query. Please check the company name or ticker.";

/// Reply when a company resolved but nothing could be retrieved for it
pub const NO_INFO_MESSAGE: &str = "(Sorry, no recent information was found for this query.)";

const NEWS_HEADER: &str = "[News sources (cite with [n])]";
const EXCERPT_HEADER: &str = "[Full-text excerpts (cite with the same [n])]";

/// Upstream collaborators of the pipeline
pub struct Sources {
    pub directory: Arc<dyn DirectorySource>,
    pub prices: Arc<dyn PriceSource>,
    pub company_news: Arc<dyn CompanyNewsSource>,
    pub feed: Arc<dyn FeedSource>,
    pub pages: Arc<dyn PageFetcher>,
}

impl Sources {
    /// FinMind for directory, prices and company news; Google News RSS for
    /// the keyword feed; a plain HTTP fetcher for article pages.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let finmind = Arc::new(FinMindClient::from_config(config)?);

        Ok(Self {
            directory: finmind.clone(),
            prices: finmind.clone(),
            company_news: finmind,
            feed: Arc::new(GoogleNewsClient::from_config(config)?),
            pages: Arc::new(WebPageFetcher::from_config(config)?),
        })
    }
}

/// Builds citation-numbered context for a query
pub struct ContextAssembler {
    directory_cache: Arc<DirectoryCache>,
    directory: StockDirectory,
    cache: Arc<CacheLayer>,
    feed: Arc<dyn FeedSource>,
    ranker: FulltextRanker,
    merge: MergeOptions,
    refresh_interval: Duration,
}

impl ContextAssembler {
    pub fn new(config: &RagConfig, sources: Sources, clock: Arc<dyn Clock>) -> Self {
        let directory_cache = Arc::new(DirectoryCache::new(
            sources.directory,
            config.cache_ttl_directory,
            Arc::clone(&clock),
        ));
        let cache = Arc::new(CacheLayer::new(
            config,
            clock,
            sources.prices,
            sources.company_news,
            sources.pages,
        ));

        Self {
            directory: directory_cache.directory(),
            directory_cache,
            ranker: FulltextRanker::new(Arc::clone(&cache), config.fulltext_top_k),
            cache,
            feed: sources.feed,
            merge: MergeOptions {
                take_each: config.news_take_each,
                cap: config.news_cap,
            },
            refresh_interval: config.cache_ttl_directory,
        }
    }

    /// Production wiring against the live upstreams
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config,
            Sources::from_config(config)?,
            Arc::new(SystemClock),
        ))
    }

    /// Load the directory now if it is missing or stale
    pub async fn refresh_directory(&self) -> Fetch<Arc<[StockRecord]>> {
        self.directory_cache.records().await
    }

    /// Start the periodic directory refresh, one pass per directory TTL
    pub fn spawn_directory_refresh(&self) -> JoinHandle<()> {
        spawn_directory_refresh(Arc::clone(&self.directory_cache), self.refresh_interval)
    }

    pub fn directory(&self) -> &StockDirectory {
        &self.directory
    }

    pub fn cache_stats(&self) -> CacheLayerStats {
        self.cache.stats()
    }

    pub fn directory_stats(&self) -> CacheStatsSnapshot {
        self.directory_cache.stats()
    }

    /// Assemble the context for a raw query.
    ///
    /// Results are cached under the exact query text. The not-found and
    /// no-information replies are never cached.
    pub async fn build_context(&self, query: &str) -> String {
        if let Some(cached) = self.cache.context(query).await {
            info!(query, "context served from cache");
            return cached;
        }

        // Startup load and background pass may both have failed; retry
        // here instead of waiting a full directory TTL.
        if self.directory.current().is_empty() {
            info!("stock directory empty, loading before resolving");
            self.directory_cache.records().await;
        }

        let Some(company) = self.directory.resolve(query) else {
            return NOT_FOUND_MESSAGE.to_string();
        };
        let ticker = company.ticker.as_str();
        let name = company.name.as_str();

        let price = self.cache.price(ticker).await.into_option();

        let finmind_news = self.cache.news(ticker, name).await.into_option().unwrap_or_default();
        let feed_news = match self.feed.search_news(name, ticker).await {
            Ok(items) => items,
            Err(e) => {
                warn!(ticker, error = %e, "news feed search failed");
                Vec::new()
            }
        };

        let mut merged = merge_news(&finmind_news, &feed_news, self.merge);
        for item in &mut merged {
            item.url = citable_url(&item.url);
        }
        info!(
            ticker,
            finmind = finmind_news.len(),
            feed = feed_news.len(),
            merged = merged.len(),
            "news merged"
        );

        let snippet_query = format!("{query} {name}");
        let excerpts = self
            .ranker
            .select_and_extract(query, &snippet_query, &merged)
            .await;

        let Some(context) = compose(price.as_ref(), &merged, &excerpts) else {
            warn!(query, ticker, "nothing retrieved for query");
            return NO_INFO_MESSAGE.to_string();
        };

        self.cache.store_context(query, context.clone()).await;
        info!(
            query,
            ticker,
            news = merged.len(),
            excerpts = excerpts.len(),
            "context assembled"
        );
        context
    }
}

/// Normalized URL, or empty when it does not point at an article
fn citable_url(raw: &str) -> String {
    let url = normalize_url(raw);
    if looks_like_article(&url) {
        url
    } else {
        String::new()
    }
}

fn compose(
    price: Option<&PriceQuote>,
    news: &[NewsItem],
    excerpts: &BTreeMap<usize, Vec<String>>,
) -> Option<String> {
    let mut lines = Vec::new();

    if let Some(quote) = price {
        lines.push(quote.context_line());
    }

    if !news.is_empty() {
        lines.push(NEWS_HEADER.to_string());
        for (i, item) in news.iter().enumerate() {
            lines.push(format!(
                "[{}] {} | {} | {} | {}",
                i + 1,
                item.title.trim(),
                or_placeholder(&item.source, "Unknown source"),
                or_placeholder(&item.published_at, "Unknown date"),
                or_placeholder(&item.url, "No link"),
            ));
        }
    }

    if !excerpts.is_empty() {
        lines.push(String::new());
        lines.push(EXCERPT_HEADER.to_string());
        for (index, snippets) in excerpts {
            for (j, snippet) in snippets.iter().enumerate() {
                lines.push(format!("[{index}] excerpt {}: {snippet}", j + 1));
            }
        }
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    match value.trim() {
        "" => placeholder,
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        DailyClose, MockCompanyNewsSource, MockDirectorySource, MockFeedSource, MockPageFetcher,
        MockPriceSource,
    };
    use crate::clock::ManualClock;
    use crate::error::StockError;
    use crate::news::SourceTag;
    use chrono::{TimeDelta, TimeZone, Utc};
    use mockall::Sequence;

    struct Mocks {
        prices: MockPriceSource,
        news: MockCompanyNewsSource,
        feed: MockFeedSource,
        pages: MockPageFetcher,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                prices: MockPriceSource::new(),
                news: MockCompanyNewsSource::new(),
                feed: MockFeedSource::new(),
                pages: MockPageFetcher::new(),
            }
        }

        fn sources(self, directory: MockDirectorySource) -> Sources {
            Sources {
                directory: Arc::new(directory),
                prices: Arc::new(self.prices),
                company_news: Arc::new(self.news),
                feed: Arc::new(self.feed),
                pages: Arc::new(self.pages),
            }
        }

        async fn assembler(self, clock: Arc<ManualClock>) -> ContextAssembler {
            let mut directory = MockDirectorySource::new();
            directory.expect_stock_records().times(1).returning(|| {
                Ok(vec![
                    StockRecord::new("台積電", "2330"),
                    StockRecord::new("鴻海", "2317"),
                ])
            });

            let assembler =
                ContextAssembler::new(&RagConfig::default(), self.sources(directory), clock);
            assert!(assembler.refresh_directory().await.is_found());
            assembler
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
        ))
    }

    fn closes() -> Vec<DailyClose> {
        [("2025-01-03", 595.0), ("2025-01-06", 600.0)]
            .into_iter()
            .map(|(date, close)| DailyClose {
                date: date.to_string(),
                stock_id: "2330".to_string(),
                close,
            })
            .collect()
    }

    fn finmind_news() -> Vec<NewsItem> {
        vec![
            NewsItem::new(
                "台積電 2330 法說會釋利多",
                "經濟日報",
                "2025-01-06",
                "https://money.udn.com/money/story/5612/1001",
                SourceTag::FinMind,
            ),
            NewsItem::new(
                "台積電營收創新高",
                "",
                "2025-01-05",
                "https://money.udn.com/money/story/5612/1002",
                SourceTag::FinMind,
            ),
            NewsItem::new(
                "外資買超台積電",
                "永豐金證券",
                "2025-01-04",
                "http://sinotrade.com.tw/richclub/news/3003",
                SourceTag::FinMind,
            ),
        ]
    }

    fn feed_news() -> Vec<NewsItem> {
        vec![
            NewsItem::new(
                "台積電 2330 法說會釋利多",
                "Yahoo",
                "Mon, 06 Jan 2025 02:00:00 GMT",
                "https://news.google.com/rss/articles/r1",
                SourceTag::Rss,
            ),
            NewsItem::new(
                "台積電 ADR 上漲",
                "鉅亨網",
                "Mon, 06 Jan 2025 01:00:00 GMT",
                "https://news.google.com/rss/articles/r2",
                SourceTag::Rss,
            ),
            NewsItem::new(
                "半導體族群走強",
                "中時",
                "",
                "https://news.google.com/rss/articles/r3",
                SourceTag::Rss,
            ),
            NewsItem::new(
                "先進封裝需求升溫",
                "工商時報",
                "Sun, 05 Jan 2025 08:00:00 GMT",
                "https://news.google.com/rss/articles/r4",
                SourceTag::Rss,
            ),
            NewsItem::new(
                "法人看好台積電",
                "",
                "Sun, 05 Jan 2025 07:00:00 GMT",
                "https://news.google.com/",
                SourceTag::Rss,
            ),
        ]
    }

    fn article_html() -> String {
        let paragraph = "台積電法說會釋出樂觀展望，先進製程與先進封裝需求同步走強，".repeat(8);
        format!(
            "<html><body><nav>選單</nav><article><p>{paragraph}</p></article>\
             <footer>版權所有</footer></body></html>"
        )
    }

    fn citation_lines(context: &str) -> Vec<&str> {
        context
            .lines()
            .filter(|line| line.starts_with('[') && line.contains(" | "))
            .collect()
    }

    #[tokio::test]
    async fn test_end_to_end_context() {
        let mut mocks = Mocks::new();
        mocks
            .prices
            .expect_daily_closes()
            .withf(|ticker| ticker == "2330")
            .times(1)
            .returning(|_| Ok(closes()));
        mocks
            .news
            .expect_company_news()
            .withf(|ticker, company| ticker == "2330" && company == "台積電")
            .times(1)
            .returning(|_, _| Ok(finmind_news()));
        mocks
            .feed
            .expect_search_news()
            .withf(|company, ticker| company == "台積電" && ticker == "2330")
            .times(1)
            .returning(|_, _| Ok(feed_news()));
        mocks
            .pages
            .expect_fetch_html()
            .withf(|url| url == "https://money.udn.com/money/story/5612/1001")
            .times(1)
            .returning(|_| Ok(article_html()));

        let assembler = mocks.assembler(clock()).await;
        let context = assembler.build_context("2330").await;
        let lines: Vec<&str> = context.lines().collect();

        assert_eq!(lines[0], "[Price] 2330 last 600.00 (+5.00 / 0.84%)");
        assert_eq!(lines[1], NEWS_HEADER);

        let citations = citation_lines(&context);
        assert_eq!(citations.len(), 7);
        assert_eq!(
            citations,
            vec![
                "[1] 台積電 2330 法說會釋利多 | 經濟日報 | 2025-01-06 | https://money.udn.com/money/story/5612/1001",
                "[2] 台積電營收創新高 | FinMind | 2025-01-05 | https://money.udn.com/money/story/5612/1002",
                "[3] 台積電 ADR 上漲 | 鉅亨網 | Mon, 06 Jan 2025 01:00:00 GMT | https://news.google.com/rss/articles/r2",
                "[4] 外資買超台積電 | 永豐金證券 | 2025-01-04 | https://www.sinotrade.com.tw/richclub/news/3003",
                "[5] 半導體族群走強 | 中時 | Unknown date | https://news.google.com/rss/articles/r3",
                "[6] 先進封裝需求升溫 | 工商時報 | Sun, 05 Jan 2025 08:00:00 GMT | https://news.google.com/rss/articles/r4",
                "[7] 法人看好台積電 | Google RSS | Sun, 05 Jan 2025 07:00:00 GMT | No link",
            ]
        );

        assert_eq!(lines[9], "");
        assert_eq!(lines[10], EXCERPT_HEADER);
        assert!(lines[11].starts_with("[1] excerpt 1: 台積電法說會釋出樂觀展望"));
        assert_eq!(lines.len(), 12);
        assert!(!context.contains("選單"));
    }

    #[tokio::test]
    async fn test_empty_directory_is_reloaded_on_request() {
        let mut seq = Sequence::new();
        let mut directory = MockDirectorySource::new();
        directory
            .expect_stock_records()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|| Err(StockError::ApiError("quota exceeded".to_string())));
        directory
            .expect_stock_records()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![StockRecord::new("台積電", "2330")]));

        let mut mocks = Mocks::new();
        mocks.prices.expect_daily_closes().times(1).returning(|_| Ok(closes()));
        mocks.news.expect_company_news().times(1).returning(|_, _| Ok(Vec::new()));
        mocks.feed.expect_search_news().times(2).returning(|_, _| Ok(Vec::new()));

        let assembler =
            ContextAssembler::new(&RagConfig::default(), mocks.sources(directory), clock());

        assert!(matches!(assembler.refresh_directory().await, Fetch::Failed(_)));
        assert_eq!(assembler.build_context("2330").await, NOT_FOUND_MESSAGE);

        let context = assembler.build_context("2330").await;
        assert_eq!(context, "[Price] 2330 last 600.00 (+5.00 / 0.84%)");

        // Loaded now, so later requests leave the directory alone.
        assert_eq!(assembler.build_context("台積電").await, context);
        assert_eq!(assembler.directory_stats().refreshes, 1);
        assert_eq!(assembler.directory_stats().misses, 3);
    }

    #[tokio::test]
    async fn test_unknown_company_fetches_nothing() {
        let mut mocks = Mocks::new();
        mocks.prices.expect_daily_closes().times(0);
        mocks.news.expect_company_news().times(0);
        mocks.feed.expect_search_news().times(0);
        mocks.pages.expect_fetch_html().times(0);

        let assembler = mocks.assembler(clock()).await;

        assert_eq!(assembler.build_context("unknown xyz corp").await, NOT_FOUND_MESSAGE);
        assert_eq!(assembler.cache_stats().context.refreshes, 0);
    }

    #[tokio::test]
    async fn test_context_is_cached_by_raw_query() {
        let mut mocks = Mocks::new();
        mocks.prices.expect_daily_closes().times(1).returning(|_| Ok(closes()));
        mocks.news.expect_company_news().times(1).returning(|_, _| Ok(Vec::new()));
        mocks.feed.expect_search_news().times(2).returning(|_, _| Ok(Vec::new()));

        let clock = clock();
        let assembler = mocks.assembler(clock.clone()).await;

        let first = assembler.build_context("台積電").await;
        let second = assembler.build_context("台積電").await;
        assert_eq!(first, "[Price] 2330 last 600.00 (+5.00 / 0.84%)");
        assert_eq!(first, second);
        assert_eq!(assembler.cache_stats().context.hits, 1);

        // Different raw text misses the context cache but the price and
        // news caches still serve it.
        let padded = assembler.build_context(" 台積電").await;
        assert_eq!(padded, first);
        assert_eq!(assembler.cache_stats().price.hits, 1);

        clock.advance(TimeDelta::seconds(1));
        assert_eq!(assembler.build_context("台積電").await, first);
    }

    #[tokio::test]
    async fn test_nothing_retrieved_gives_no_info_message() {
        let mut mocks = Mocks::new();
        mocks
            .prices
            .expect_daily_closes()
            .times(2)
            .returning(|_| Err(StockError::ApiError("503".to_string())));
        mocks
            .news
            .expect_company_news()
            .times(1)
            .returning(|_, _| Err(StockError::ApiError("503".to_string())));
        mocks
            .feed
            .expect_search_news()
            .times(2)
            .returning(|_, _| Err(StockError::Other("feed down".to_string())));

        let assembler = mocks.assembler(clock()).await;

        assert_eq!(assembler.build_context("鴻海").await, NO_INFO_MESSAGE);
        assert_eq!(assembler.build_context("鴻海").await, NO_INFO_MESSAGE);
        assert_eq!(assembler.cache_stats().context.refreshes, 0);
    }

    #[tokio::test]
    async fn test_news_without_price() {
        let mut mocks = Mocks::new();
        mocks
            .prices
            .expect_daily_closes()
            .times(1)
            .returning(|_| Ok(closes().into_iter().take(1).collect()));
        mocks.news.expect_company_news().times(1).returning(|_, _| {
            Ok(vec![NewsItem::new(
                "鴻海 AI 伺服器出貨",
                "經濟日報",
                "2025-01-06",
                "ftp://files.example.com/report",
                SourceTag::FinMind,
            )])
        });
        mocks.feed.expect_search_news().times(1).returning(|_, _| Ok(Vec::new()));

        let assembler = mocks.assembler(clock()).await;
        let context = assembler.build_context("鴻海 今天").await;

        assert_eq!(
            context,
            "[News sources (cite with [n])]\n[1] 鴻海 AI 伺服器出貨 | 經濟日報 | 2025-01-06 | No link"
        );
    }

    #[test]
    fn test_citable_url() {
        assert_eq!(citable_url("http://x.com/a"), "https://x.com/a");
        assert_eq!(citable_url("https://x.com/"), "");
        assert_eq!(citable_url("https://x.com/?p=1"), "https://x.com/?p=1");
        assert_eq!(citable_url("javascript:void(0)"), "");
    }
}
