//! Configuration for the retrieval pipeline

use crate::error::{Result, StockError};
use rag_utils::{env_duration_secs, env_or, env_string};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the retrieval pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// FinMind API token (optional, anonymous access is heavily throttled)
    pub finmind_api_key: Option<String>,

    /// Maximum FinMind requests per minute
    pub finmind_rate_limit: u32,

    /// Cache TTL for the stock directory
    pub cache_ttl_directory: Duration,

    /// Cache TTL for price quotes
    pub cache_ttl_price: Duration,

    /// Cache TTL for per-ticker news
    pub cache_ttl_news: Duration,

    /// Cache TTL for extracted article text
    pub cache_ttl_fulltext: Duration,

    /// Cache TTL for assembled contexts
    pub cache_ttl_context: Duration,

    /// Timeout for price, news, feed and article requests
    pub request_timeout: Duration,

    /// Timeout for the directory dataset request
    pub directory_timeout: Duration,

    /// Items taken from each news source before merging
    pub news_take_each: usize,

    /// Maximum merged news items
    pub news_cap: usize,

    /// Number of articles fetched for full-text excerpts
    pub fulltext_top_k: usize,

    /// Maximum characters kept from one article
    pub fulltext_max_chars: usize,

    /// Language hint for the RSS search feed
    pub feed_language: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            finmind_api_key: None,
            finmind_rate_limit: 60,
            cache_ttl_directory: Duration::from_secs(7 * 24 * 3600), // 7 days
            cache_ttl_price: Duration::from_secs(120),               // 2 minutes
            cache_ttl_news: Duration::from_secs(24 * 3600),          // 1 day
            cache_ttl_fulltext: Duration::from_secs(3600),           // 1 hour
            cache_ttl_context: Duration::from_secs(120),             // 2 minutes
            request_timeout: Duration::from_secs(10),
            directory_timeout: Duration::from_secs(15),
            news_take_each: 4,
            news_cap: 8,
            fulltext_top_k: 3,
            fulltext_max_chars: 20_000,
            feed_language: "zh-TW".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new configuration builder
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load every setting from the environment, defaulting what is unset
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            finmind_api_key: env_string("FINMIND_API_KEY"),
            finmind_rate_limit: env_or("RAG_FINMIND_RATE_LIMIT", defaults.finmind_rate_limit)?,
            cache_ttl_directory: env_duration_secs(
                "RAG_DIRECTORY_TTL_SECS",
                defaults.cache_ttl_directory,
            )?,
            cache_ttl_price: env_duration_secs("RAG_PRICE_TTL_SECS", defaults.cache_ttl_price)?,
            cache_ttl_news: env_duration_secs("RAG_NEWS_TTL_SECS", defaults.cache_ttl_news)?,
            cache_ttl_fulltext: env_duration_secs(
                "RAG_FULLTEXT_TTL_SECS",
                defaults.cache_ttl_fulltext,
            )?,
            cache_ttl_context: env_duration_secs(
                "RAG_CONTEXT_TTL_SECS",
                defaults.cache_ttl_context,
            )?,
            request_timeout: env_duration_secs(
                "RAG_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout,
            )?,
            directory_timeout: env_duration_secs(
                "RAG_DIRECTORY_TIMEOUT_SECS",
                defaults.directory_timeout,
            )?,
            feed_language: env_string("RAG_FEED_LANGUAGE").unwrap_or(defaults.feed_language),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.finmind_rate_limit == 0 {
            return Err(StockError::ConfigError(
                "finmind_rate_limit must be greater than 0".to_string(),
            ));
        }

        if self.news_take_each == 0 || self.news_cap == 0 {
            return Err(StockError::ConfigError(
                "news_take_each and news_cap must be greater than 0".to_string(),
            ));
        }

        let ttls = [
            self.cache_ttl_directory,
            self.cache_ttl_price,
            self.cache_ttl_news,
            self.cache_ttl_fulltext,
            self.cache_ttl_context,
        ];
        if ttls.iter().any(Duration::is_zero) {
            return Err(StockError::ConfigError(
                "cache TTLs must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for RagConfig
#[derive(Debug, Default)]
pub struct RagConfigBuilder {
    finmind_api_key: Option<String>,
    finmind_rate_limit: Option<u32>,
    cache_ttl_directory: Option<Duration>,
    cache_ttl_price: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    cache_ttl_fulltext: Option<Duration>,
    cache_ttl_context: Option<Duration>,
    request_timeout: Option<Duration>,
    news_take_each: Option<usize>,
    news_cap: Option<usize>,
    fulltext_top_k: Option<usize>,
}

impl RagConfigBuilder {
    /// Set the FinMind API token
    pub fn finmind_api_key(mut self, key: impl Into<String>) -> Self {
        self.finmind_api_key = Some(key.into());
        self
    }

    /// Set the FinMind requests-per-minute budget
    pub fn finmind_rate_limit(mut self, per_minute: u32) -> Self {
        self.finmind_rate_limit = Some(per_minute);
        self
    }

    /// Set cache TTL for the stock directory
    pub fn cache_ttl_directory(mut self, duration: Duration) -> Self {
        self.cache_ttl_directory = Some(duration);
        self
    }

    /// Set cache TTL for price quotes
    pub fn cache_ttl_price(mut self, duration: Duration) -> Self {
        self.cache_ttl_price = Some(duration);
        self
    }

    /// Set cache TTL for per-ticker news
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set cache TTL for article text
    pub fn cache_ttl_fulltext(mut self, duration: Duration) -> Self {
        self.cache_ttl_fulltext = Some(duration);
        self
    }

    /// Set cache TTL for assembled contexts
    pub fn cache_ttl_context(mut self, duration: Duration) -> Self {
        self.cache_ttl_context = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set how many items each news source contributes
    pub fn news_take_each(mut self, n: usize) -> Self {
        self.news_take_each = Some(n);
        self
    }

    /// Set the merged news cap
    pub fn news_cap(mut self, n: usize) -> Self {
        self.news_cap = Some(n);
        self
    }

    /// Set how many articles get full-text excerpts
    pub fn fulltext_top_k(mut self, k: usize) -> Self {
        self.fulltext_top_k = Some(k);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RagConfig> {
        let defaults = RagConfig::default();

        let config = RagConfig {
            finmind_api_key: self.finmind_api_key,
            finmind_rate_limit: self.finmind_rate_limit.unwrap_or(defaults.finmind_rate_limit),
            cache_ttl_directory: self.cache_ttl_directory.unwrap_or(defaults.cache_ttl_directory),
            cache_ttl_price: self.cache_ttl_price.unwrap_or(defaults.cache_ttl_price),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            cache_ttl_fulltext: self.cache_ttl_fulltext.unwrap_or(defaults.cache_ttl_fulltext),
            cache_ttl_context: self.cache_ttl_context.unwrap_or(defaults.cache_ttl_context),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            news_take_each: self.news_take_each.unwrap_or(defaults.news_take_each),
            news_cap: self.news_cap.unwrap_or(defaults.news_cap),
            fulltext_top_k: self.fulltext_top_k.unwrap_or(defaults.fulltext_top_k),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}
