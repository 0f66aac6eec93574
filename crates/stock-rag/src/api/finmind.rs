//! FinMind API client for Taiwan stock data
//!
//! Three datasets are used: `TaiwanStockInfo` for the directory,
//! `TaiwanStockPrice` for daily closes and `TaiwanStockNews` for headlines.
//! All requests share one rate limiter since they count against the same
//! account quota.

use super::{CompanyNewsSource, DirectorySource, PriceSource};
use crate::config::RagConfig;
use crate::directory::StockRecord;
use crate::error::{Result, StockError};
use crate::news::{NewsItem, SourceTag};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://api.finmindtrade.com/api/v4/data";

/// Headlines kept per company
const NEWS_LIMIT: usize = 8;
const PRICE_LOOKBACK_DAYS: i64 = 5;
const NEWS_LOOKBACK_DAYS: i64 = 7;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Envelope around every FinMind dataset response
#[derive(Debug, Deserialize)]
struct DatasetResponse<T> {
    #[serde(default)]
    msg: String,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StockInfoRow {
    #[serde(default)]
    stock_id: String,
    #[serde(default)]
    stock_name: String,
}

/// One trading day from `TaiwanStockPrice`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub stock_id: String,
    #[serde(default)]
    pub close: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct NewsRow {
    #[serde(default)]
    date: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    title: String,
}

/// FinMind client with rate limiting
#[derive(Debug, Clone)]
pub struct FinMindClient {
    client: Client,
    api_key: Option<String>,
    rate_limiter: SharedRateLimiter,
    directory_timeout: Duration,
    base_url: String,
}

impl FinMindClient {
    /// Create a new FinMind client
    ///
    /// # Arguments
    /// * `api_key` - FinMind token, `None` for anonymous access
    /// * `rate_limit` - Requests per minute
    pub fn new(api_key: Option<String>, rate_limit: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));

        Self {
            client: Client::new(),
            api_key,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            directory_timeout: Duration::from_secs(15),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Create a client using the configured token, quota and timeouts
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            directory_timeout: config.directory_timeout,
            ..Self::new(config.finmind_api_key.clone(), config.finmind_rate_limit)
        })
    }

    /// Point the client at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn dataset<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Vec<T>> {
        self.rate_limiter.until_ready().await;

        let mut request = self.client.get(&self.base_url).query(params);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StockError::ApiError(format!("FinMind request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StockError::ApiError(format!(
                "FinMind API error {status}: {body}"
            )));
        }

        let payload: DatasetResponse<T> = response
            .json()
            .await
            .map_err(|e| StockError::ApiError(format!("Failed to parse FinMind response: {e}")))?;

        match payload.status {
            Some(status) if status != 200 => Err(StockError::ApiError(format!(
                "FinMind API error {status}: {}",
                payload.msg
            ))),
            _ => Ok(payload.data),
        }
    }

    async fn news_rows(&self, data_id: &str) -> Result<Vec<NewsRow>> {
        let start = start_date(NEWS_LOOKBACK_DAYS);
        let rows: Vec<NewsRow> = self
            .dataset(
                &[
                    ("dataset", "TaiwanStockNews"),
                    ("data_id", data_id),
                    ("start_date", &start),
                ],
                None,
            )
            .await?;
        tracing::debug!(data_id, rows = rows.len(), "FinMind news rows");
        Ok(rows)
    }
}

#[async_trait]
impl DirectorySource for FinMindClient {
    async fn stock_records(&self) -> Result<Vec<StockRecord>> {
        let rows: Vec<StockInfoRow> = self
            .dataset(&[("dataset", "TaiwanStockInfo")], Some(self.directory_timeout))
            .await?;

        tracing::info!(rows = rows.len(), "fetched FinMind stock info");
        Ok(rows
            .into_iter()
            .map(|row| StockRecord::new(row.stock_name.trim(), row.stock_id.trim()))
            .collect())
    }
}

#[async_trait]
impl PriceSource for FinMindClient {
    async fn daily_closes(&self, ticker: &str) -> Result<Vec<DailyClose>> {
        let start = start_date(PRICE_LOOKBACK_DAYS);
        let rows: Vec<DailyClose> = self
            .dataset(
                &[
                    ("dataset", "TaiwanStockPrice"),
                    ("data_id", ticker),
                    ("start_date", &start),
                ],
                None,
            )
            .await?;

        tracing::debug!(ticker, rows = rows.len(), start = %start, "FinMind price rows");
        Ok(rows)
    }
}

#[async_trait]
impl CompanyNewsSource for FinMindClient {
    /// Query by ticker first, then by company name when the ticker has no
    /// rows. Only headlines mentioning the company or ticker are kept.
    async fn company_news(&self, ticker: &str, company: &str) -> Result<Vec<NewsItem>> {
        let mut rows = self.news_rows(ticker).await;

        let by_ticker_empty = matches!(&rows, Ok(found) if found.is_empty());
        if (by_ticker_empty || rows.is_err()) && !company.is_empty() && company != ticker {
            if let Err(e) = &rows {
                tracing::warn!(ticker, error = %e, "FinMind news by ticker failed, trying company name");
            }
            rows = self.news_rows(company).await;
        }

        let items = filter_company_news(rows?, ticker, company);
        tracing::info!(ticker, company, kept = items.len(), "FinMind news filtered");
        Ok(items)
    }
}

fn filter_company_news(rows: Vec<NewsRow>, ticker: &str, company: &str) -> Vec<NewsItem> {
    rows.into_iter()
        .filter(|row| !row.title.trim().is_empty())
        .filter(|row| {
            company.is_empty() || row.title.contains(company) || row.title.contains(ticker)
        })
        .take(NEWS_LIMIT)
        .map(|row| NewsItem::new(row.title, row.source, row.date, row.link, SourceTag::FinMind))
        .collect()
}

fn start_date(days_back: i64) -> String {
    (Utc::now() - TimeDelta::days(days_back))
        .format("%Y-%m-%d")
        .to_string()
}
