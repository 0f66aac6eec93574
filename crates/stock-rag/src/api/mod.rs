//! API clients for directory, price, news and article data
//!
//! Each upstream sits behind a small trait so the pipeline can be driven by
//! mocks in tests. Clients return [`Result`](crate::error::Result); turning
//! failures into absent data is the cache layer's job.

pub mod finmind;
pub mod google_news;
pub mod web;

pub use finmind::{DailyClose, FinMindClient};
pub use google_news::{GoogleNewsClient, parse_feed};
pub use web::WebPageFetcher;

use crate::directory::StockRecord;
use crate::error::Result;
use crate::news::NewsItem;
use async_trait::async_trait;

/// Upstream list of listed securities
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn stock_records(&self) -> Result<Vec<StockRecord>>;
}

/// Daily closing prices, oldest first
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn daily_closes(&self, ticker: &str) -> Result<Vec<DailyClose>>;
}

/// Structured per-company news
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompanyNewsSource: Send + Sync {
    async fn company_news(&self, ticker: &str, company: &str) -> Result<Vec<NewsItem>>;
}

/// Keyword-searchable news feed
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn search_news(&self, company: &str, ticker: &str) -> Result<Vec<NewsItem>>;
}

/// Plain HTML page download
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}
