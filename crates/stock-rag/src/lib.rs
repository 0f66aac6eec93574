//! Retrieval-augmented context for Taiwan stock questions
//!
//! This crate turns a free-text question such as "台積電 最近怎麼了" into a
//! grounded context block for a downstream summarizer. It includes:
//!
//! - Entity resolution from free text to a ticker against the FinMind stock list
//! - Time-bounded caches for the directory, prices, news, article text and
//!   assembled contexts
//! - News from FinMind and the Google News RSS search, merged and deduplicated
//! - Lazy full-text download of the best-matching articles, cut into
//!   citation excerpts
//!
//! # Architecture
//!
//! [`ContextAssembler`] drives one query through the pipeline:
//! - [`StockDirectory`]: resolves the query against the latest directory snapshot
//! - [`CacheLayer`]: read-through caches in front of the upstream sources
//! - [`merge_news`]: interleaves and deduplicates the two news lists
//! - [`FulltextRanker`]: picks, fetches and excerpts the top articles
//!
//! A background task started with [`ContextAssembler::spawn_directory_refresh`]
//! keeps the directory snapshot current.
//!
//! # Example
//!
//! ```rust,ignore
//! use stock_rag::{ContextAssembler, RagConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RagConfig::from_env()?;
//!     let assembler = ContextAssembler::from_config(&config)?;
//!
//!     assembler.refresh_directory().await;
//!     let _refresh = assembler.spawn_directory_refresh();
//!
//!     println!("{}", assembler.build_context("2330").await);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod assembler;
pub mod cache;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod fulltext;
pub mod links;
pub mod news;
pub mod price;

// Re-export main types for convenience
pub use assembler::{ContextAssembler, NO_INFO_MESSAGE, NOT_FOUND_MESSAGE, Sources};
pub use cache::{CacheLayer, CacheLayerStats, DirectoryCache, Fetch};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RagConfig, RagConfigBuilder};
pub use directory::{Resolution, StockDirectory, StockMap, StockRecord};
pub use error::{Result, StockError};
pub use fulltext::FulltextRanker;
pub use news::{MergeOptions, NewsItem, SourceTag, merge_news};
pub use price::PriceQuote;
