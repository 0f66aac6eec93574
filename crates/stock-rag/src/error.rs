//! Error types for retrieval operations

use thiserror::Error;

/// Retrieval specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Upstream API answered with an error
    #[error("API error: {0}")]
    ApiError(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// Page fetched but no usable text in it
    #[error("No usable content at {0}")]
    NoContent(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// RSS feed could not be parsed
    #[error("Feed error: {0}")]
    FeedError(#[from] rss::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl StockError {
    /// `true` when the upstream answered but had nothing usable
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::DataUnavailable { .. } | Self::NoContent(_))
    }
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, StockError>;

impl From<rag_utils::EnvError> for StockError {
    fn from(err: rag_utils::EnvError) -> Self {
        StockError::ConfigError(err.to_string())
    }
}
