//! Price quote derived from daily closes

use crate::api::DailyClose;
use serde::{Deserialize, Serialize};

/// Latest close and its move against the previous close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub percent_change: f64,
    pub currency: String,
}

impl PriceQuote {
    /// Build a quote from closes ordered oldest first.
    ///
    /// Needs at least two rows. Values are rounded to two decimals; the
    /// percentage is 0 when the previous close is 0.
    pub fn from_closes(ticker: &str, closes: &[DailyClose]) -> Option<Self> {
        let [.., previous, latest] = closes else {
            return None;
        };

        let change = latest.close - previous.close;
        let percent_change = if previous.close.abs() < f64::EPSILON {
            0.0
        } else {
            change / previous.close * 100.0
        };

        let symbol = if latest.stock_id.trim().is_empty() {
            ticker.to_string()
        } else {
            latest.stock_id.trim().to_string()
        };

        Some(Self {
            symbol,
            price: round2(latest.close),
            change: round2(change),
            percent_change: round2(percent_change),
            currency: "TWD".to_string(),
        })
    }

    /// Context line, e.g. `[Price] 2330 last 600.00 (+5.00 / 0.84%)`
    pub fn context_line(&self) -> String {
        let sign = if self.change >= 0.0 { "+" } else { "" };
        format!(
            "[Price] {} last {:.2} ({sign}{:.2} / {:.2}%)",
            self.symbol, self.price, self.change, self.percent_change
        )
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
