use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout of a snapshot: UTC, minute precision.
pub const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One entry of the quote endpoint. Extra fields in the payload are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
}

/// Symbol → current price, for the symbols the API actually returned.
pub type PriceMap = BTreeMap<String, f64>;

/// One timestamped record of prices. Stored flat: `{"time": "...", "VOO": 500.12, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub time: String,
    #[serde(flatten)]
    pub prices: PriceMap,
}

impl PriceSnapshot {
    pub fn new(at: DateTime<Utc>, prices: PriceMap) -> Self {
        PriceSnapshot {
            time: format_snapshot_time(at),
            prices,
        }
    }

    pub fn price(&self, ticker: &str) -> Option<f64> {
        self.prices.get(ticker).copied()
    }
}

/// Ordered oldest first.
pub type History = Vec<PriceSnapshot>;

pub fn format_snapshot_time(at: DateTime<Utc>) -> String {
    at.format(SNAPSHOT_TIME_FORMAT).to_string()
}
