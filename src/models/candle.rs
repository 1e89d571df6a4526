use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// A single OHLC bar as delivered by the historical-chart endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candle {
    #[serde(rename = "date", deserialize_with = "deserialize_bar_time")]
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Parse a bar timestamp. Intraday bars carry `YYYY-MM-DD HH:MM:SS`,
/// daily bars only the date.
pub fn parse_bar_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn deserialize_bar_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_bar_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid bar date: {}", raw)))
}
