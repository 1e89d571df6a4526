use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
pub const DEFAULT_TICKERS: [&str; 4] = ["VOO", "QQQ", "SPY", "QLD"];
pub const DEFAULT_MAX_HISTORY: usize = 30;

/// Bar intervals supported by the historical-chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1min")]
    M1,
    #[serde(rename = "5min")]
    M5,
    #[serde(rename = "15min")]
    M15,
    #[serde(rename = "30min")]
    M30,
    #[serde(rename = "1hour")]
    H1,
    #[serde(rename = "4hour")]
    H4,
}

impl Interval {
    /// Path segment used by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1min",
            Interval::M5 => "5min",
            Interval::M15 => "15min",
            Interval::M30 => "30min",
            Interval::H1 => "1hour",
            Interval::H4 => "4hour",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1min" => Ok(Interval::M1),
            "5min" => Ok(Interval::M5),
            "15min" => Ok(Interval::M15),
            "30min" => Ok(Interval::M30),
            "1hour" => Ok(Interval::H1),
            "4hour" => Ok(Interval::H4),
            _ => Err(format!("Unknown interval: {}", s)),
        }
    }
}

/// Everything a run needs. Passed explicitly to each component so test and
/// production configurations can coexist.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    /// Tracked tickers, in display order.
    pub tickers: Vec<String>,
    pub candle_ticker: String,
    pub candle_interval: Interval,
    pub history_path: PathBuf,
    pub line_chart_path: PathBuf,
    pub candle_chart_path: PathBuf,
    pub report_path: PathBuf,
    pub max_history: usize,
    /// Per-request timeout. `None` keeps the HTTP client's defaults.
    pub http_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            candle_ticker: "QQQ".to_string(),
            candle_interval: Interval::H1,
            history_path: PathBuf::from("market_history.json"),
            line_chart_path: PathBuf::from("market_chart.png"),
            candle_chart_path: PathBuf::from("candle_chart.png"),
            report_path: PathBuf::from("README.md"),
            max_history: DEFAULT_MAX_HISTORY,
            http_timeout: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup (environment, map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        match var("FMP_API_KEY") {
            Some(key) => config.api_key = key.trim().to_string(),
            None => warn!("FMP_API_KEY is not set; the market data API will reject requests"),
        }

        if let Some(url) = var("MARKET_API_BASE_URL") {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(list) = var("MARKET_TICKERS") {
            config.tickers = parse_ticker_list(&list);
        }
        if let Some(ticker) = var("MARKET_CANDLE_TICKER") {
            config.candle_ticker = ticker.trim().to_uppercase();
        }
        if let Some(interval) = var("MARKET_CANDLE_INTERVAL") {
            config.candle_interval = interval.parse().map_err(AppError::InvalidConfig)?;
        }
        if let Some(path) = var("MARKET_HISTORY_FILE") {
            config.history_path = PathBuf::from(path);
        }
        if let Some(path) = var("MARKET_LINE_CHART_FILE") {
            config.line_chart_path = PathBuf::from(path);
        }
        if let Some(path) = var("MARKET_CANDLE_CHART_FILE") {
            config.candle_chart_path = PathBuf::from(path);
        }
        if let Some(path) = var("MARKET_REPORT_FILE") {
            config.report_path = PathBuf::from(path);
        }
        if let Some(n) = var("MARKET_MAX_HISTORY") {
            config.max_history = n.trim().parse().map_err(|_| {
                AppError::InvalidConfig(format!("MARKET_MAX_HISTORY must be an integer, got {}", n))
            })?;
        }
        if let Some(secs) = var("MARKET_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                AppError::InvalidConfig(format!(
                    "MARKET_HTTP_TIMEOUT_SECS must be an integer, got {}",
                    secs
                ))
            })?;
            config.http_timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.tickers.is_empty() {
            return Err(AppError::InvalidConfig("ticker list is empty".into()));
        }
        if self.candle_ticker.trim().is_empty() {
            return Err(AppError::InvalidConfig("candle ticker is empty".into()));
        }
        if self.max_history == 0 {
            return Err(AppError::InvalidConfig("max history must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_ticker_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}
