use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::candle::Candle;
use crate::models::config::{AppConfig, Interval};
use crate::models::snapshot::{PriceMap, Quote};

/// HTTP client for the market-data API.
pub struct MarketDataClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Option<std::time::Duration>,
}

impl MarketDataClient {
    pub fn new(config: &AppConfig) -> Self {
        MarketDataClient {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.http_timeout,
        }
    }

    pub fn quote_url(&self, tickers: &[String]) -> String {
        format!(
            "{}/quote/{}?apikey={}",
            self.base_url,
            tickers.join(","),
            self.api_key
        )
    }

    pub fn candles_url(&self, ticker: &str, interval: Interval) -> String {
        format!(
            "{}/historical-chart/{}/{}?apikey={}",
            self.base_url,
            interval.as_str(),
            ticker,
            self.api_key
        )
    }

    /// Fetch current prices for `tickers`. Tickers missing from the response are
    /// left out of the map.
    pub async fn fetch_quotes(&self, tickers: &[String]) -> Result<PriceMap, AppError> {
        let url = self.quote_url(tickers);
        let body = self.get_text(&url).await?;
        let prices = parse_quotes(&body)?;

        let omitted: Vec<&str> = tickers
            .iter()
            .filter(|t| !prices.contains_key(t.as_str()))
            .map(|t| t.as_str())
            .collect();
        if !omitted.is_empty() {
            warn!("Quote response omitted tickers: {}", omitted.join(", "));
        }
        info!("Fetched {} quotes", prices.len());
        Ok(prices)
    }

    /// Fetch historical bars for one ticker, in the order the API delivers them
    /// (newest first).
    pub async fn fetch_candles(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Vec<Candle>, AppError> {
        let url = self.candles_url(ticker, interval);
        let body = self.get_text(&url).await?;
        let candles = parse_candles(&body)?;
        info!("Fetched {} {} bars for {}", candles.len(), interval, ticker);
        Ok(candles)
    }

    async fn get_text(&self, url: &str) -> Result<String, AppError> {
        debug!("GET {}", redact_key(url));
        let mut request = self.http.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: redact_key(url),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Parse a quote response body into symbol → price. A repeated symbol keeps its
/// last price.
pub fn parse_quotes(body: &str) -> Result<PriceMap, AppError> {
    let quotes: Vec<Quote> = serde_json::from_str(body)?;
    Ok(quotes.into_iter().map(|q| (q.symbol, q.price)).collect())
}

/// Parse a historical-chart response body. Order is preserved.
pub fn parse_candles(body: &str) -> Result<Vec<Candle>, AppError> {
    Ok(serde_json::from_str(body)?)
}

/// Hide the API key when a URL ends up in logs or errors.
fn redact_key(url: &str) -> String {
    match url.find("apikey=") {
        Some(pos) => format!("{}apikey=***", &url[..pos]),
        None => url.to_string(),
    }
}
