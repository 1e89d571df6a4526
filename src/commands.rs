use serde::Serialize;
use tracing::info;

use crate::data::client::MarketDataClient;
use crate::data::{frames, storage::HistoryStore};
use crate::errors::AppError;
use crate::models::candle::Candle;
use crate::models::config::AppConfig;
use crate::models::snapshot::{History, PriceMap};
use crate::render::{candlestick, line_chart};
use crate::utils::export;

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub quotes: usize,
    pub snapshots: usize,
    pub candles: usize,
}

/// Fetch → persist → render → report. Stops at the first failing step.
pub async fn run_pipeline(config: &AppConfig) -> Result<RunSummary, AppError> {
    config.validate()?;
    let client = MarketDataClient::new(config);
    let store = HistoryStore::from_config(config);

    // 1. Fetch current quotes
    info!("[1/5] Fetching quotes for {}", config.tickers.join(","));
    let prices = fetch_prices(&client, config).await?;

    // 2. Append to the rolling history
    info!("[2/5] Updating history at {}", store.path().display());
    let history = update_history(&store, prices.clone())?;

    // 3. Line chart
    info!("[3/5] Rendering line chart");
    render_history_chart(&history, config)?;

    // 4. Candlestick chart
    info!(
        "[4/5] Fetching {} {} bars for candlestick chart",
        config.candle_ticker, config.candle_interval
    );
    let candles = fetch_and_render_candles(&client, config).await?;

    // 5. Report
    info!("[5/5] Writing report to {}", config.report_path.display());
    export::write_report(&history, config)?;

    Ok(RunSummary {
        quotes: prices.len(),
        snapshots: history.len(),
        candles: candles.len(),
    })
}

pub async fn fetch_prices(client: &MarketDataClient, config: &AppConfig) -> Result<PriceMap, AppError> {
    client.fetch_quotes(&config.tickers).await
}

pub fn update_history(store: &HistoryStore, prices: PriceMap) -> Result<History, AppError> {
    store.update_now(prices)
}

pub fn render_history_chart(history: &History, config: &AppConfig) -> Result<(), AppError> {
    let df = frames::history_frame(history, &config.tickers)?;
    let title = line_chart_title(history);
    line_chart::render_line_chart(&df, &config.tickers, &title, &config.line_chart_path)
}

/// Title naming how many snapshots are actually plotted.
fn line_chart_title(history: &History) -> String {
    format!("Last {} snapshots", history.len())
}

/// Fetch bars, put them in ascending order, and render them.
pub async fn fetch_and_render_candles(
    client: &MarketDataClient,
    config: &AppConfig,
) -> Result<Vec<Candle>, AppError> {
    let source = client
        .fetch_candles(&config.candle_ticker, config.candle_interval)
        .await?;
    let candles = frames::order_candles(&source)?;
    let title = format!("{} {} candles", config.candle_ticker, config.candle_interval);
    candlestick::render_candlestick_chart(&candles, &title, &config.candle_chart_path)?;
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::models::snapshot::PriceSnapshot;

    fn short_history(len: i64) -> History {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        (0..len)
            .map(|i| {
                let prices: PriceMap = [("VOO".to_string(), 500.0 + i as f64)].into_iter().collect();
                PriceSnapshot::new(start + Duration::hours(i), prices)
            })
            .collect()
    }

    #[test]
    fn test_line_chart_title_counts_plotted_snapshots() {
        let history = short_history(3);
        assert_eq!(line_chart_title(&history), "Last 3 snapshots");
    }

    #[test]
    fn test_render_history_chart_short_history() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            tickers: vec!["VOO".to_string()],
            line_chart_path: dir.path().join("market_chart.png"),
            ..AppConfig::default()
        };
        render_history_chart(&short_history(3), &config).unwrap();
        assert!(std::fs::metadata(&config.line_chart_path).unwrap().len() > 0);
    }
}
