use chrono::DateTime;
use polars::prelude::*;

use crate::errors::AppError;
use crate::models::candle::Candle;
use crate::models::snapshot::PriceSnapshot;

/// Build the wide price table: a `time` column plus one nullable `f64` column
/// per tracked ticker, in ticker order.
pub fn history_frame(history: &[PriceSnapshot], tickers: &[String]) -> Result<DataFrame, AppError> {
    let times: Vec<&str> = history.iter().map(|s| s.time.as_str()).collect();
    let mut columns = Vec::with_capacity(tickers.len() + 1);
    columns.push(Column::new("time".into(), times));

    for ticker in tickers {
        let values: Vec<Option<f64>> = history.iter().map(|s| s.price(ticker)).collect();
        if values.iter().all(Option::is_none) {
            return Err(AppError::MissingTicker(ticker.clone()));
        }
        columns.push(Column::new(ticker.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Read a ticker column back out of the price table. Nulls stay `None`.
pub fn price_series(df: &DataFrame, ticker: &str) -> Result<Vec<Option<f64>>, AppError> {
    let col = df
        .column(ticker)
        .map_err(|_| AppError::MissingTicker(ticker.to_string()))?;
    Ok(col.f64()?.into_iter().collect())
}

pub fn time_labels(df: &DataFrame) -> Result<Vec<String>, AppError> {
    let col = df
        .column("time")
        .map_err(|_| AppError::Table("No 'time' column in DataFrame".into()))?;
    Ok(col
        .str()?
        .into_iter()
        .map(|t| t.unwrap_or_default().to_string())
        .collect())
}

/// Build an OHLCV table. `datetime` is stored as epoch milliseconds.
pub fn candles_frame(candles: &[Candle]) -> Result<DataFrame, AppError> {
    let datetime: Vec<i64> = candles
        .iter()
        .map(|c| c.datetime.and_utc().timestamp_millis())
        .collect();
    let df = DataFrame::new(vec![
        Column::new("datetime".into(), datetime),
        Column::new("open".into(), candles.iter().map(|c| c.open).collect::<Vec<f64>>()),
        Column::new("high".into(), candles.iter().map(|c| c.high).collect::<Vec<f64>>()),
        Column::new("low".into(), candles.iter().map(|c| c.low).collect::<Vec<f64>>()),
        Column::new("close".into(), candles.iter().map(|c| c.close).collect::<Vec<f64>>()),
        Column::new("volume".into(), candles.iter().map(|c| c.volume).collect::<Vec<f64>>()),
    ])?;
    Ok(df)
}

/// Put a newest-first bar table into ascending time order.
pub fn ascending_frame(df: &DataFrame) -> Result<DataFrame, AppError> {
    let reversed = df.reverse();
    let sorted = reversed.sort(["datetime"], SortMultipleOptions::default())?;
    Ok(sorted)
}

/// Convert an OHLCV table back into candles.
pub fn candles_from_frame(df: &DataFrame) -> Result<Vec<Candle>, AppError> {
    let datetime_col = df
        .column("datetime")
        .map_err(|_| AppError::Table("No 'datetime' column in DataFrame".into()))?;
    let open_col = df
        .column("open")
        .map_err(|_| AppError::Table("No 'open' column".into()))?;
    let high_col = df
        .column("high")
        .map_err(|_| AppError::Table("No 'high' column".into()))?;
    let low_col = df
        .column("low")
        .map_err(|_| AppError::Table("No 'low' column".into()))?;
    let close_col = df
        .column("close")
        .map_err(|_| AppError::Table("No 'close' column".into()))?;
    let volume_col = df
        .column("volume")
        .map_err(|_| AppError::Table("No 'volume' column".into()))?;

    let datetime = datetime_col.i64()?;
    let open = open_col.f64()?;
    let high = high_col.f64()?;
    let low = low_col.f64()?;
    let close = close_col.f64()?;
    let volume = volume_col.f64()?;

    let mut candles = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let millis = datetime
            .get(i)
            .ok_or_else(|| AppError::Table(format!("Null datetime at row {}", i)))?;
        let dt = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| AppError::Table(format!("Datetime out of range at row {}", i)))?
            .naive_utc();
        candles.push(Candle {
            datetime: dt,
            open: open.get(i).unwrap_or(0.0),
            high: high.get(i).unwrap_or(0.0),
            low: low.get(i).unwrap_or(0.0),
            close: close.get(i).unwrap_or(0.0),
            volume: volume.get(i).unwrap_or(0.0),
        });
    }

    Ok(candles)
}

/// Source bars (newest first) → ascending bars, via the table.
pub fn order_candles(candles: &[Candle]) -> Result<Vec<Candle>, AppError> {
    let df = candles_frame(candles)?;
    candles_from_frame(&ascending_frame(&df)?)
}
