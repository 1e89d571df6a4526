use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::errors::AppError;
use crate::models::candle::Candle;

use super::{padded_range, render_err, Y_AXIS_LABEL};

pub const CANDLE_CHART_SIZE: (u32, u32) = (1200, 600);

const UP_COLOR: RGBColor = RGBColor(38, 166, 91);
const DOWN_COLOR: RGBColor = RGBColor(214, 48, 49);

/// Render ascending bars as a candlestick chart. Bars are placed by index so
/// closed-market hours leave no empty stretches.
pub fn render_candlestick_chart(candles: &[Candle], title: &str, path: &Path) -> Result<(), AppError> {
    if candles.is_empty() {
        return Err(AppError::Render("no bars to plot".into()));
    }

    let prices = candles.iter().flat_map(|c| [c.low, c.high]);
    let (y_min, y_max) = padded_range(prices)
        .ok_or_else(|| AppError::Render("bars carry no finite prices".into()))?;
    let n = candles.len();
    let labels: Vec<String> = candles
        .iter()
        .map(|c| c.datetime.format("%m-%d %H:%M").to_string())
        .collect();

    let root = BitMapBackend::new(path, CANDLE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0..n, y_min..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .light_line_style(&WHITE.mix(0.0))
        .x_labels(10.min(n))
        .x_label_formatter(&|i| labels.get(*i).cloned().unwrap_or_default())
        .y_desc(Y_AXIS_LABEL)
        .draw()
        .map_err(render_err)?;

    let body_width = (CANDLE_CHART_SIZE.0 as usize * 6 / 10 / n).clamp(1, 15) as u32;
    chart
        .draw_series(candles.iter().enumerate().map(|(i, c)| {
            let style = if c.is_bullish() {
                UP_COLOR.filled()
            } else {
                DOWN_COLOR.filled()
            };
            CandleStick::new(i, c.open, c.high, c.low, c.close, style, style, body_width)
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    info!("Candlestick chart written to {} ({} bars)", path.display(), n);
    Ok(())
}
