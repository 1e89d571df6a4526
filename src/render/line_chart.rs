use std::path::Path;

use plotters::prelude::*;
use polars::prelude::DataFrame;
use tracing::info;

use crate::data::frames::{price_series, time_labels};
use crate::errors::AppError;

use super::{padded_range, render_err, Y_AXIS_LABEL};

/// 24:4, wide enough for a timeline of 30 rotated timestamps.
pub const LINE_CHART_SIZE: (u32, u32) = (2400, 400);

/// Split a nullable series into runs of consecutive present values, so that a
/// missing price becomes a gap in the line.
pub fn line_segments(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(price) => current.push((i, *price)),
            None => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Render one marked line per ticker from the wide price table.
pub fn render_line_chart(
    df: &DataFrame,
    tickers: &[String],
    title: &str,
    path: &Path,
) -> Result<(), AppError> {
    let labels = time_labels(df)?;
    let series: Vec<(String, Vec<Option<f64>>)> = tickers
        .iter()
        .map(|t| price_series(df, t).map(|s| (t.clone(), s)))
        .collect::<Result<_, _>>()?;

    let all_values = series.iter().flat_map(|(_, s)| s.iter().flatten().copied());
    let (y_min, y_max) = padded_range(all_values)
        .ok_or_else(|| AppError::Render("no prices to plot".into()))?;
    let n = labels.len().max(1);

    let root = BitMapBackend::new(path, LINE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(130)
        .y_label_area_size(70)
        .build_cartesian_2d(0..n, y_min..y_max)
        .map_err(render_err)?;

    let label_font = ("sans-serif", 13)
        .into_font()
        .transform(FontTransform::Rotate90);
    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&|i| labels.get(*i).cloned().unwrap_or_default())
        .x_label_style(label_font)
        .y_desc(Y_AXIS_LABEL)
        .draw()
        .map_err(render_err)?;

    for (idx, (ticker, values)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let mut labelled = false;
        for segment in line_segments(values) {
            let line = chart
                .draw_series(LineSeries::new(
                    segment.iter().copied(),
                    color.stroke_width(2),
                ))
                .map_err(render_err)?;
            if !labelled {
                line.label(ticker.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
                labelled = true;
            }
            chart
                .draw_series(
                    segment
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
                )
                .map_err(render_err)?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    info!("Line chart written to {}", path.display());
    Ok(())
}
