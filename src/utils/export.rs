use std::fmt::Write as FmtWrite;
use std::path::{Component, Path, PathBuf};

use tracing::info;

use crate::data::storage::write_atomic;
use crate::errors::AppError;
use crate::models::config::AppConfig;
use crate::models::snapshot::PriceSnapshot;

/// Render the Markdown report for `history`.
pub fn render_report(history: &[PriceSnapshot], config: &AppConfig) -> String {
    let mut md = String::with_capacity(4096);

    // ── Line chart ──
    writeln!(md, "## US ETF prices: last {} snapshots\n", config.max_history).ok();
    writeln!(
        md,
        "![Recent prices]({})\n",
        image_link(&config.line_chart_path, &config.report_path)
    )
    .ok();

    // ── Price table ──
    writeln!(md, "| Time (UTC) | {} |", config.tickers.join(" | ")).ok();
    writeln!(md, "{}|", "| --- ".repeat(config.tickers.len() + 1)).ok();
    for row in history {
        let cells: Vec<String> = config
            .tickers
            .iter()
            .map(|t| row.price(t).map(format_price).unwrap_or_default())
            .collect();
        writeln!(md, "| {} | {} |", row.time, cells.join(" | ")).ok();
    }

    // ── Candlestick ──
    writeln!(
        md,
        "\n## {} {} candlestick\n",
        config.candle_ticker, config.candle_interval
    )
    .ok();
    writeln!(
        md,
        "![Candlestick]({})",
        image_link(&config.candle_chart_path, &config.report_path)
    )
    .ok();

    md
}

/// Overwrite the report file.
pub fn write_report(history: &[PriceSnapshot], config: &AppConfig) -> Result<(), AppError> {
    let md = render_report(history, config);
    write_atomic(&config.report_path, md.as_bytes())?;
    info!(
        "Report written to {} ({} rows)",
        config.report_path.display(),
        history.len()
    );
    Ok(())
}

/// `1234567.891` → `1,234,567.89`.
pub fn format_price(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*d as char);
    }

    let sign = if v < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Link to `image` as seen from the directory holding `report`.
pub fn image_link(image: &Path, report: &Path) -> String {
    let image = absolute(image);
    let report_dir = absolute(report)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let from: Vec<Component> = report_dir.components().collect();
    let to: Vec<Component> = image.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().to_string()),
    );
    let link = parts.join("/");
    if link.starts_with("..") {
        link
    } else {
        format!("./{}", link)
    }
}

/// Anchor a relative path at the working directory and drop `.` components.
fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
