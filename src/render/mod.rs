pub mod candlestick;
pub mod line_chart;

use plotters::drawing::DrawingAreaErrorKind;

use crate::errors::AppError;

pub const Y_AXIS_LABEL: &str = "Price (USD)";

pub(crate) fn render_err<E>(err: DrawingAreaErrorKind<E>) -> AppError
where
    E: std::error::Error + Send + Sync,
{
    AppError::Render(err.to_string())
}

/// Min/max of `values`, padded by 2% of the span (±1 when flat). `None` when empty.
pub fn padded_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let span = max - min;
    if span <= f64::EPSILON {
        Some((min - 1.0, max + 1.0))
    } else {
        let pad = span * 0.02;
        Some((min - pad, max + pad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_range() {
        let (lo, hi) = padded_range(vec![100.0, 200.0, 150.0]).unwrap();
        assert!((lo - 98.0).abs() < 1e-9);
        assert!((hi - 202.0).abs() < 1e-9);
    }

    #[test]
    fn test_padded_range_flat_and_empty() {
        assert_eq!(padded_range(vec![5.0, 5.0]), Some((4.0, 6.0)));
        assert_eq!(padded_range(Vec::<f64>::new()), None);
        assert_eq!(padded_range(vec![f64::NAN]), None);
    }
}
