//! Statistical helpers for quality scoring and column summaries.
//!
//! Quantiles use linear interpolation between closest ranks: for `n` sorted
//! values the `q` quantile sits at position `q * (n - 1)`.

use crate::types::{ColumnOutliers, ColumnStatistics};
use crate::utils::finite_values;
use polars::prelude::*;

/// Tukey fence multiplier.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Sort finite values ascending.
pub(crate) fn sorted_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let mut values = finite_values(series)?;
    values.sort_by(f64::total_cmp);
    Ok(values)
}

/// Linearly interpolated quantile of pre-sorted values.
pub fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Lower and upper Tukey fences of pre-sorted values.
pub fn iqr_bounds(sorted: &[f64]) -> Option<(f64, f64)> {
    let q1 = quantile_linear(sorted, 0.25)?;
    let q3 = quantile_linear(sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - IQR_MULTIPLIER * iqr, q3 + IQR_MULTIPLIER * iqr))
}

/// Sample standard deviation (n - 1 denominator).
pub(crate) fn calculate_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(variance.sqrt())
}

/// Count values outside the Tukey fences of a numeric column.
///
/// The percentage is relative to `total_rows`, nulls included.
pub(crate) fn column_outliers(series: &Series, total_rows: usize) -> PolarsResult<ColumnOutliers> {
    let sorted = sorted_values(series)?;
    let (lower_bound, upper_bound, count) = match iqr_bounds(&sorted) {
        Some((lower, upper)) => {
            let count = sorted.iter().filter(|&&v| v < lower || v > upper).count();
            (lower, upper, count)
        }
        None => (0.0, 0.0, 0),
    };

    Ok(ColumnOutliers {
        column: series.name().to_string(),
        count,
        percentage: percentage(count, total_rows),
        lower_bound,
        upper_bound,
    })
}

/// Describe-style summary of a numeric column.
pub(crate) fn describe_column(series: &Series) -> PolarsResult<ColumnStatistics> {
    let sorted = sorted_values(series)?;
    let mean = (!sorted.is_empty()).then(|| sorted.iter().sum::<f64>() / sorted.len() as f64);

    Ok(ColumnStatistics {
        column: series.name().to_string(),
        count: sorted.len(),
        mean,
        std: calculate_std(&sorted),
        min: sorted.first().copied(),
        q25: quantile_linear(&sorted, 0.25),
        median: quantile_linear(&sorted, 0.5),
        q75: quantile_linear(&sorted, 0.75),
        max: sorted.last().copied(),
    })
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
