use super::statistics::{column_outliers, describe_column, percentage};
use crate::error::Result;
use crate::types::{
    ColumnMissing, ColumnOutliers, ColumnStatistics, DuplicateStats, MissingValues, QualityReport,
};
use crate::utils::{is_numeric_dtype, missing_count};
use polars::prelude::*;
use tracing::debug;

/// Maximum points deducted for missing values.
const MAX_MISSING_PENALTY: f64 = 30.0;
/// Maximum points deducted for duplicate rows.
const MAX_DUPLICATE_PENALTY: f64 = 20.0;
/// Maximum points deducted for outliers.
const MAX_OUTLIER_PENALTY: f64 = 20.0;

const ML_MIN_SCORE: f64 = 70.0;
const ML_MAX_MISSING_PERCENTAGE: f64 = 15.0;
const VIZ_MIN_SCORE: f64 = 60.0;

/// Outlier percentage above which a column is called out in suggestions.
const OUTLIER_SUGGESTION_THRESHOLD: f64 = 5.0;

/// Scores a materialized table for downstream analytic use.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataQualityChecker;

/// Combine issue percentages into a 0-100 score.
pub fn quality_score(
    missing_percentage: f64,
    duplicate_percentage: f64,
    average_outlier_percentage: f64,
) -> f64 {
    let score = 100.0
        - (missing_percentage / 2.0).min(MAX_MISSING_PENALTY)
        - (duplicate_percentage / 2.0).min(MAX_DUPLICATE_PENALTY)
        - (average_outlier_percentage / 2.0).min(MAX_OUTLIER_PENALTY);
    score.clamp(0.0, 100.0)
}

impl DataQualityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Run every check and derive the score, suitability flags and suggestions.
    pub fn check_quality(&self, df: &DataFrame) -> Result<QualityReport> {
        let row_count = df.height();
        let column_count = df.width();

        let missing = Self::check_missing_values(df)?;
        let duplicates = Self::check_duplicates(df)?;
        let outliers = Self::check_outliers(df)?;

        let average_outlier_percentage = if outliers.is_empty() {
            0.0
        } else {
            outliers.iter().map(|o| o.percentage).sum::<f64>() / outliers.len() as f64
        };

        let score = quality_score(
            missing.total_missing_percentage,
            duplicates.percentage,
            average_outlier_percentage,
        );
        let suitable_for_ml =
            score >= ML_MIN_SCORE && missing.total_missing_percentage < ML_MAX_MISSING_PERCENTAGE;
        let suitable_for_visualization = score >= VIZ_MIN_SCORE;

        let data_types = df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.dtype().to_string()))
            .collect();

        let mut report = QualityReport {
            row_count,
            column_count,
            has_missing_values: missing.columns.iter().any(|c| c.count > 0),
            missing,
            data_types,
            duplicates,
            outliers,
            quality_score: score,
            suitable_for_ml,
            suitable_for_visualization,
            suggestions: Vec::new(),
        };
        report.suggestions = Self::build_suggestions(df, &report);

        debug!(
            "Quality check: {} rows x {} columns, score {:.1}",
            row_count, column_count, score
        );

        Ok(report)
    }

    /// Only the improvement suggestions of a full quality check.
    pub fn suggest_improvements(&self, df: &DataFrame) -> Result<Vec<String>> {
        Ok(self.check_quality(df)?.suggestions)
    }

    /// Summary statistics for every numeric column, in column order.
    pub fn describe(&self, df: &DataFrame) -> Result<Vec<ColumnStatistics>> {
        let mut stats = Vec::new();
        for column in df.get_columns() {
            if is_numeric_dtype(column.dtype()) {
                stats.push(describe_column(column.as_materialized_series())?);
            }
        }
        Ok(stats)
    }

    fn check_missing_values(df: &DataFrame) -> Result<MissingValues> {
        let rows = df.height();
        let mut columns = Vec::with_capacity(df.width());
        let mut total = 0;

        for column in df.get_columns() {
            let count = missing_count(column.as_materialized_series())?;
            total += count;
            columns.push(ColumnMissing {
                column: column.name().to_string(),
                count,
                percentage: percentage(count, rows),
            });
        }

        Ok(MissingValues {
            columns,
            total_missing_percentage: percentage(total, rows * df.width()),
        })
    }

    fn check_duplicates(df: &DataFrame) -> Result<DuplicateStats> {
        if df.height() == 0 || df.width() == 0 {
            return Ok(DuplicateStats {
                count: 0,
                percentage: 0.0,
            });
        }

        let unique = df.unique::<&str, &str>(None, UniqueKeepStrategy::First, None)?;
        let count = df.height() - unique.height();

        Ok(DuplicateStats {
            count,
            percentage: percentage(count, df.height()),
        })
    }

    fn check_outliers(df: &DataFrame) -> Result<Vec<ColumnOutliers>> {
        let mut outliers = Vec::new();
        for column in df.get_columns() {
            if is_numeric_dtype(column.dtype()) {
                outliers.push(column_outliers(
                    column.as_materialized_series(),
                    df.height(),
                )?);
            }
        }
        Ok(outliers)
    }

    fn build_suggestions(df: &DataFrame, report: &QualityReport) -> Vec<String> {
        let mut suggestions = Vec::new();

        let columns_with_missing: Vec<&ColumnMissing> = report
            .missing
            .columns
            .iter()
            .filter(|c| c.count > 0)
            .collect();
        if !columns_with_missing.is_empty() {
            let names = columns_with_missing
                .iter()
                .map(|c| c.column.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            suggestions.push(format!(
                "Consider handling missing values in columns: {names}"
            ));

            for missing in &columns_with_missing {
                let numeric = df
                    .column(&missing.column)
                    .map(|c| is_numeric_dtype(c.dtype()))
                    .unwrap_or(false);
                if numeric {
                    suggestions.push(format!(
                        "For numeric column '{}', consider mean or median imputation",
                        missing.column
                    ));
                } else {
                    suggestions.push(format!(
                        "For non-numeric column '{}', consider mode imputation or a special category",
                        missing.column
                    ));
                }
            }
        }

        if report.duplicates.count > 0 {
            suggestions.push("Consider removing or investigating duplicate rows".to_string());
        }

        let outlier_columns: Vec<&str> = report
            .outliers
            .iter()
            .filter(|o| o.percentage > OUTLIER_SUGGESTION_THRESHOLD)
            .map(|o| o.column.as_str())
            .collect();
        if !outlier_columns.is_empty() {
            suggestions.push(format!(
                "Investigate potential outliers in columns: {}",
                outlier_columns.join(", ")
            ));
        }

        if !report.suitable_for_ml {
            suggestions
                .push("Data requires cleaning before it's suitable for machine learning".to_string());
        }

        suggestions
    }
}

static_assertions::assert_impl_all!(DataQualityChecker: Send, Sync);
