//! Shared utilities for handlers, converters and the quality checker.
//!
//! Dtype classification and conversion of polars values into JSON sample
//! records live here so every format reports columns the same way.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a column's data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Other/unknown types
    Other,
}

impl DtypeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Other => "other",
        }
    }
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a floating point type (NaN-capable).
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Temporal Values
// =============================================================================

/// Wall-clock value of a physical `Datetime` timestamp.
pub fn naive_datetime(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let utc = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    }?;
    Some(utc.naive_utc())
}

/// Calendar date of a physical `Date` value (days since the Unix epoch).
pub fn naive_date(days: i32) -> Option<NaiveDate> {
    DateTime::from_timestamp(i64::from(days) * 86_400, 0).map(|dt| dt.date_naive())
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Collect the non-null, non-NaN values of a numeric series as f64.
pub fn finite_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Count missing entries: nulls, plus NaN for float columns.
pub fn missing_count(series: &Series) -> PolarsResult<usize> {
    if !is_float_dtype(series.dtype()) {
        return Ok(series.null_count());
    }

    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series
        .f64()?
        .into_iter()
        .filter(|v| v.is_none_or(|val| val.is_nan()))
        .count())
}

// =============================================================================
// Sample Records
// =============================================================================

/// A single sample row, column name to JSON value.
pub type SampleRecord = Map<String, Value>;

/// Convert a polars value into JSON. Non-finite floats become null.
pub fn any_value_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::Int8(v) => Value::from(*v),
        AnyValue::Int16(v) => Value::from(*v),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::UInt8(v) => Value::from(*v),
        AnyValue::UInt16(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::Float32(v) => Value::from(f64::from(*v)),
        AnyValue::Float64(v) => Value::from(*v),
        AnyValue::String(s) => Value::String((*s).to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        other => Value::String(other.to_string()),
    }
}

/// Take the first `limit` rows of a DataFrame as JSON records.
pub fn sample_records(df: &DataFrame, limit: usize) -> PolarsResult<Vec<SampleRecord>> {
    let rows = limit.min(df.height());
    let mut records = Vec::with_capacity(rows);

    for i in 0..rows {
        let mut record = Map::new();
        for column in df.get_columns() {
            let value = column.get(i)?;
            record.insert(column.name().to_string(), any_value_to_json(&value));
        }
        records.push(record);
    }

    Ok(records)
}

/// Make header names unique and non-empty, in the order given.
///
/// Blank headers become `column_{n}` (1-based); repeats get a `_{k}` suffix.
pub fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::with_capacity(headers.len());

    for (idx, header) in headers.iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            trimmed.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        result.push(candidate);
    }

    result
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_conversions() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap();
        let millis = expected.and_utc().timestamp_millis();
        assert_eq!(naive_datetime(millis, TimeUnit::Milliseconds), Some(expected));
        assert_eq!(
            naive_datetime(millis * 1_000_000, TimeUnit::Nanoseconds),
            Some(expected)
        );
        assert_eq!(naive_date(19_724), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(
            get_dtype_category(&DataType::Boolean),
            DtypeCategory::Boolean
        );
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
        assert_eq!(DtypeCategory::Numeric.as_str(), "numeric");
    }

    #[test]
    fn test_missing_count_counts_nan_for_floats() {
        let series = Series::new("v".into(), &[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(missing_count(&series).unwrap(), 2);
    }

    #[test]
    fn test_missing_count_strings() {
        let series = Series::new("s".into(), &[Some("a"), None, Some("")]);
        assert_eq!(missing_count(&series).unwrap(), 1);
    }

    #[test]
    fn test_finite_values_skips_nulls_and_nan() {
        let series = Series::new("v".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(finite_values(&series).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_sample_records_caps_rows() {
        let df = df![
            "id" => [1i64, 2, 3],
            "name" => ["a", "b", "c"],
        ]
        .unwrap();

        let records = sample_records(&df, 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], Value::from(1));
        assert_eq!(records[1]["name"], Value::from("b"));

        let all = sample_records(&df, 10).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_any_value_to_json_nan_is_null() {
        assert_eq!(any_value_to_json(&AnyValue::Float64(f64::NAN)), Value::Null);
        assert_eq!(any_value_to_json(&AnyValue::Boolean(true)), Value::Bool(true));
    }

    #[test]
    fn test_dedupe_headers() {
        let headers = vec![
            "name".to_string(),
            "".to_string(),
            "name".to_string(),
            " value ".to_string(),
        ];
        assert_eq!(
            dedupe_headers(&headers),
            vec!["name", "column_2", "name_1", "value"]
        );
    }
}
