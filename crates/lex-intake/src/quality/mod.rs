//! Data quality assessment.
//!
//! This module scores a materialized table for missing values, duplicate
//! rows and IQR outliers, derives ML/visualization suitability, and produces
//! improvement suggestions and describe-style column statistics.

mod checker;
pub mod statistics;

pub use checker::{DataQualityChecker, quality_score};
pub use statistics::{iqr_bounds, quantile_linear};
