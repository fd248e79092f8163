//! Parquet handler.
//!
//! Row counts come from the file footer; metadata only materializes a
//! leading slice and scales its in-memory size up to the whole file.

use super::{FormatHandler, HandlerData, tabular_metadata};
use crate::config::ProcessorConfig;
use crate::error::{IntakeError, Result, ResultExt};
use crate::types::{ExtractedMetadata, FileFormat, FormatDetails, SourceFile, ValidationResult};
use polars::prelude::*;
use std::io::Cursor;
use tracing::{debug, warn};

/// Rows materialized when estimating memory usage.
const PROBE_ROWS: usize = 1_000;

const EMPTY_MESSAGE: &str = "Parquet file is empty";

#[derive(Debug, Clone, Default)]
pub struct ParquetHandler {
    config: ProcessorConfig,
}

impl ParquetHandler {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    fn reader(source: &SourceFile) -> ParquetReader<Cursor<Vec<u8>>> {
        ParquetReader::new(Cursor::new(source.bytes().to_vec()))
    }

    /// Total row count, read from the footer only.
    pub fn row_count(&self, source: &SourceFile) -> Result<usize> {
        Self::reader(source)
            .num_rows()
            .context(format!("Reading Parquet footer of '{}'", source.id()))
    }
}

fn estimate_memory(sample: &DataFrame, total_rows: usize) -> usize {
    if sample.height() == 0 {
        return 0;
    }
    let per_row = sample.estimated_size() as f64 / sample.height() as f64;
    (per_row * total_rows as f64).round() as usize
}

impl FormatHandler for ParquetHandler {
    fn format(&self) -> FileFormat {
        FileFormat::Parquet
    }

    fn read_data(&self, source: &SourceFile) -> Result<HandlerData> {
        let df = Self::reader(source)
            .finish()
            .context(format!("Reading Parquet '{}'", source.id()))?;
        Ok(HandlerData::Table(df))
    }

    fn extract_metadata(&self, source: &SourceFile) -> Result<ExtractedMetadata> {
        let mut reader = Self::reader(source);
        let total_rows = reader.num_rows()?;
        let probe = PROBE_ROWS.max(self.config.sample_rows).min(total_rows);
        let sample = reader.with_slice(Some((0, probe))).finish()?;

        debug!(
            "Parquet '{}': {} rows in footer, {} materialized",
            source.id(),
            total_rows,
            sample.height()
        );

        tabular_metadata(
            source,
            &sample,
            total_rows,
            estimate_memory(&sample, total_rows),
            self.config.sample_rows,
            FormatDetails::Parquet {
                sampled_rows: sample.height(),
            },
        )
    }

    fn validate(&self, source: &SourceFile) -> ValidationResult {
        if source.bytes().is_empty() {
            return ValidationResult::invalid(EMPTY_MESSAGE);
        }

        match self.row_count(source) {
            Ok(0) => ValidationResult::invalid(EMPTY_MESSAGE),
            Ok(_) => ValidationResult::valid("Valid Parquet file"),
            Err(e) => {
                warn!("Parquet '{}' could not be read: {}", source.id(), e);
                let e = match e {
                    IntakeError::WithContext { source, .. } => *source,
                    other => other,
                };
                ValidationResult::invalid(format!("Invalid Parquet file: {e}"))
            }
        }
    }
}
