//! Per-format file handlers.
//!
//! A handler turns raw bytes into something the rest of the crate can work
//! with: a polars [`DataFrame`] for tabular formats, a [`PageTextMap`] for
//! PDFs. Each handler also knows how to validate the structure of its format
//! and how to extract [`ExtractedMetadata`].
//!
//! Handlers never let a read or parse failure escape `validate` or
//! `get_metadata`: failures become an invalid [`ValidationResult`] or a
//! logged `None`.

mod csv;
mod excel;
mod parquet;
mod pdf;

pub use self::csv::{CsvHandler, detect_delimiter};
pub use self::excel::ExcelHandler;
pub use self::parquet::ParquetHandler;
pub use self::pdf::{NO_TEXT_WARNING, PdfHandler};

#[cfg(test)]
pub(crate) use self::pdf::fixtures as pdf_fixtures;

use crate::config::{MAX_SAMPLE_ROWS, ProcessorConfig};
use crate::error::{IntakeError, Result};
use crate::types::{
    ExtractedMetadata, FileFormat, FormatDetails, PageTextMap, SourceFile, ValidationResult,
};
use crate::utils::{get_dtype_category, sample_records};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::error;

/// What a handler reads out of a file.
#[derive(Debug, Clone)]
pub enum HandlerData {
    Table(DataFrame),
    Pages(PageTextMap),
}

impl HandlerData {
    /// Unwrap a table, failing for page-oriented data.
    pub fn into_table(self) -> Result<DataFrame> {
        match self {
            Self::Table(df) => Ok(df),
            Self::Pages(_) => Err(IntakeError::UnsupportedConversion {
                from: "pdf".to_string(),
                to: "table".to_string(),
            }),
        }
    }

    pub fn as_pages(&self) -> Option<&PageTextMap> {
        match self {
            Self::Pages(pages) => Some(pages),
            Self::Table(_) => None,
        }
    }
}

/// Read, validate and describe one file format.
pub trait FormatHandler: Send + Sync {
    /// The format this handler understands.
    fn format(&self) -> FileFormat;

    /// Materialize the file's content.
    fn read_data(&self, source: &SourceFile) -> Result<HandlerData>;

    /// Extract metadata, propagating read errors.
    fn extract_metadata(&self, source: &SourceFile) -> Result<ExtractedMetadata>;

    /// Check the file's structure. Never fails; problems become an invalid result.
    fn validate(&self, source: &SourceFile) -> ValidationResult;

    /// Best-effort metadata: errors are logged and turned into `None`.
    fn get_metadata(&self, source: &SourceFile) -> Option<ExtractedMetadata> {
        match self.extract_metadata(source) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                error!(
                    "Error extracting {} metadata from '{}': {}",
                    self.format().display_name(),
                    source.id(),
                    e
                );
                None
            }
        }
    }
}

/// Build the handler for a format.
pub fn handler_for(format: FileFormat, config: &ProcessorConfig) -> Box<dyn FormatHandler> {
    match format {
        FileFormat::Csv => Box::new(CsvHandler::new(config.clone())),
        FileFormat::Excel => Box::new(ExcelHandler::new(config.clone())),
        FileFormat::Parquet => Box::new(ParquetHandler::new(config.clone())),
        FileFormat::Pdf => Box::new(PdfHandler::new(config.clone())),
    }
}

/// Metadata fields shared by every tabular format.
///
/// `row_count` and `memory_usage` are passed in so handlers that only
/// materialize a slice (Parquet) can report whole-file numbers.
pub(crate) fn tabular_metadata(
    source: &SourceFile,
    df: &DataFrame,
    row_count: usize,
    memory_usage: usize,
    sample_rows: usize,
    details: FormatDetails,
) -> Result<ExtractedMetadata> {
    let mut dtypes = BTreeMap::new();
    let mut column_types = BTreeMap::new();
    for column in df.get_columns() {
        let name = column.name().to_string();
        dtypes.insert(name.clone(), column.dtype().to_string());
        column_types.insert(name, get_dtype_category(column.dtype()));
    }

    Ok(ExtractedMetadata {
        format: source.format(),
        file_size: source.size(),
        row_count: Some(row_count),
        column_count: Some(df.width()),
        columns: df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect(),
        dtypes,
        column_types,
        memory_usage: Some(memory_usage),
        sample: sample_records(df, sample_rows.min(MAX_SAMPLE_ROWS))?,
        details,
    })
}
