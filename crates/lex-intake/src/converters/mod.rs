//! Format-to-format transcoders for tabular files.
//!
//! Converters are stateless. Each reads one source format into a polars
//! [`DataFrame`] and writes it back out in a supported target format. A
//! [`CompositeConverter`] chains several of them.
//!
//! `convert` never fails loudly: unsupported targets are logged as warnings,
//! read or write errors as errors, and both yield `None`.

mod composite;
mod csv;
mod excel;
pub mod io;
mod parquet;

pub use self::composite::CompositeConverter;
pub use self::csv::CsvConverter;
pub use self::excel::ExcelConverter;
pub use self::parquet::ParquetConverter;

use crate::error::{IntakeError, Result};
use crate::types::FileFormat;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Sheet name used for Excel output when none is given.
pub const DEFAULT_EXCEL_SHEET: &str = "Sheet1";

/// Options recognized by every converter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Write here instead of next to the source.
    pub output_path: Option<PathBuf>,
    /// Sheet to read when the source is a workbook. Defaults to the first.
    pub sheet_name: Option<String>,
    /// Sheet name for workbook output. Defaults to `Sheet1`.
    pub excel_sheet_name: Option<String>,
}

impl ConvertOptions {
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    pub fn with_excel_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.excel_sheet_name = Some(name.into());
        self
    }

    pub fn excel_sheet_name(&self) -> &str {
        self.excel_sheet_name.as_deref().unwrap_or(DEFAULT_EXCEL_SHEET)
    }
}

/// Default output location: the source path with the target's extension.
pub fn default_output_path(source: &Path, target: FileFormat) -> PathBuf {
    source.with_extension(target.default_extension())
}

/// A stateless transcoder from one source format.
pub trait Converter: Send + Sync {
    /// Format this converter reads.
    fn source_format(&self) -> FileFormat;

    /// Formats this converter can write.
    fn supported_targets(&self) -> &'static [FileFormat];

    /// Read the source file into a table.
    fn read(&self, source: &Path, options: &ConvertOptions) -> Result<DataFrame>;

    fn supports(&self, target: FileFormat) -> bool {
        self.supported_targets().contains(&target)
    }

    /// Convert, propagating failures.
    fn try_convert(
        &self,
        source: &Path,
        target: FileFormat,
        options: &ConvertOptions,
    ) -> Result<PathBuf> {
        if !self.supports(target) {
            return Err(IntakeError::UnsupportedConversion {
                from: self.source_format().to_string(),
                to: target.to_string(),
            });
        }

        let output = options
            .output_path
            .clone()
            .unwrap_or_else(|| default_output_path(source, target));

        let mut df = self.read(source, options)?;
        io::write_table(&mut df, target, &output, options.excel_sheet_name())?;
        Ok(output)
    }

    /// Convert `source` to `target`, returning the written path.
    fn convert(
        &self,
        source: &Path,
        target: FileFormat,
        options: &ConvertOptions,
    ) -> Option<PathBuf> {
        match self.try_convert(source, target, options) {
            Ok(output) => {
                info!(
                    "Converted {} to {} ({})",
                    source.display(),
                    target,
                    output.display()
                );
                Some(output)
            }
            Err(e) if e.is_unsupported() => {
                warn!(
                    "Unsupported target format: {} for {} source",
                    target,
                    self.source_format()
                );
                None
            }
            Err(e) => {
                error!(
                    "Error converting {} file {} to {}: {}",
                    self.source_format().display_name(),
                    source.display(),
                    target,
                    e
                );
                None
            }
        }
    }
}

/// Resolve a converter from a declared type (`csv`, `excel`, ...) or an
/// extension (`xlsx`, `.parquet`, ...). Unknown values are logged and yield
/// `None`.
pub fn get_converter(type_or_extension: &str) -> Option<Box<dyn Converter>> {
    match FileFormat::from_type_or_extension(type_or_extension) {
        Some(format) => converter_for(format),
        None => {
            warn!("Unsupported converter type: {}", type_or_extension);
            None
        }
    }
}

/// Converter for a source format, if one exists.
pub fn converter_for(format: FileFormat) -> Option<Box<dyn Converter>> {
    match format {
        FileFormat::Csv => Some(Box::new(CsvConverter)),
        FileFormat::Excel => Some(Box::new(ExcelConverter)),
        FileFormat::Parquet => Some(Box::new(ParquetConverter)),
        FileFormat::Pdf => {
            warn!("Unsupported converter type: {}", format);
            None
        }
    }
}

static_assertions::assert_impl_all!(CsvConverter: Send, Sync);
static_assertions::assert_impl_all!(ExcelConverter: Send, Sync);
static_assertions::assert_impl_all!(ParquetConverter: Send, Sync);
static_assertions::assert_impl_all!(CompositeConverter: Send, Sync);
