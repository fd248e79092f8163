use super::{ConvertOptions, Converter, io};
use crate::error::Result;
use crate::types::FileFormat;
use polars::prelude::DataFrame;
use std::path::Path;

/// Converts one sheet of a workbook to CSV or Parquet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelConverter;

impl Converter for ExcelConverter {
    fn source_format(&self) -> FileFormat {
        FileFormat::Excel
    }

    fn supported_targets(&self) -> &'static [FileFormat] {
        &[FileFormat::Csv, FileFormat::Parquet]
    }

    fn read(&self, source: &Path, options: &ConvertOptions) -> Result<DataFrame> {
        io::read_table(source, FileFormat::Excel, options.sheet_name.as_deref())
    }
}
