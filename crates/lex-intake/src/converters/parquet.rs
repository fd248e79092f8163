use super::{ConvertOptions, Converter, io};
use crate::error::Result;
use crate::types::FileFormat;
use polars::prelude::DataFrame;
use std::path::Path;

/// Converts Parquet files to CSV or Excel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetConverter;

impl Converter for ParquetConverter {
    fn source_format(&self) -> FileFormat {
        FileFormat::Parquet
    }

    fn supported_targets(&self) -> &'static [FileFormat] {
        &[FileFormat::Csv, FileFormat::Excel]
    }

    fn read(&self, source: &Path, _options: &ConvertOptions) -> Result<DataFrame> {
        io::read_table(source, FileFormat::Parquet, None)
    }
}
