use super::{ConvertOptions, Converter, io};
use crate::error::Result;
use crate::types::FileFormat;
use polars::prelude::DataFrame;
use std::path::Path;

/// Converts CSV files to Excel or Parquet.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvConverter;

impl Converter for CsvConverter {
    fn source_format(&self) -> FileFormat {
        FileFormat::Csv
    }

    fn supported_targets(&self) -> &'static [FileFormat] {
        &[FileFormat::Excel, FileFormat::Parquet]
    }

    fn read(&self, source: &Path, _options: &ConvertOptions) -> Result<DataFrame> {
        io::read_table(source, FileFormat::Csv, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("people.csv");
        std::fs::write(&path, "name;age\nAda;36\nAlan;41\n").unwrap();
        path
    }

    #[test]
    fn test_csv_to_excel_default_path() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);

        let output = CsvConverter
            .convert(&source, FileFormat::Excel, &ConvertOptions::default())
            .unwrap();
        assert_eq!(output, dir.path().join("people.xlsx"));

        let back = io::read_table(&output, FileFormat::Excel, Some("Sheet1")).unwrap();
        assert_eq!(back.shape(), (2, 2));
    }

    #[test]
    fn test_csv_to_parquet_custom_path() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let target = dir.path().join("out").join("people.pq");

        let output = CsvConverter
            .convert(
                &source,
                FileFormat::Parquet,
                &ConvertOptions::default().with_output_path(&target),
            )
            .unwrap();
        assert_eq!(output, target);
        assert!(target.exists());
    }

    #[test]
    fn test_csv_to_csv_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);

        assert!(CsvConverter
            .convert(&source, FileFormat::Csv, &ConvertOptions::default())
            .is_none());
        assert!(CsvConverter
            .convert(&source, FileFormat::Pdf, &ConvertOptions::default())
            .is_none());
    }

    #[test]
    fn test_missing_source_returns_none() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.csv");
        assert!(CsvConverter
            .convert(&missing, FileFormat::Parquet, &ConvertOptions::default())
            .is_none());
    }
}
