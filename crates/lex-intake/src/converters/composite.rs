use super::{ConvertOptions, Converter};
use crate::types::FileFormat;
use std::path::{Path, PathBuf};
use tracing::debug;

struct Stage {
    converter: Box<dyn Converter>,
    target: Option<FileFormat>,
}

/// Runs converters in sequence, feeding each stage the previous output.
///
/// A stage converts to its own target when it has one and to the call's
/// target otherwise. `output_path` only applies to the final stage; earlier
/// stages write next to their input. The chain stops at the first stage that
/// yields `None`.
#[derive(Default)]
pub struct CompositeConverter {
    stages: Vec<Stage>,
}

impl CompositeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage. `target` overrides the call's target for this stage.
    pub fn then(mut self, converter: Box<dyn Converter>, target: Option<FileFormat>) -> Self {
        self.stages.push(Stage { converter, target });
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn convert(
        &self,
        source: &Path,
        target: FileFormat,
        options: &ConvertOptions,
    ) -> Option<PathBuf> {
        let mut current = source.to_path_buf();
        let last = self.stages.len().saturating_sub(1);

        for (idx, stage) in self.stages.iter().enumerate() {
            let stage_target = stage.target.unwrap_or(target);
            let stage_options = ConvertOptions {
                output_path: if idx == last {
                    options.output_path.clone()
                } else {
                    None
                },
                sheet_name: if idx == 0 {
                    options.sheet_name.clone()
                } else {
                    None
                },
                excel_sheet_name: options.excel_sheet_name.clone(),
            };

            debug!(
                "Composite stage {}: {} -> {}",
                idx + 1,
                stage.converter.source_format(),
                stage_target
            );
            current = stage
                .converter
                .convert(&current, stage_target, &stage_options)?;
        }

        Some(current)
    }
}

impl std::fmt::Debug for CompositeConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stages: Vec<String> = self
            .stages
            .iter()
            .map(|s| match s.target {
                Some(target) => format!("{}->{}", s.converter.source_format(), target),
                None => format!("{}->*", s.converter.source_format()),
            })
            .collect();
        f.debug_struct("CompositeConverter")
            .field("stages", &stages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::{CsvConverter, ExcelConverter, ParquetConverter, io};
    use tempfile::TempDir;

    fn csv_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "order,amount\n1,9.5\n2,12.0\n3,7.25\n").unwrap();
        path
    }

    #[test]
    fn test_chain_csv_excel_csv() {
        let dir = TempDir::new().unwrap();
        let source = csv_file(&dir);
        let final_path = dir.path().join("final").join("orders_roundtrip.csv");

        let chain = CompositeConverter::new()
            .then(Box::new(CsvConverter), Some(FileFormat::Excel))
            .then(Box::new(ExcelConverter), None);
        assert_eq!(chain.len(), 2);

        let output = chain
            .convert(
                &source,
                FileFormat::Csv,
                &ConvertOptions::default().with_output_path(&final_path),
            )
            .unwrap();

        assert_eq!(output, final_path);
        assert!(dir.path().join("orders.xlsx").exists());
        let back = io::read_table(&output, FileFormat::Csv, None).unwrap();
        assert_eq!(back.shape(), (3, 2));
    }

    #[test]
    fn test_chain_short_circuits_on_none() {
        let dir = TempDir::new().unwrap();
        let source = csv_file(&dir);

        // Parquet cannot convert to Parquet, so the chain stops at stage two
        let chain = CompositeConverter::new()
            .then(Box::new(CsvConverter), Some(FileFormat::Parquet))
            .then(Box::new(ParquetConverter), Some(FileFormat::Parquet))
            .then(Box::new(ParquetConverter), Some(FileFormat::Csv));

        let output = chain.convert(&source, FileFormat::Csv, &ConvertOptions::default());
        assert!(output.is_none());
        assert!(dir.path().join("orders.parquet").exists());
    }

    #[test]
    fn test_empty_chain_returns_source() {
        let source = PathBuf::from("untouched.csv");
        let chain = CompositeConverter::new();
        assert!(chain.is_empty());
        assert_eq!(
            chain.convert(&source, FileFormat::Excel, &ConvertOptions::default()),
            Some(source)
        );
    }

    #[test]
    fn test_debug_lists_stages() {
        let chain = CompositeConverter::new()
            .then(Box::new(CsvConverter), Some(FileFormat::Parquet))
            .then(Box::new(ParquetConverter), None);
        assert_eq!(
            format!("{chain:?}"),
            "CompositeConverter { stages: [\"csv->parquet\", \"parquet->*\"] }"
        );
    }
}
