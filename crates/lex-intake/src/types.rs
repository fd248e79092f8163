use crate::error::{IntakeError, Result};
use crate::utils::{DtypeCategory, SampleRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// File Formats
// ============================================================================

/// The closed set of formats the intake library understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Csv,
    Excel,
    Parquet,
    Pdf,
}

impl FileFormat {
    pub const ALL: [FileFormat; 4] = [Self::Csv, Self::Excel, Self::Parquet, Self::Pdf];

    /// Resolve an explicit type (`csv`, `excel`, ...) or a file extension
    /// (`xlsx`, `.parquet`, ...). Case-insensitive.
    pub fn from_type_or_extension(value: &str) -> Option<Self> {
        let normalized = value.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" => Some(Self::Csv),
            "excel" | "xls" | "xlsx" | "xlsm" => Some(Self::Excel),
            "parquet" => Some(Self::Parquet),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Resolve the format of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_type_or_extension)
    }

    /// Canonical type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Parquet => "parquet",
            Self::Pdf => "pdf",
        }
    }

    /// Extension used when writing this format.
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
            Self::Parquet => "parquet",
            Self::Pdf => "pdf",
        }
    }

    /// Extensions accepted for files declared as this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Csv => &["csv"],
            Self::Excel => &["xls", "xlsx", "xlsm"],
            Self::Parquet => &["parquet"],
            Self::Pdf => &["pdf"],
        }
    }

    /// Human-readable label used in validation messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Excel => "Excel",
            Self::Parquet => "Parquet",
            Self::Pdf => "PDF",
        }
    }

    /// Whether the format materializes into a table.
    pub fn is_tabular(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Source Files
// ============================================================================

/// Immutable raw bytes plus the format they were declared or inferred as.
///
/// The caller owns the file; handlers only ever borrow it.
#[derive(Debug, Clone)]
pub struct SourceFile {
    id: String,
    name: String,
    format: FileFormat,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    /// Wrap bytes with an explicit format.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        format: FileFormat,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            format,
            bytes: bytes.into(),
        }
    }

    /// Wrap bytes, inferring the format from the file name's extension.
    pub fn infer(
        id: impl Into<String>,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self> {
        let name = name.into();
        let format = FileFormat::from_path(Path::new(&name))
            .ok_or_else(|| IntakeError::UnsupportedFormat(name.clone()))?;
        Ok(Self::new(id, name, format, bytes))
    }

    /// Load a file from disk. The path doubles as the identifier.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)
            .ok_or_else(|| IntakeError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_path_as(path, format)
    }

    /// Load a file from disk with an explicit format.
    pub fn from_path_as(path: impl AsRef<Path>, format: FileFormat) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(path.display().to_string(), name, format, bytes))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lower-cased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Row and column counts of one Excel sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
}

/// Format-specific metadata fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatDetails {
    Csv {
        delimiter: char,
        /// Non-blank lines, header excluded.
        line_count: usize,
    },
    Excel {
        sheet_count: usize,
        sheet_names: Vec<String>,
        sheets: Vec<SheetInfo>,
    },
    Parquet {
        /// Rows materialized to estimate the in-memory footprint.
        sampled_rows: usize,
    },
    Pdf {
        page_count: usize,
        /// Document info dictionary, keys lower-cased.
        document_info: BTreeMap<String, String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sample_text: Option<String>,
    },
}

/// Structural metadata extracted from a file.
///
/// Tabular fields are `None`/empty for PDFs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub format: FileFormat,
    pub file_size: u64,
    pub row_count: Option<usize>,
    pub column_count: Option<usize>,
    pub columns: Vec<String>,
    /// Storage dtype per column, as reported by polars.
    pub dtypes: BTreeMap<String, String>,
    /// Inferred kind per column.
    pub column_types: BTreeMap<String, DtypeCategory>,
    /// Estimated in-memory footprint in bytes.
    pub memory_usage: Option<usize>,
    /// Leading rows, never more than five.
    pub sample: Vec<SampleRecord>,
    pub details: FormatDetails,
}

impl ExtractedMetadata {
    /// Whether there is anything worth attaching to a record.
    pub fn is_empty(&self) -> bool {
        self.row_count.is_none()
            && self.columns.is_empty()
            && !matches!(self.details, FormatDetails::Pdf { .. })
    }
}

/// Page number (1-based) to extracted plain text.
pub type PageTextMap = BTreeMap<u32, String>;

// ============================================================================
// Quality
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValues {
    /// One entry per column, in column order.
    pub columns: Vec<ColumnMissing>,
    pub total_missing_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateStats {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOutliers {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Data quality assessment of a materialized table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub row_count: usize,
    pub column_count: usize,
    pub missing: MissingValues,
    pub has_missing_values: bool,
    /// Storage dtype per column, in column order.
    pub data_types: Vec<(String, String)>,
    pub duplicates: DuplicateStats,
    /// Numeric columns only, in column order.
    pub outliers: Vec<ColumnOutliers>,
    pub quality_score: f64,
    pub suitable_for_ml: bool,
    pub suitable_for_visualization: bool,
    pub suggestions: Vec<String>,
}

impl QualityReport {
    pub fn missing_for(&self, column: &str) -> Option<&ColumnMissing> {
        self.missing.columns.iter().find(|c| c.column == column)
    }

    pub fn outliers_for(&self, column: &str) -> Option<&ColumnOutliers> {
        self.outliers.iter().find(|c| c.column == column)
    }
}

/// Describe-style summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

// ============================================================================
// Processing
// ============================================================================

/// Lifecycle of a file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    #[default]
    Pending,
    Processing,
    Processed,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }

    /// Whether `self -> next` is a legal step.
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Processed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Move to `next`, rejecting illegal steps.
    pub fn transition(self, next: FileStatus) -> Result<FileStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IntakeError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single value a processor run returns to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    pub record_id: String,
    /// Always `Processed` or `Failed`.
    pub final_status: FileStatus,
    pub metadata: Option<ExtractedMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Vec<ColumnStatistics>>,
    pub quality: Option<QualityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_file: Option<PathBuf>,
    /// Validation warnings (e.g. image-only PDF).
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ProcessingOutcome {
    pub fn is_processed(&self) -> bool {
        self.final_status == FileStatus::Processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_type_or_extension() {
        assert_eq!(FileFormat::from_type_or_extension("csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_type_or_extension("EXCEL"), Some(FileFormat::Excel));
        assert_eq!(FileFormat::from_type_or_extension(".xlsx"), Some(FileFormat::Excel));
        assert_eq!(FileFormat::from_type_or_extension("xlsm"), Some(FileFormat::Excel));
        assert_eq!(FileFormat::from_type_or_extension("parquet"), Some(FileFormat::Parquet));
        assert_eq!(FileFormat::from_type_or_extension("pdf"), Some(FileFormat::Pdf));
        assert_eq!(FileFormat::from_type_or_extension("docx"), None);
    }

    #[test]
    fn test_source_file_infer() {
        let source = SourceFile::infer("1", "Report.XLSX", vec![1u8, 2, 3]).unwrap();
        assert_eq!(source.format(), FileFormat::Excel);
        assert_eq!(source.extension().as_deref(), Some("xlsx"));
        assert_eq!(source.stem(), "Report");
        assert_eq!(source.size(), 3);

        let err = SourceFile::infer("2", "notes.docx", Vec::<u8>::new()).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_status_transitions() {
        let status = FileStatus::Pending.transition(FileStatus::Processing).unwrap();
        assert_eq!(status.transition(FileStatus::Processed).unwrap(), FileStatus::Processed);
        assert!(FileStatus::Processing.can_transition_to(FileStatus::Failed));
        assert!(FileStatus::Pending.transition(FileStatus::Processed).is_err());
        assert!(FileStatus::Processed.transition(FileStatus::Processing).is_err());
        assert!(FileStatus::Failed.is_terminal());
    }

    #[test]
    fn test_validation_result_builders() {
        let result = ValidationResult::valid("Valid PDF file").with_warning("scanned");
        assert!(result.is_valid);
        assert_eq!(result.warnings, vec!["scanned".to_string()]);
        assert!(!ValidationResult::invalid("nope").is_valid);
    }

    #[test]
    fn test_format_details_serialization() {
        let details = FormatDetails::Csv {
            delimiter: ';',
            line_count: 4,
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["kind"], "csv");
        assert_eq!(json["delimiter"], ";");
    }
}
