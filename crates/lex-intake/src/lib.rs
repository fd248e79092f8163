//! File Intake Library
//!
//! Per-format validation, metadata extraction, data quality scoring and
//! format conversion for uploaded data files, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Handlers**: CSV, Excel, Parquet and PDF readers that validate structure
//!   and extract [`ExtractedMetadata`]
//! - **Quality**: missing values, duplicate rows and IQR outliers rolled into
//!   a 0-100 score with improvement suggestions
//! - **Processors**: drive a file record through
//!   `pending -> processing -> {processed | failed}` with field-isolated writes
//! - **Converters**: CSV, Excel and Parquet conversions, composable into chains
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_intake::{FileRecord, MemoryRecordStore, SourceFile, get_processor};
//!
//! let source = SourceFile::from_path("uploads/sales.csv")?;
//! let store = MemoryRecordStore::new();
//! store.insert(FileRecord::new(source.id(), source.name(), source.format()));
//!
//! let processor = get_processor("csv").expect("csv is supported");
//! let outcome = processor.process(&source, &store);
//!
//! if let Some(quality) = outcome.quality {
//!     println!("Quality score: {:.1}", quality.quality_score);
//! }
//! ```
//!
//! # Conversion
//!
//! ```rust,ignore
//! use lex_intake::{ConvertOptions, FileFormat, get_converter};
//!
//! let converter = get_converter("csv").expect("csv converter");
//! let output = converter.convert(
//!     "sales.csv".as_ref(),
//!     FileFormat::Parquet,
//!     &ConvertOptions::default(),
//! );
//! ```
//!
//! # Configuration
//!
//! Use [`ProcessorConfig`] to tune sampling and normalized output:
//!
//! ```rust,ignore
//! use lex_intake::ProcessorConfig;
//!
//! let config = ProcessorConfig::builder()
//!     .sample_rows(3)
//!     .pdf_probe_pages(5)
//!     .output_dir("normalized")
//!     .build()?;
//! ```

pub mod config;
pub mod converters;
pub mod error;
pub mod handlers;
pub mod processor;
pub mod quality;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, ProcessorConfig, ProcessorConfigBuilder};
pub use converters::{
    CompositeConverter, ConvertOptions, Converter, CsvConverter, ExcelConverter, ParquetConverter,
    converter_for, get_converter,
};
pub use error::{IntakeError, Result as IntakeResult, ResultExt};
pub use handlers::{FormatHandler, HandlerData, handler_for};
pub use processor::{
    FieldUpdate, FileRecord, MemoryRecordStore, Processor, ProcessorFactory, RecordStore,
    get_processor,
};
pub use quality::{DataQualityChecker, quality_score};
pub use types::{
    ColumnStatistics, ExtractedMetadata, FileFormat, FileStatus, FormatDetails,
    ProcessingOutcome, QualityReport, SourceFile, ValidationResult,
};
