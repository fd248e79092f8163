//! Custom error types for the intake library.
//!
//! This module provides the error hierarchy using `thiserror`. Handlers turn
//! most of these into a failed [`ValidationResult`](crate::types::ValidationResult)
//! or an absent metadata value; the processor records the rest on the file
//! record before reporting a failed outcome.
//!
//! Errors are serializable so a caller can persist or ship them as
//! `{code, message}` pairs.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::types::FileStatus;

/// The main error type for the intake library.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// No handler, processor or converter exists for the given type.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Converter asked for a target it cannot produce.
    #[error("Cannot convert {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    /// The file has no usable content.
    #[error("{0}")]
    EmptyFile(String),

    /// Structural problem found while reading the file.
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// The file did not pass validation; carries the validation message.
    #[error("{0}")]
    ValidationFailed(String),

    /// The status state machine refused a transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: FileStatus, to: FileStatus },

    /// Record was not found in the record store.
    #[error("File record '{0}' not found")]
    RecordNotFound(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Row-level CSV parse error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook could not be opened or read.
    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Workbook could not be written.
    #[error("Excel writer error: {0}")]
    ExcelWriter(#[from] rust_xlsxwriter::XlsxError),

    /// PDF document could not be parsed.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<IntakeError>,
    },
}

impl IntakeError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        IntakeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for callers persisting failures.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::UnsupportedConversion { .. } => "UNSUPPORTED_CONVERSION",
            Self::EmptyFile(_) => "EMPTY_FILE",
            Self::InvalidStructure(_) => "INVALID_STRUCTURE",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::RecordNotFound(_) => "RECORD_NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::Excel(_) => "EXCEL_ERROR",
            Self::ExcelWriter(_) => "EXCEL_WRITER_ERROR",
            Self::Pdf(_) => "PDF_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means the caller asked for something unsupported,
    /// as opposed to the file itself being broken.
    pub fn is_unsupported(&self) -> bool {
        match self {
            Self::UnsupportedFormat(_) | Self::UnsupportedConversion { .. } => true,
            Self::WithContext { source, .. } => source.is_unsupported(),
            _ => false,
        }
    }
}

impl Serialize for IntakeError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("IntakeError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for intake operations.
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| IntakeError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| IntakeError::Io(e).with_context(context))
    }
}
