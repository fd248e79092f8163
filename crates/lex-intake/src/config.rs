//! Configuration types for file processing.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic processor setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hard cap on sample rows attached to extracted metadata.
pub const MAX_SAMPLE_ROWS: usize = 5;

/// Configuration shared by handlers and processors.
///
/// Use [`ProcessorConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_intake::config::ProcessorConfig;
///
/// let config = ProcessorConfig::builder()
///     .output_dir("normalized")
///     .sample_rows(3)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Number of sample records attached to tabular metadata (1 - 5).
    /// Default: 5
    pub sample_rows: usize,

    /// Number of leading bytes inspected when detecting a CSV delimiter.
    /// Default: 4096
    pub delimiter_sniff_bytes: usize,

    /// Maximum number of inconsistent CSV rows listed in a validation message.
    /// Default: 10
    pub max_reported_rows: usize,

    /// Number of leading PDF pages probed for extractable text.
    /// Default: 3
    pub pdf_probe_pages: usize,

    /// Maximum number of characters in the PDF first-page text sample.
    /// Default: 500
    pub pdf_sample_chars: usize,

    /// Whether tabular files are scored by the quality checker during processing.
    /// Default: true
    pub compute_quality: bool,

    /// Directory for normalized copies (CSV for Excel/Parquet, text for PDF).
    /// When None, no copies are written.
    /// Default: None
    pub output_dir: Option<PathBuf>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sample_rows: MAX_SAMPLE_ROWS,
            delimiter_sniff_bytes: 4096,
            max_reported_rows: 10,
            pdf_probe_pages: 3,
            pdf_sample_chars: 500,
            compute_quality: true,
            output_dir: None,
        }
    }
}

impl ProcessorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(1..=MAX_SAMPLE_ROWS).contains(&self.sample_rows) {
            return Err(ConfigValidationError::InvalidSampleRows(self.sample_rows));
        }

        for (field, value) in [
            ("delimiter_sniff_bytes", self.delimiter_sniff_bytes),
            ("max_reported_rows", self.max_reported_rows),
            ("pdf_probe_pages", self.pdf_probe_pages),
            ("pdf_sample_chars", self.pdf_sample_chars),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroLimit(field.to_string()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid sample rows: {0} (must be between 1 and {MAX_SAMPLE_ROWS})")]
    InvalidSampleRows(usize),

    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroLimit(String),
}

/// Builder for [`ProcessorConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    sample_rows: Option<usize>,
    delimiter_sniff_bytes: Option<usize>,
    max_reported_rows: Option<usize>,
    pdf_probe_pages: Option<usize>,
    pdf_sample_chars: Option<usize>,
    compute_quality: Option<bool>,
    output_dir: Option<PathBuf>,
}

impl ProcessorConfigBuilder {
    /// Set how many sample records tabular metadata carries.
    ///
    /// # Arguments
    /// * `rows` - Value between 1 and 5
    pub fn sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = Some(rows);
        self
    }

    /// Set how many leading bytes are sampled for delimiter detection.
    pub fn delimiter_sniff_bytes(mut self, bytes: usize) -> Self {
        self.delimiter_sniff_bytes = Some(bytes);
        self
    }

    /// Set how many inconsistent CSV rows a validation message lists.
    pub fn max_reported_rows(mut self, rows: usize) -> Self {
        self.max_reported_rows = Some(rows);
        self
    }

    /// Set how many leading PDF pages are probed for text.
    pub fn pdf_probe_pages(mut self, pages: usize) -> Self {
        self.pdf_probe_pages = Some(pages);
        self
    }

    /// Set the maximum length of the PDF text sample.
    pub fn pdf_sample_chars(mut self, chars: usize) -> Self {
        self.pdf_sample_chars = Some(chars);
        self
    }

    /// Enable or disable quality scoring during processing.
    pub fn compute_quality(mut self, compute: bool) -> Self {
        self.compute_quality = Some(compute);
        self
    }

    /// Set the directory normalized copies are written to.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ProcessorConfig` or an error if validation fails.
    pub fn build(self) -> Result<ProcessorConfig, ConfigValidationError> {
        let defaults = ProcessorConfig::default();
        let config = ProcessorConfig {
            sample_rows: self.sample_rows.unwrap_or(defaults.sample_rows),
            delimiter_sniff_bytes: self
                .delimiter_sniff_bytes
                .unwrap_or(defaults.delimiter_sniff_bytes),
            max_reported_rows: self.max_reported_rows.unwrap_or(defaults.max_reported_rows),
            pdf_probe_pages: self.pdf_probe_pages.unwrap_or(defaults.pdf_probe_pages),
            pdf_sample_chars: self.pdf_sample_chars.unwrap_or(defaults.pdf_sample_chars),
            compute_quality: self.compute_quality.unwrap_or(defaults.compute_quality),
            output_dir: self.output_dir,
        };

        config.validate()?;
        Ok(config)
    }
}
