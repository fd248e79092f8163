//! CSV handler.
//!
//! The delimiter is detected from the leading bytes of the file. Validation
//! walks every record with the `csv` crate in flexible mode so ragged rows
//! can be reported by number; the table itself is read with polars.

use super::{FormatHandler, HandlerData, tabular_metadata};
use crate::config::ProcessorConfig;
use crate::error::{IntakeError, Result, ResultExt};
use crate::types::{ExtractedMetadata, FileFormat, FormatDetails, SourceFile, ValidationResult};
use polars::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;
use tracing::{debug, warn};

/// Delimiters considered during detection, in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Detect the delimiter of a CSV sample.
///
/// A candidate that appears the same non-zero number of times on every
/// sampled line wins; the highest such count is preferred. When no candidate
/// is consistent, the most frequent one is used, and `,` when none occur.
/// Delimiters inside double quotes are ignored.
pub fn detect_delimiter(sample: &[u8]) -> u8 {
    let text = String::from_utf8_lossy(sample);
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return b',';
    }

    let mut best_consistent: Option<(u8, usize)> = None;
    let mut best_total: Option<(u8, usize)> = None;

    for candidate in CANDIDATE_DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .collect();
        let first = counts[0];
        let total: usize = counts.iter().sum();

        if first > 0
            && counts.iter().all(|&c| c == first)
            && best_consistent.is_none_or(|(_, best)| first > best)
        {
            best_consistent = Some((candidate, first));
        }

        if total > 0 && best_total.is_none_or(|(_, best)| total > best) {
            best_total = Some((candidate, total));
        }
    }

    best_consistent
        .or(best_total)
        .map(|(delimiter, _)| delimiter)
        .unwrap_or(b',')
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Result of walking every record of a CSV file.
#[derive(Debug, Default)]
struct RowScan {
    header_len: Option<usize>,
    data_rows: usize,
    /// 1-based row numbers (header = 1), capped at the configured limit.
    inconsistent_rows: Vec<usize>,
    inconsistent_total: usize,
}

/// Handler for comma (or otherwise) separated files.
#[derive(Debug, Clone, Default)]
pub struct CsvHandler {
    config: ProcessorConfig,
}

impl CsvHandler {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    /// Detect the delimiter from the configured number of leading bytes.
    pub fn delimiter_for(&self, source: &SourceFile) -> u8 {
        let bytes = source.bytes();
        let limit = self.config.delimiter_sniff_bytes.min(bytes.len());
        let mut sample = &bytes[..limit];

        // Drop a trailing partial line when the sample cuts the file short
        if limit < bytes.len()
            && let Some(last_newline) = sample.iter().rposition(|b| *b == b'\n')
        {
            sample = &sample[..last_newline];
        }

        let delimiter = detect_delimiter(sample);
        debug!(
            "Detected delimiter {:?} for '{}'",
            delimiter as char,
            source.id()
        );
        delimiter
    }

    /// Read the file into a DataFrame with an explicit delimiter.
    pub fn read_frame(&self, source: &SourceFile, delimiter: u8) -> Result<DataFrame> {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(CsvParseOptions::default().with_separator(delimiter))
            .into_reader_with_file_handle(Cursor::new(
                strip_blank_lines(source.bytes()).into_owned(),
            ))
            .finish()
            .context(format!("Reading CSV '{}'", source.id()))
    }

    fn scan_rows(&self, source: &SourceFile, delimiter: u8) -> Result<RowScan> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(source.bytes());

        let mut scan = RowScan::default();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let row_number = idx + 1;

            match scan.header_len {
                None => scan.header_len = Some(record.len()),
                Some(expected) => {
                    scan.data_rows += 1;
                    if record.len() != expected {
                        scan.inconsistent_total += 1;
                        if scan.inconsistent_rows.len() < self.config.max_reported_rows {
                            scan.inconsistent_rows.push(row_number);
                        }
                    }
                }
            }
        }

        Ok(scan)
    }
}

/// A line holding nothing but spaces and line terminators.
///
/// Tabs are not blank: in a tab-separated file they delimit empty fields.
fn is_blank_line(line: &[u8]) -> bool {
    line.iter().all(|b| matches!(b, b' ' | b'\r' | b'\n'))
}

/// Non-blank lines in the file, header excluded.
fn data_line_count(bytes: &[u8]) -> usize {
    bytes
        .split(|b| *b == b'\n')
        .filter(|line| !is_blank_line(line))
        .count()
        .saturating_sub(1)
}

/// Drop blank lines that sit outside quoted fields.
///
/// The record scan skips them, so the table must not turn them into
/// all-null rows.
fn strip_blank_lines(bytes: &[u8]) -> Cow<'_, [u8]> {
    let mut kept = Vec::with_capacity(bytes.len());
    let mut in_quotes = false;
    let mut dropped = false;

    for line in bytes.split_inclusive(|b| *b == b'\n') {
        if !in_quotes && is_blank_line(line) {
            dropped = true;
            continue;
        }
        // Escaped quotes ("") toggle twice and cancel out
        in_quotes ^= line.iter().filter(|b| **b == b'"').count() % 2 == 1;
        kept.extend_from_slice(line);
    }

    if dropped {
        Cow::Owned(kept)
    } else {
        Cow::Borrowed(bytes)
    }
}

impl FormatHandler for CsvHandler {
    fn format(&self) -> FileFormat {
        FileFormat::Csv
    }

    fn read_data(&self, source: &SourceFile) -> Result<HandlerData> {
        let delimiter = self.delimiter_for(source);
        Ok(HandlerData::Table(self.read_frame(source, delimiter)?))
    }

    fn extract_metadata(&self, source: &SourceFile) -> Result<ExtractedMetadata> {
        let delimiter = self.delimiter_for(source);
        let df = self.read_frame(source, delimiter)?;
        if df.width() == 0 {
            return Err(IntakeError::EmptyFile("CSV file is empty".to_string()));
        }

        tabular_metadata(
            source,
            &df,
            df.height(),
            df.estimated_size(),
            self.config.sample_rows,
            FormatDetails::Csv {
                delimiter: delimiter as char,
                line_count: data_line_count(source.bytes()),
            },
        )
    }

    fn validate(&self, source: &SourceFile) -> ValidationResult {
        if source.bytes().iter().all(|b| b.is_ascii_whitespace()) {
            return ValidationResult::invalid("CSV file is empty");
        }

        let delimiter = self.delimiter_for(source);
        let scan = match self.scan_rows(source, delimiter) {
            Ok(scan) => scan,
            Err(e) => {
                warn!("CSV '{}' could not be parsed: {}", source.id(), e);
                return ValidationResult::invalid(format!("Invalid CSV file: {e}"));
            }
        };

        let Some(expected) = scan.header_len else {
            return ValidationResult::invalid("CSV file is empty");
        };
        if scan.data_rows == 0 {
            return ValidationResult::invalid("CSV file is empty");
        }

        if scan.inconsistent_total > 0 {
            let rows = scan
                .inconsistent_rows
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            warn!(
                "CSV '{}' has {} rows with inconsistent column counts",
                source.id(),
                scan.inconsistent_total
            );
            return ValidationResult::invalid(format!(
                "Inconsistent number of columns: expected {expected}, \
                 {} row(s) differ (rows: {rows})",
                scan.inconsistent_total
            ));
        }

        if let Err(e) = self.read_frame(source, delimiter) {
            return ValidationResult::invalid(format!("Invalid CSV file: {e}"));
        }

        ValidationResult::valid("Valid CSV file")
    }
}
