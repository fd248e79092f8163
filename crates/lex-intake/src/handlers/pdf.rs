//! PDF handler backed by lopdf.
//!
//! PDFs are read as a map of page number to extracted text. Pages whose text
//! cannot be decoded are kept as empty strings so page numbering is stable.

use super::{FormatHandler, HandlerData};
use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::types::{
    ExtractedMetadata, FileFormat, FormatDetails, PageTextMap, SourceFile, ValidationResult,
};
use lopdf::{Dictionary, Document, Object};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Warning attached when the probed pages yield no text.
pub const NO_TEXT_WARNING: &str = "PDF may be scanned or contain no text";

#[derive(Debug, Clone, Default)]
pub struct PdfHandler {
    config: ProcessorConfig,
}

impl PdfHandler {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    fn load(source: &SourceFile) -> Result<Document> {
        Ok(Document::load_mem(source.bytes())?)
    }

    /// Extract tables from a PDF.
    ///
    /// Table detection needs layout analysis lopdf does not provide, so this
    /// always returns an empty list.
    pub fn extract_tables(&self, source: &SourceFile) -> Result<Vec<DataFrame>> {
        info!(
            "Table extraction for '{}' is not supported for PDF content",
            source.id()
        );
        Ok(Vec::new())
    }
}

fn page_text(doc: &Document, page_number: u32) -> String {
    match doc.extract_text(&[page_number]) {
        Ok(text) => text,
        Err(e) => {
            debug!("No text extracted from page {}: {}", page_number, e);
            String::new()
        }
    }
}

/// Decode a PDF text string: UTF-16BE with a BOM, otherwise single-byte.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn object_to_string(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Document info entries with lower-cased keys.
fn document_info(doc: &Document) -> BTreeMap<String, String> {
    let Some(dict) = info_dictionary(doc) else {
        return BTreeMap::new();
    };

    dict.iter()
        .filter_map(|(key, value)| {
            let key = String::from_utf8_lossy(key).to_lowercase();
            object_to_string(value).map(|value| (key, value))
        })
        .collect()
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened.
fn truncate_sample(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl FormatHandler for PdfHandler {
    fn format(&self) -> FileFormat {
        FileFormat::Pdf
    }

    fn read_data(&self, source: &SourceFile) -> Result<HandlerData> {
        let doc = Self::load(source)?;
        let pages: PageTextMap = doc
            .get_pages()
            .keys()
            .map(|&page_number| (page_number, page_text(&doc, page_number)))
            .collect();
        Ok(HandlerData::Pages(pages))
    }

    fn extract_metadata(&self, source: &SourceFile) -> Result<ExtractedMetadata> {
        let doc = Self::load(source)?;
        let pages = doc.get_pages();

        let sample_text = pages
            .keys()
            .next()
            .map(|&first| truncate_sample(&page_text(&doc, first), self.config.pdf_sample_chars));

        Ok(ExtractedMetadata {
            format: FileFormat::Pdf,
            file_size: source.size(),
            row_count: None,
            column_count: None,
            columns: Vec::new(),
            dtypes: BTreeMap::new(),
            column_types: BTreeMap::new(),
            memory_usage: None,
            sample: Vec::new(),
            details: FormatDetails::Pdf {
                page_count: pages.len(),
                document_info: document_info(&doc),
                sample_text,
            },
        })
    }

    fn validate(&self, source: &SourceFile) -> ValidationResult {
        let doc = match Self::load(source) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("PDF '{}' could not be parsed: {}", source.id(), e);
                return ValidationResult::invalid(format!("Invalid PDF file: {e}"));
            }
        };

        let pages = doc.get_pages();
        if pages.is_empty() {
            return ValidationResult::invalid("PDF has no pages");
        }

        let has_text = pages
            .keys()
            .take(self.config.pdf_probe_pages)
            .any(|&page_number| !page_text(&doc, page_number).trim().is_empty());

        if has_text {
            ValidationResult::valid("Valid PDF file")
        } else {
            warn!("PDF '{}' has no extractable text", source.id());
            ValidationResult::valid("Valid PDF file").with_warning(NO_TEXT_WARNING)
        }
    }
}
