//! Caller-side file records and field-isolated persistence.

use crate::error::{IntakeError, Result};
use crate::types::{
    ColumnStatistics, ExtractedMetadata, FileFormat, FileStatus, QualityReport,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// A file as tracked by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub file_type: FileFormat,
    pub status: FileStatus,
    pub metadata: Option<ExtractedMetadata>,
    pub statistics: Option<Vec<ColumnStatistics>>,
    pub quality: Option<QualityReport>,
    pub processed_file: Option<PathBuf>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// A fresh `pending` record.
    pub fn new(id: impl Into<String>, name: impl Into<String>, file_type: FileFormat) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_type,
            status: FileStatus::Pending,
            metadata: None,
            statistics: None,
            quality: None,
            processed_file: None,
            error_message: None,
            updated_at: Utc::now(),
        }
    }
}

/// A write touching exactly one field of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Status(FileStatus),
    Metadata(ExtractedMetadata),
    Statistics(Vec<ColumnStatistics>),
    Quality(QualityReport),
    ProcessedFile(PathBuf),
    ErrorMessage(String),
}

impl FieldUpdate {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Metadata(_) => "metadata",
            Self::Statistics(_) => "statistics",
            Self::Quality(_) => "quality",
            Self::ProcessedFile(_) => "processed_file",
            Self::ErrorMessage(_) => "error_message",
        }
    }

    /// Write this field into `record`, leaving every other field alone.
    ///
    /// Status writes must be legal transitions from the stored status.
    pub fn apply_to(self, record: &mut FileRecord) -> Result<()> {
        match self {
            Self::Status(next) => record.status = record.status.transition(next)?,
            Self::Metadata(metadata) => record.metadata = Some(metadata),
            Self::Statistics(statistics) => record.statistics = Some(statistics),
            Self::Quality(quality) => record.quality = Some(quality),
            Self::ProcessedFile(path) => record.processed_file = Some(path),
            Self::ErrorMessage(message) => record.error_message = Some(message),
        }
        record.updated_at = Utc::now();
        Ok(())
    }
}

/// Persistence seam used by processors.
///
/// Implementations must apply each update as an isolated single-field write
/// so concurrent writers of different fields do not clobber each other.
pub trait RecordStore: Send + Sync {
    fn apply(&self, record_id: &str, update: FieldUpdate) -> Result<()>;

    fn get(&self, record_id: &str) -> Option<FileRecord>;
}

/// In-memory store keyed by record id.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, FileRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: FileRecord) {
        self.records.write().insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn apply(&self, record_id: &str, update: FieldUpdate) -> Result<()> {
        let field = update.field_name();
        let mut records = self.records.write();
        let record = records
            .get_mut(record_id)
            .ok_or_else(|| IntakeError::RecordNotFound(record_id.to_string()))?;
        update.apply_to(record)?;
        debug!("Record '{}': updated {}", record_id, field);
        Ok(())
    }

    fn get(&self, record_id: &str) -> Option<FileRecord> {
        self.records.read().get(record_id).cloned()
    }
}

static_assertions::assert_impl_all!(MemoryRecordStore: Send, Sync);
