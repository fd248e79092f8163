//! Per-file processing state machine.
//!
//! A [`Processor`] drives one file through
//! `pending -> processing -> {processed | failed}`:
//!
//! 1. Mark the record `processing`.
//! 2. Validate. An invalid file is marked `failed` and nothing else runs.
//! 3. Extract metadata (best effort) and persist it when present.
//! 4. Transform: statistics and quality for tables, normalized copies when
//!    an output directory is configured.
//! 5. Mark the record `processed`.
//!
//! Every write goes through [`RecordStore::apply`] as a single-field update.

mod factory;
mod store;

pub use factory::{ProcessorFactory, get_processor};
pub use store::{FieldUpdate, FileRecord, MemoryRecordStore, RecordStore};

use crate::config::ProcessorConfig;
use crate::converters::io::write_csv;
use crate::error::{IntakeError, Result, ResultExt};
use crate::handlers::{FormatHandler, HandlerData, handler_for};
use crate::quality::DataQualityChecker;
use crate::types::{
    ExtractedMetadata, FileFormat, FileStatus, PageTextMap, ProcessingOutcome, QualityReport,
    SourceFile, ValidationResult,
};
use polars::prelude::DataFrame;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives validation, metadata extraction and transformation for one format.
pub struct Processor {
    format: FileFormat,
    config: ProcessorConfig,
    handler: Box<dyn FormatHandler>,
    checker: DataQualityChecker,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("format", &self.format)
            .field("config", &self.config)
            .finish()
    }
}

/// Status tracking for one run; every step is persisted before it counts.
struct Run<'a> {
    record_id: &'a str,
    store: &'a dyn RecordStore,
    status: FileStatus,
}

impl Run<'_> {
    fn advance(&mut self, next: FileStatus) -> Result<()> {
        let next = self.status.transition(next)?;
        self.store
            .apply(self.record_id, FieldUpdate::Status(next))
            .context(format!("Persisting status '{next}'"))?;
        self.status = next;
        Ok(())
    }

    fn write(&self, update: FieldUpdate) -> Result<()> {
        let field = update.field_name();
        self.store
            .apply(self.record_id, update)
            .context(format!("Persisting {field}"))
    }
}

impl Processor {
    pub fn new(format: FileFormat, config: ProcessorConfig) -> Self {
        Self {
            format,
            handler: handler_for(format, &config),
            config,
            checker: DataQualityChecker::new(),
        }
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn handler(&self) -> &dyn FormatHandler {
        self.handler.as_ref()
    }

    /// Check the file name's extension, then the file's structure.
    pub fn validate(&self, source: &SourceFile) -> ValidationResult {
        if let Some(ext) = source.extension()
            && !self.format.extensions().contains(&ext.as_str())
        {
            let article = if self.format == FileFormat::Excel {
                "an"
            } else {
                "a"
            };
            return ValidationResult::invalid(format!(
                "File is not {article} {} file",
                self.format.display_name()
            ));
        }

        self.handler.validate(source)
    }

    /// Best-effort metadata; handler errors are logged and yield `None`.
    pub fn extract_metadata(&self, source: &SourceFile) -> Option<ExtractedMetadata> {
        self.handler.get_metadata(source)
    }

    /// Score a table with this processor's checker.
    pub fn check_quality(&self, df: &DataFrame) -> Result<QualityReport> {
        self.checker.check_quality(df)
    }

    /// Process `source`, recording progress on the record with the same id.
    pub fn process(&self, source: &SourceFile, store: &dyn RecordStore) -> ProcessingOutcome {
        let started = Instant::now();
        let mut outcome = ProcessingOutcome {
            record_id: source.id().to_string(),
            final_status: FileStatus::Failed,
            metadata: None,
            statistics: None,
            quality: None,
            processed_file: None,
            warnings: Vec::new(),
            error: None,
            duration_ms: 0,
        };
        let mut run = Run {
            record_id: source.id(),
            store,
            status: FileStatus::Pending,
        };

        info!(
            "Processing {} file '{}'",
            self.format.display_name(),
            source.id()
        );

        match self.drive(source, &mut run, &mut outcome) {
            Ok(()) => {
                outcome.final_status = FileStatus::Processed;
                info!("File '{}' processed", source.id());
            }
            Err(e) => {
                error!(
                    "Error in {} processor for file '{}': {}",
                    self.format.display_name(),
                    source.id(),
                    e
                );
                outcome.error = Some(e.to_string());

                if run.status == FileStatus::Processing {
                    if let Err(persist) = run.write(FieldUpdate::ErrorMessage(e.to_string())) {
                        warn!("Could not record error for '{}': {}", source.id(), persist);
                    }
                    if let Err(persist) = run.advance(FileStatus::Failed) {
                        error!("Could not mark '{}' as failed: {}", source.id(), persist);
                    }
                }
            }
        }

        outcome.duration_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    /// Process and report whether the file ended up `processed`.
    pub fn process_record(&self, source: &SourceFile, store: &dyn RecordStore) -> bool {
        self.process(source, store).is_processed()
    }

    fn drive(
        &self,
        source: &SourceFile,
        run: &mut Run<'_>,
        outcome: &mut ProcessingOutcome,
    ) -> Result<()> {
        run.advance(FileStatus::Processing)?;
        self.run_steps(source, run, outcome)?;
        run.advance(FileStatus::Processed)
    }

    fn run_steps(
        &self,
        source: &SourceFile,
        run: &Run<'_>,
        outcome: &mut ProcessingOutcome,
    ) -> Result<()> {
        let validation = self.validate(source);
        outcome.warnings = validation.warnings.clone();
        for warning in &validation.warnings {
            warn!("File '{}': {}", source.id(), warning);
        }
        if !validation.is_valid {
            return Err(IntakeError::ValidationFailed(validation.message));
        }
        debug!("File '{}': {}", source.id(), validation.message);

        if let Some(metadata) = self.extract_metadata(source)
            && !metadata.is_empty()
        {
            run.write(FieldUpdate::Metadata(metadata.clone()))?;
            outcome.metadata = Some(metadata);
        }

        let data = self
            .handler
            .read_data(source)
            .context(format!("Reading {} file '{}'", self.format, source.id()))?;

        match data {
            HandlerData::Table(df) => self.transform_table(source, df, run, outcome),
            HandlerData::Pages(pages) => self.transform_pages(source, &pages, run, outcome),
        }
    }

    fn transform_table(
        &self,
        source: &SourceFile,
        mut df: DataFrame,
        run: &Run<'_>,
        outcome: &mut ProcessingOutcome,
    ) -> Result<()> {
        info!(
            "Transforming {} table '{}' ({} x {})",
            self.format,
            source.id(),
            df.height(),
            df.width()
        );

        let statistics = self.checker.describe(&df)?;
        run.write(FieldUpdate::Statistics(statistics.clone()))?;
        outcome.statistics = Some(statistics);

        if self.config.compute_quality {
            let report = self.checker.check_quality(&df)?;
            debug!(
                "File '{}' quality score {:.1}",
                source.id(),
                report.quality_score
            );
            run.write(FieldUpdate::Quality(report.clone()))?;
            outcome.quality = Some(report);
        }

        if self.format != FileFormat::Csv
            && let Some(dir) = &self.config.output_dir
        {
            let path = normalized_path(dir, source, "csv");
            write_csv(&mut df, &path)
                .context(format!("Writing normalized copy of '{}'", source.id()))?;
            run.write(FieldUpdate::ProcessedFile(path.clone()))?;
            outcome.processed_file = Some(path);
        }

        Ok(())
    }

    fn transform_pages(
        &self,
        source: &SourceFile,
        pages: &PageTextMap,
        run: &Run<'_>,
        outcome: &mut ProcessingOutcome,
    ) -> Result<()> {
        info!(
            "Extracted text from {} pages of '{}'",
            pages.len(),
            source.id()
        );

        let Some(dir) = &self.config.output_dir else {
            return Ok(());
        };

        let text = pages_to_text(pages);
        let path = normalized_path(dir, source, "txt");
        fs::create_dir_all(dir).context(format!("Creating {}", dir.display()))?;
        fs::write(&path, text).context(format!("Writing {}", path.display()))?;
        info!("Text saved: {}", path.display());

        run.write(FieldUpdate::ProcessedFile(path.clone()))?;
        outcome.processed_file = Some(path);
        Ok(())
    }
}

/// Page texts in page order, joined by single newlines.
fn pages_to_text(pages: &PageTextMap) -> String {
    pages.values().map(String::as_str).collect::<Vec<_>>().join("\n")
}

fn normalized_path(dir: &Path, source: &SourceFile, extension: &str) -> PathBuf {
    dir.join(format!("{}.{extension}", source.stem()))
}

static_assertions::assert_impl_all!(Processor: Send, Sync);
