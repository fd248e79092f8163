//! CLI entry point for the file intake library.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use lex_intake::{
    ConvertOptions, DataQualityChecker, ExtractedMetadata, FileFormat, FileRecord, FormatDetails,
    MemoryRecordStore, ProcessingOutcome, ProcessorConfig, ProcessorFactory, QualityReport,
    SourceFile, ValidationResult, get_converter,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// CLI-compatible file format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    /// Comma/semicolon/tab/pipe separated values
    Csv,
    /// Excel workbook (.xls, .xlsx, .xlsm)
    Excel,
    /// Apache Parquet
    Parquet,
    /// PDF document
    Pdf,
}

impl From<CliFormat> for FileFormat {
    fn from(cli: CliFormat) -> Self {
        match cli {
            CliFormat::Csv => FileFormat::Csv,
            CliFormat::Excel => FileFormat::Excel,
            CliFormat::Parquet => FileFormat::Parquet,
            CliFormat::Pdf => FileFormat::Pdf,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Validate, profile and convert uploaded data files",
    long_about = "Validates CSV, Excel, Parquet and PDF files, extracts metadata, \
                  scores data quality and converts between tabular formats.\n\n\
                  EXAMPLES:\n  \
                  # Full processing run with a normalized copy\n  \
                  lex-intake process sales.xlsx --output-dir normalized/\n\n  \
                  # Quality report as JSON\n  \
                  lex-intake --json quality sales.csv\n\n  \
                  # Convert CSV to Parquet\n  \
                  lex-intake convert sales.csv --to parquet"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs so stdout only carries the JSON document.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full processing state machine on a file
    Process {
        /// File to process
        input: PathBuf,

        /// Declared file type; inferred from the extension when omitted
        #[arg(short = 't', long = "type", value_enum)]
        file_type: Option<CliFormat>,

        /// Directory for normalized copies (CSV for Excel/Parquet, text for PDF)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Skip the data quality report
        #[arg(long)]
        no_quality: bool,

        /// Number of sample rows attached to metadata (1 - 5)
        #[arg(long, default_value = "5")]
        sample_rows: usize,
    },

    /// Check a file's structure
    Validate {
        input: PathBuf,

        #[arg(short = 't', long = "type", value_enum)]
        file_type: Option<CliFormat>,
    },

    /// Extract structural metadata
    Metadata {
        input: PathBuf,

        #[arg(short = 't', long = "type", value_enum)]
        file_type: Option<CliFormat>,
    },

    /// Score data quality of a tabular file
    Quality {
        input: PathBuf,

        #[arg(short = 't', long = "type", value_enum)]
        file_type: Option<CliFormat>,
    },

    /// Convert a tabular file to another format
    Convert {
        input: PathBuf,

        /// Target format
        #[arg(long, value_enum)]
        to: CliFormat,

        /// Output path; defaults to the input path with the target's extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Excel sheet to read (first sheet when omitted)
        #[arg(long)]
        sheet: Option<String>,

        /// Sheet name used when writing Excel output
        #[arg(long)]
        excel_sheet_name: Option<String>,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    match &args.command {
        Command::Process {
            input,
            file_type,
            output_dir,
            no_quality,
            sample_rows,
        } => {
            let mut builder = ProcessorConfig::builder()
                .sample_rows(*sample_rows)
                .compute_quality(!no_quality);
            if let Some(dir) = output_dir {
                builder = builder.output_dir(dir);
            }
            let factory = ProcessorFactory::new(builder.build()?);
            run_process(&factory, input, *file_type, args.json)
        }
        Command::Validate { input, file_type } => {
            let source = load_source(input, *file_type)?;
            let processor = ProcessorFactory::default().for_source(&source);
            let result = processor.validate(&source);
            emit(args.json, &result, print_validation)?;
            if result.is_valid {
                Ok(())
            } else {
                Err(anyhow!("{}", result.message))
            }
        }
        Command::Metadata { input, file_type } => {
            let source = load_source(input, *file_type)?;
            let processor = ProcessorFactory::default().for_source(&source);
            let metadata = processor
                .extract_metadata(&source)
                .ok_or_else(|| anyhow!("Could not extract metadata from {}", input.display()))?;
            emit(args.json, &metadata, print_metadata)
        }
        Command::Quality { input, file_type } => {
            let source = load_source(input, *file_type)?;
            if !source.format().is_tabular() {
                return Err(anyhow!(
                    "Quality checks need a tabular file, got {}",
                    source.format().display_name()
                ));
            }
            let processor = ProcessorFactory::default().for_source(&source);
            let df = processor.handler().read_data(&source)?.into_table()?;
            let report = DataQualityChecker::new().check_quality(&df)?;
            emit(args.json, &report, print_quality)
        }
        Command::Convert {
            input,
            to,
            output,
            sheet,
            excel_sheet_name,
        } => run_convert(
            input,
            (*to).into(),
            output.clone(),
            sheet.clone(),
            excel_sheet_name.clone(),
            args.json,
        ),
    }
}

/// Load a file, honouring an explicit type over the extension.
fn load_source(input: &Path, file_type: Option<CliFormat>) -> Result<SourceFile> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }
    let source = match file_type {
        Some(format) => SourceFile::from_path_as(input, format.into())?,
        None => SourceFile::from_path(input)?,
    };
    info!(
        "Loaded {} ({} bytes) as {}",
        input.display(),
        source.size(),
        source.format()
    );
    Ok(source)
}

fn run_process(
    factory: &ProcessorFactory,
    input: &Path,
    file_type: Option<CliFormat>,
    json: bool,
) -> Result<()> {
    let source = load_source(input, file_type)?;
    let processor = factory.for_source(&source);

    let store = MemoryRecordStore::new();
    store.insert(FileRecord::new(source.id(), source.name(), source.format()));

    let outcome = processor.process(&source, &store);
    emit(json, &outcome, print_outcome)?;

    match outcome.error {
        Some(error) => Err(anyhow!("Processing failed: {error}")),
        None => Ok(()),
    }
}

fn run_convert(
    input: &Path,
    target: FileFormat,
    output: Option<PathBuf>,
    sheet: Option<String>,
    excel_sheet_name: Option<String>,
    json: bool,
) -> Result<()> {
    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .with_context(|| format!("Cannot infer file type of {}", input.display()))?;
    let converter = get_converter(extension)
        .ok_or_else(|| anyhow!("No converter for .{} files", extension))?;

    let mut options = ConvertOptions::default();
    if let Some(path) = output {
        options = options.with_output_path(path);
    }
    if let Some(name) = sheet {
        options = options.with_sheet_name(name);
    }
    if let Some(name) = excel_sheet_name {
        options = options.with_excel_sheet_name(name);
    }

    let written = converter.try_convert(input, target, &options)?;
    if json {
        println!("{}", serde_json::json!({ "output": written }));
    } else {
        println!("Converted {} -> {}", input.display(), written.display());
    }
    Ok(())
}

/// Print `value` as pretty JSON or through the human-readable printer.
fn emit<T: Serialize>(json: bool, value: &T, human: fn(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

// ============================================================================
// Human-readable output
//
// These use `println!` intentionally: this is the command's result, not a log.
// ============================================================================

fn section(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(40));
}

fn print_validation(result: &ValidationResult) {
    let status = if result.is_valid { "VALID" } else { "INVALID" };
    println!("{status}: {}", result.message);
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
}

fn print_metadata(metadata: &ExtractedMetadata) {
    section("FILE METADATA");
    println!("  Format: {}", metadata.format.display_name());
    println!("  Size: {} bytes", metadata.file_size);
    if let Some(rows) = metadata.row_count {
        println!("  Rows: {rows}");
    }
    if let Some(columns) = metadata.column_count {
        println!("  Columns: {columns}");
    }
    if let Some(memory) = metadata.memory_usage {
        println!("  Memory (est.): {memory} bytes");
    }

    if !metadata.columns.is_empty() {
        section("COLUMNS");
        println!("{:<24} {:<14} {:<10}", "Column", "Dtype", "Kind");
        for column in &metadata.columns {
            let dtype = metadata.dtypes.get(column).map_or("-", String::as_str);
            let kind = metadata
                .column_types
                .get(column)
                .map_or("-", |kind| kind.as_str());
            println!("{:<24} {:<14} {:<10}", truncate_str(column, 23), dtype, kind);
        }
    }

    match &metadata.details {
        FormatDetails::Csv {
            delimiter,
            line_count,
        } => {
            println!("\n  Delimiter: {delimiter:?}");
            println!("  Data lines: {line_count}");
        }
        FormatDetails::Excel { sheets, .. } => {
            section("SHEETS");
            for sheet in sheets {
                println!(
                    "  {} ({} rows x {} columns)",
                    sheet.name, sheet.row_count, sheet.column_count
                );
            }
        }
        FormatDetails::Parquet { sampled_rows } => {
            println!("\n  Rows sampled for memory estimate: {sampled_rows}");
        }
        FormatDetails::Pdf {
            page_count,
            document_info,
            sample_text,
        } => {
            println!("  Pages: {page_count}");
            for (key, value) in document_info {
                println!("  {key}: {value}");
            }
            if let Some(text) = sample_text {
                section("FIRST PAGE SAMPLE");
                println!("{text}");
            }
        }
    }
}

fn print_quality(report: &QualityReport) {
    section("DATA QUALITY");
    println!("  Rows: {}", report.row_count);
    println!("  Columns: {}", report.column_count);
    println!("  Score: {:.1}/100", report.quality_score);
    println!(
        "  Missing: {:.1}% of cells",
        report.missing.total_missing_percentage
    );
    println!(
        "  Duplicates: {} rows ({:.1}%)",
        report.duplicates.count, report.duplicates.percentage
    );
    println!("  Suitable for ML: {}", yes_no(report.suitable_for_ml));
    println!(
        "  Suitable for visualization: {}",
        yes_no(report.suitable_for_visualization)
    );

    let flagged: Vec<_> = report.outliers.iter().filter(|o| o.count > 0).collect();
    if !flagged.is_empty() {
        section("OUTLIERS");
        for outliers in flagged {
            println!(
                "  {:<24} {} ({:.1}%) outside [{:.3}, {:.3}]",
                truncate_str(&outliers.column, 23),
                outliers.count,
                outliers.percentage,
                outliers.lower_bound,
                outliers.upper_bound
            );
        }
    }

    if !report.suggestions.is_empty() {
        section("SUGGESTIONS");
        for suggestion in &report.suggestions {
            println!("  - {suggestion}");
        }
    }
}

fn print_outcome(outcome: &ProcessingOutcome) {
    println!(
        "Record {}: {} in {} ms",
        outcome.record_id, outcome.final_status, outcome.duration_ms
    );
    for warning in &outcome.warnings {
        println!("  warning: {warning}");
    }
    if let Some(error) = &outcome.error {
        println!("  error: {error}");
    }
    if let Some(metadata) = &outcome.metadata {
        print_metadata(metadata);
    }
    if let Some(quality) = &outcome.quality {
        print_quality(quality);
    }
    if let Some(path) = &outcome.processed_file {
        println!("\nNormalized copy: {}", path.display());
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
