//! Integration tests for the intake library.
//!
//! These tests drive processors, handlers and converters end to end through
//! the public API, with fixtures generated on the fly.

use lex_intake::converters::io::{read_table, write_csv};
use lex_intake::handlers::NO_TEXT_WARNING;
use lex_intake::{
    CompositeConverter, ConvertOptions, Converter, CsvConverter, DataQualityChecker, ExcelConverter,
    FileFormat, FileRecord, FileStatus, FormatDetails, MemoryRecordStore, ParquetConverter,
    ProcessorConfig, ProcessorFactory, RecordStore, SourceFile, get_converter, get_processor,
};
use lopdf::{Document, Object, Stream, dictionary};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

fn customers_csv(dir: &TempDir) -> PathBuf {
    write_fixture(
        dir,
        "customers.csv",
        "id,name,age,city\n\
         1,Ada,36,London\n\
         2,Grace,45,New York\n\
         3,Linus,28,Helsinki\n\
         4,Margaret,33,Boston\n",
    )
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// A PDF whose pages carry no content stream operations.
fn textless_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..page_count)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("Failed to serialize PDF");
    buf
}

fn store_for(source: &SourceFile) -> MemoryRecordStore {
    let store = MemoryRecordStore::new();
    store.insert(FileRecord::new(source.id(), source.name(), source.format()));
    store
}

// ============================================================================
// Conversion Round Trips
// ============================================================================

#[test]
fn test_csv_excel_csv_round_trip() {
    let dir = TempDir::new().unwrap();
    let source = customers_csv(&dir);
    let original = read_table(&source, FileFormat::Csv, None).unwrap();

    let xlsx = CsvConverter
        .convert(&source, FileFormat::Excel, &ConvertOptions::default())
        .expect("CSV to Excel failed");
    assert_eq!(xlsx, dir.path().join("customers.xlsx"));

    let back_path = dir.path().join("back").join("customers.csv");
    let back = ExcelConverter
        .convert(
            &xlsx,
            FileFormat::Csv,
            &ConvertOptions::default().with_output_path(&back_path),
        )
        .expect("Excel to CSV failed");

    let restored = read_table(&back, FileFormat::Csv, None).unwrap();
    assert_eq!(restored.height(), original.height());
    assert_eq!(column_names(&restored), column_names(&original));
}

#[test]
fn test_csv_parquet_csv_round_trip() {
    let dir = TempDir::new().unwrap();
    let source = customers_csv(&dir);
    let original = read_table(&source, FileFormat::Csv, None).unwrap();

    let chain = CompositeConverter::new()
        .then(Box::new(CsvConverter), Some(FileFormat::Parquet))
        .then(Box::new(ParquetConverter), None);
    let out = dir.path().join("customers_roundtrip.csv");
    let back = chain
        .convert(
            &source,
            FileFormat::Csv,
            &ConvertOptions::default().with_output_path(&out),
        )
        .expect("CSV -> Parquet -> CSV failed");

    assert!(dir.path().join("customers.parquet").exists());
    let restored = read_table(&back, FileFormat::Csv, None).unwrap();
    assert_eq!(restored.height(), original.height());
    assert_eq!(column_names(&restored), column_names(&original));
    assert!(restored.equals_missing(&original));
}

#[test]
fn test_unsupported_conversions() {
    let dir = TempDir::new().unwrap();
    let source = customers_csv(&dir);

    assert!(get_converter("pdf").is_none());
    assert!(get_converter("docx").is_none());
    let csv = get_converter("csv").unwrap();
    assert!(
        csv.convert(&source, FileFormat::Csv, &ConvertOptions::default())
            .is_none()
    );
    assert!(!dir.path().join("customers.csv.csv").exists());
}

// ============================================================================
// Factory
// ============================================================================

#[test]
fn test_xlsx_resolves_to_excel_processor() {
    let by_extension = get_processor("xlsx").unwrap();
    let by_type = get_processor("excel").unwrap();
    assert_eq!(by_extension.format(), by_type.format());
    assert_eq!(by_extension.format(), FileFormat::Excel);
    assert!(get_processor("docx").is_none());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_header_only_csv_is_invalid() {
    let source = SourceFile::new("h", "header.csv", FileFormat::Csv, b"a,b,c\n".to_vec());
    let result = get_processor("csv").unwrap().validate(&source);
    assert!(!result.is_valid);
    assert_eq!(result.message, "CSV file is empty");
}

#[test]
fn test_inconsistent_row_is_reported() {
    let source = SourceFile::new(
        "r",
        "ragged.csv",
        FileFormat::Csv,
        b"a,b,c\n1,2,3\n4,5\n6,7,8\n".to_vec(),
    );
    let result = get_processor("csv").unwrap().validate(&source);
    assert!(!result.is_valid);
    assert!(result.message.contains("rows: 3"), "{}", result.message);
}

#[test]
fn test_textless_pdf_is_valid_with_warning() {
    let source = SourceFile::new("scan", "scan.pdf", FileFormat::Pdf, textless_pdf(3));
    let result = get_processor("pdf").unwrap().validate(&source);
    assert!(result.is_valid, "{}", result.message);
    assert_eq!(result.warnings, vec![NO_TEXT_WARNING.to_string()]);
}

// ============================================================================
// Quality
// ============================================================================

#[test]
fn test_clean_table_is_fully_suitable() {
    let ids: Vec<i64> = (0..100).collect();
    let scores: Vec<f64> = (0..100).map(|i| 50.0 + (i % 10) as f64).collect();
    let df = df!["id" => ids, "score" => scores].unwrap();

    let report = DataQualityChecker::new().check_quality(&df).unwrap();
    assert_eq!(report.quality_score, 100.0);
    assert!(report.suitable_for_ml);
    assert!(report.suitable_for_visualization);
    assert!(report.suggestions.is_empty());
}

// ============================================================================
// End-to-End Processing
// ============================================================================

#[test]
fn test_process_csv_updates_record() {
    let dir = TempDir::new().unwrap();
    let source = SourceFile::from_path(customers_csv(&dir)).unwrap();
    let store = store_for(&source);

    let outcome = get_processor("csv").unwrap().process(&source, &store);
    assert!(outcome.is_processed(), "{:?}", outcome.error);

    let record = store.get(source.id()).unwrap();
    assert_eq!(record.status, FileStatus::Processed);
    assert!(record.error_message.is_none());

    let metadata = record.metadata.expect("metadata persisted");
    assert_eq!(metadata.row_count, Some(4));
    assert_eq!(metadata.columns, vec!["id", "name", "age", "city"]);
    assert!(matches!(
        metadata.details,
        FormatDetails::Csv { delimiter: ',', .. }
    ));

    let quality = record.quality.expect("quality persisted");
    assert_eq!(quality.row_count, 4);
    assert_eq!(outcome.quality, Some(quality));
}

#[test]
fn test_process_parquet_writes_normalized_csv() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("normalized");

    let mut df = df!["sku" => ["a", "b"], "qty" => [3i64, 7]].unwrap();
    let parquet_path = dir.path().join("stock.parquet");
    lex_intake::converters::io::write_parquet(&mut df, &parquet_path).unwrap();

    let config = ProcessorConfig::builder().output_dir(&out_dir).build().unwrap();
    let factory = ProcessorFactory::new(config);
    let source = SourceFile::from_path(&parquet_path).unwrap();
    let store = store_for(&source);

    let outcome = factory.for_source(&source).process(&source, &store);
    assert!(outcome.is_processed(), "{:?}", outcome.error);

    let expected = out_dir.join("stock.csv");
    assert_eq!(outcome.processed_file.as_deref(), Some(expected.as_path()));
    assert_eq!(
        store.get(source.id()).unwrap().processed_file,
        Some(expected.clone())
    );
    assert_eq!(
        std::fs::read_to_string(&expected).unwrap(),
        "sku,qty\na,3\nb,7\n"
    );
}

#[test]
fn test_process_invalid_file_marks_failed() {
    let source = SourceFile::new("e", "empty.csv", FileFormat::Csv, Vec::<u8>::new());
    let store = store_for(&source);

    let processed = get_processor("csv").unwrap().process_record(&source, &store);
    assert!(!processed);

    let record = store.get("e").unwrap();
    assert_eq!(record.status, FileStatus::Failed);
    assert_eq!(record.error_message.as_deref(), Some("CSV file is empty"));
    assert!(record.metadata.is_none());
}

#[test]
fn test_excel_sheet_read_after_csv_export() {
    let dir = TempDir::new().unwrap();
    let mut df = df!["k" => ["x", "y", "z"], "v" => [1.5f64, 2.5, 3.5]].unwrap();
    let csv_path = dir.path().join("kv.csv");
    write_csv(&mut df, &csv_path).unwrap();

    let xlsx = CsvConverter
        .convert(
            &csv_path,
            FileFormat::Excel,
            &ConvertOptions::default().with_excel_sheet_name("Values"),
        )
        .unwrap();

    let sheet = read_table(&xlsx, FileFormat::Excel, Some("Values")).unwrap();
    assert_eq!(sheet.shape(), (3, 2));
    assert!(read_table(Path::new(&xlsx), FileFormat::Excel, Some("Missing")).is_err());
}
