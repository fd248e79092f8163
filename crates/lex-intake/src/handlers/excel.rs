//! Excel handler backed by calamine.
//!
//! The first row of a sheet is its header. Column types are inferred from
//! the cells: integral numbers become `Int64`, other numbers `Float64`,
//! booleans `Boolean`, date-formatted cells `Datetime` and anything mixed
//! falls back to `String`.

use super::{FormatHandler, HandlerData, tabular_metadata};
use crate::config::ProcessorConfig;
use crate::error::{IntakeError, Result};
use crate::types::{
    ExtractedMetadata, FileFormat, FormatDetails, SheetInfo, SourceFile, ValidationResult,
};
use crate::utils::dedupe_headers;
use calamine::{Data, DataType as _, Range, Reader, Sheets, open_workbook_auto_from_rs};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::io::Cursor;
use tracing::{debug, warn};

const EMPTY_MESSAGE: &str = "Excel file is empty";

type Workbook = Sheets<Cursor<Vec<u8>>>;

/// Handler for `.xls`, `.xlsx` and `.xlsm` workbooks.
#[derive(Debug, Clone, Default)]
pub struct ExcelHandler {
    config: ProcessorConfig,
}

impl ExcelHandler {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    fn open(&self, source: &SourceFile) -> Result<Workbook> {
        Ok(open_workbook_auto_from_rs(Cursor::new(
            source.bytes().to_vec(),
        ))?)
    }

    /// Read one sheet into a DataFrame. `None` selects the first sheet.
    pub fn read_sheet(&self, source: &SourceFile, sheet: Option<&str>) -> Result<DataFrame> {
        let mut workbook = self.open(source)?;
        let name = match sheet {
            Some(name) => name.to_string(),
            None => first_sheet_name(&workbook)?,
        };

        debug!("Reading sheet '{}' from '{}'", name, source.id());
        let range = workbook.worksheet_range(&name)?;
        range_to_frame(&range)
    }
}

fn first_sheet_name(workbook: &Workbook) -> Result<String> {
    workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IntakeError::EmptyFile(EMPTY_MESSAGE.to_string()))
}

/// Data rows below the header of a sheet range.
fn data_row_count(range: &Range<Data>) -> usize {
    range.height().saturating_sub(1)
}

/// Build a DataFrame from a sheet, using the first row as header.
pub(crate) fn range_to_frame(range: &Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(IntakeError::EmptyFile(EMPTY_MESSAGE.to_string()));
    };

    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();
    let headers = dedupe_headers(&headers);
    let body: Vec<&[Data]> = rows.collect();
    if body.is_empty() {
        return Err(IntakeError::EmptyFile(EMPTY_MESSAGE.to_string()));
    }

    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            build_column(name, &cells)
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

fn infer_kind(cells: &[&Data]) -> CellKind {
    let mut kind: Option<CellKind> = None;
    for cell in cells {
        let cell_kind = match cell {
            Data::Empty | Data::Error(_) => continue,
            Data::Int(_) => CellKind::Int,
            Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::Bool(_) => CellKind::Bool,
            Data::DateTime(_) | Data::DateTimeIso(_) => CellKind::DateTime,
            _ => CellKind::Text,
        };
        kind = Some(match (kind, cell_kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(CellKind::Int), CellKind::Float) | (Some(CellKind::Float), CellKind::Int) => {
                CellKind::Float
            }
            _ => return CellKind::Text,
        });
    }
    kind.unwrap_or(CellKind::Text)
}

fn build_column(name: &str, cells: &[&Data]) -> Column {
    match infer_kind(cells) {
        CellKind::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(v) => Some(*v),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(v) => Some(*v as f64),
                    Data::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::DateTime => {
            let values: Vec<Option<NaiveDateTime>> =
                cells.iter().map(|cell| cell.as_datetime()).collect();
            Column::new(name.into(), values)
        }
        CellKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Empty | Data::Error(_) => None,
                    other => Some(cell_to_string(other)),
                })
                .collect();
            Column::new(name.into(), values)
        }
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map_or_else(|| cell.to_string(), |dt| dt.to_string()),
        other => other.to_string(),
    }
}

impl FormatHandler for ExcelHandler {
    fn format(&self) -> FileFormat {
        FileFormat::Excel
    }

    fn read_data(&self, source: &SourceFile) -> Result<HandlerData> {
        Ok(HandlerData::Table(self.read_sheet(source, None)?))
    }

    fn extract_metadata(&self, source: &SourceFile) -> Result<ExtractedMetadata> {
        let mut workbook = self.open(source)?;
        let sheet_names = workbook.sheet_names();
        let first = first_sheet_name(&workbook)?;

        let mut sheets = Vec::with_capacity(sheet_names.len());
        let mut df = None;
        for name in &sheet_names {
            let range = workbook.worksheet_range(name)?;
            sheets.push(SheetInfo {
                name: name.clone(),
                row_count: data_row_count(&range),
                column_count: range.width(),
            });
            if *name == first {
                df = Some(range_to_frame(&range)?);
            }
        }

        let df = df.ok_or_else(|| IntakeError::EmptyFile(EMPTY_MESSAGE.to_string()))?;
        tabular_metadata(
            source,
            &df,
            df.height(),
            df.estimated_size(),
            self.config.sample_rows,
            FormatDetails::Excel {
                sheet_count: sheet_names.len(),
                sheet_names,
                sheets,
            },
        )
    }

    fn validate(&self, source: &SourceFile) -> ValidationResult {
        let checked = self.open(source).and_then(|mut workbook| {
            let first = first_sheet_name(&workbook)?;
            Ok(workbook.worksheet_range(&first)?)
        });

        match checked {
            Ok(range) if data_row_count(&range) == 0 => ValidationResult::invalid(EMPTY_MESSAGE),
            Ok(_) => ValidationResult::valid("Valid Excel file"),
            Err(IntakeError::EmptyFile(message)) => ValidationResult::invalid(message),
            Err(e) => {
                warn!("Excel '{}' could not be opened: {}", source.id(), e);
                ValidationResult::invalid(format!("Invalid Excel file: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{DtypeCategory, naive_datetime};
    use chrono::NaiveDate;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook as XlsxWorkbook};

    fn xlsx_source(bytes: Vec<u8>) -> SourceFile {
        SourceFile::new("book", "book.xlsx", FileFormat::Excel, bytes)
    }

    fn sales_workbook() -> Vec<u8> {
        let mut workbook = XlsxWorkbook::new();

        let sales = workbook.add_worksheet();
        sales.set_name("Sales").unwrap();
        sales.write_string(0, 0, "region").unwrap();
        sales.write_string(0, 1, "units").unwrap();
        sales.write_string(0, 2, "price").unwrap();
        sales.write_string(0, 3, "active").unwrap();
        let rows = [("north", 10, 2.5, true), ("south", 7, 3.25, false), ("east", 3, 1.0, true)];
        for (i, (region, units, price, active)) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            sales.write_string(row, 0, *region).unwrap();
            sales.write_number(row, 1, *units).unwrap();
            sales.write_number(row, 2, *price).unwrap();
            sales.write_boolean(row, 3, *active).unwrap();
        }

        let notes = workbook.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "note").unwrap();
        notes.write_string(1, 0, "checked").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_validate_valid_workbook() {
        let handler = ExcelHandler::default();
        let result = handler.validate(&xlsx_source(sales_workbook()));
        assert!(result.is_valid, "{}", result.message);
        assert_eq!(result.message, "Valid Excel file");
    }

    #[test]
    fn test_validate_header_only_sheet_is_empty() {
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "id").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let result = ExcelHandler::default().validate(&xlsx_source(bytes));
        assert!(!result.is_valid);
        assert_eq!(result.message, "Excel file is empty");
    }

    #[test]
    fn test_validate_garbage_is_invalid() {
        let source = xlsx_source(b"definitely not a workbook".to_vec());
        let result = ExcelHandler::default().validate(&source);
        assert!(!result.is_valid);
        assert!(result.message.starts_with("Invalid Excel file"));
    }

    #[test]
    fn test_read_sheet_infers_column_types() {
        let handler = ExcelHandler::default();
        let df = handler
            .read_sheet(&xlsx_source(sales_workbook()), None)
            .unwrap();

        assert_eq!(df.shape(), (3, 4));
        assert_eq!(df.column("region").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("units").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("price").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("active").unwrap().dtype(), &DataType::Boolean);
    }

    #[test]
    fn test_read_named_sheet() {
        let handler = ExcelHandler::default();
        let df = handler
            .read_sheet(&xlsx_source(sales_workbook()), Some("Notes"))
            .unwrap();
        assert_eq!(df.shape(), (1, 1));
        assert!(handler
            .read_sheet(&xlsx_source(sales_workbook()), Some("Missing"))
            .is_err());
    }

    #[test]
    fn test_metadata_lists_sheets() {
        let handler = ExcelHandler::default();
        let metadata = handler.get_metadata(&xlsx_source(sales_workbook())).unwrap();

        assert_eq!(metadata.row_count, Some(3));
        assert_eq!(metadata.column_count, Some(4));
        assert_eq!(metadata.sample.len(), 3);
        match metadata.details {
            FormatDetails::Excel {
                sheet_count,
                sheet_names,
                sheets,
            } => {
                assert_eq!(sheet_count, 2);
                assert_eq!(sheet_names, vec!["Sales", "Notes"]);
                assert_eq!(sheets[0].row_count, 3);
                assert_eq!(sheets[0].column_count, 4);
                assert_eq!(sheets[1].row_count, 1);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_infer_kind_mixed_numbers_and_text() {
        let int = Data::Float(3.0);
        let float = Data::Float(0.5);
        let text = Data::String("n/a".to_string());
        let empty = Data::Empty;

        assert_eq!(infer_kind(&[&int, &empty]), CellKind::Int);
        assert_eq!(infer_kind(&[&int, &float]), CellKind::Float);
        assert_eq!(infer_kind(&[&int, &text]), CellKind::Text);
        assert_eq!(infer_kind(&[&empty]), CellKind::Text);
    }

    #[test]
    fn test_blank_headers_are_named() {
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "value").unwrap();
        sheet.write_string(0, 2, "value").unwrap();
        sheet.write_number(1, 0, 1).unwrap();
        sheet.write_number(1, 1, 2).unwrap();
        sheet.write_number(1, 2, 3).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let df = ExcelHandler::default()
            .read_sheet(&xlsx_source(bytes), None)
            .unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, vec!["value", "column_2", "value_1"]);
    }

    fn dated_workbook() -> Vec<u8> {
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_string(0, 0, "n").unwrap();
        sheet.write_string(0, 1, "when").unwrap();
        for day in 1..=3u8 {
            let row = u32::from(day);
            sheet.write_number(row, 0, f64::from(day)).unwrap();
            let date = ExcelDateTime::from_ymd(2024, 1, day).unwrap();
            sheet
                .write_datetime_with_format(row, 1, &date, &date_format)
                .unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_date_cells_become_datetime_column() {
        let source = xlsx_source(dated_workbook());
        let handler = ExcelHandler::default();

        let df = handler.read_sheet(&source, None).unwrap();
        let when = df.column("when").unwrap();
        assert!(matches!(when.dtype(), DataType::Datetime(_, None)));
        match when.get(2).unwrap() {
            AnyValue::Datetime(value, unit, _) => assert_eq!(
                naive_datetime(value, unit),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(0, 0, 0)
            ),
            other => panic!("unexpected value: {other:?}"),
        }

        let metadata = handler.get_metadata(&source).unwrap();
        assert_eq!(
            metadata.column_types.get("when"),
            Some(&DtypeCategory::Datetime)
        );
        assert_eq!(
            metadata.column_types.get("n"),
            Some(&DtypeCategory::Numeric)
        );
    }
}
