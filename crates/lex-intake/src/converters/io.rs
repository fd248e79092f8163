//! Reading and writing whole tables on disk.

use crate::config::ProcessorConfig;
use crate::error::{IntakeError, Result, ResultExt};
use crate::handlers::{CsvHandler, ExcelHandler, FormatHandler, ParquetHandler};
use crate::types::{FileFormat, SourceFile};
use crate::utils::{is_numeric_dtype, naive_date, naive_datetime};
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

/// Read a table from disk, treating the file as `format`.
///
/// `sheet` selects an Excel sheet and is ignored for other formats.
pub fn read_table(path: &Path, format: FileFormat, sheet: Option<&str>) -> Result<DataFrame> {
    let source = SourceFile::from_path_as(path, format)?;
    let config = ProcessorConfig::default();

    match format {
        FileFormat::Csv => CsvHandler::new(config).read_data(&source)?.into_table(),
        FileFormat::Excel => ExcelHandler::new(config).read_sheet(&source, sheet),
        FileFormat::Parquet => ParquetHandler::new(config).read_data(&source)?.into_table(),
        FileFormat::Pdf => Err(IntakeError::UnsupportedConversion {
            from: format.to_string(),
            to: "table".to_string(),
        }),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context(format!("Creating {}", parent.display()))?;
    }
    Ok(())
}

/// Write a comma-separated file with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut file = File::create(path).context(format!("Creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;

    info!("Table saved: {}", path.display());
    Ok(())
}

pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).context(format!("Creating {}", path.display()))?;
    ParquetWriter::new(file).finish(df)?;

    info!("Table saved: {}", path.display());
    Ok(())
}

/// Write a single-sheet workbook. Nulls are left as blank cells.
///
/// Dates and datetimes are written as date-formatted cells so they read back
/// as temporal values.
pub fn write_excel(df: &DataFrame, path: &Path, sheet_name: &str) -> Result<()> {
    ensure_parent(path)?;
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = u16::try_from(col_idx).map_err(|_| {
            IntakeError::InvalidStructure(format!("Too many columns for Excel: {}", df.width()))
        })?;
        worksheet.write_string(0, col, column.name().as_str())?;

        for row_idx in 0..df.height() {
            let row = u32::try_from(row_idx + 1).map_err(|_| {
                IntakeError::InvalidStructure(format!("Too many rows for Excel: {}", df.height()))
            })?;

            match column.get(row_idx)? {
                AnyValue::Null => {}
                AnyValue::Boolean(b) => {
                    worksheet.write_boolean(row, col, b)?;
                }
                AnyValue::String(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                AnyValue::StringOwned(s) => {
                    worksheet.write_string(row, col, s.as_str())?;
                }
                AnyValue::Date(days) => {
                    if let Some(date) = naive_date(days) {
                        worksheet.write_datetime_with_format(row, col, &date, &date_format)?;
                    }
                }
                AnyValue::Datetime(value, unit, _) => {
                    if let Some(datetime) = naive_datetime(value, unit) {
                        worksheet.write_datetime_with_format(
                            row,
                            col,
                            &datetime,
                            &datetime_format,
                        )?;
                    }
                }
                value if is_numeric_dtype(&value.dtype()) => match value.extract::<f64>() {
                    Some(number) if number.is_finite() => {
                        worksheet.write_number(row, col, number)?;
                    }
                    _ => {}
                },
                value => {
                    worksheet.write_string(row, col, value.to_string())?;
                }
            }
        }
    }

    workbook.save(path)?;
    info!("Table saved: {}", path.display());
    Ok(())
}

/// Write a table in a tabular format.
pub fn write_table(
    df: &mut DataFrame,
    format: FileFormat,
    path: &Path,
    excel_sheet_name: &str,
) -> Result<()> {
    match format {
        FileFormat::Csv => write_csv(df, path),
        FileFormat::Excel => write_excel(df, path, excel_sheet_name),
        FileFormat::Parquet => write_parquet(df, path),
        FileFormat::Pdf => Err(IntakeError::UnsupportedConversion {
            from: "table".to_string(),
            to: format.to_string(),
        }),
    }
}
