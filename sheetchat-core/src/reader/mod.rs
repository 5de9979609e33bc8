//! Excel/ODS file reader using calamine

use crate::error::{ExtractError, Result};
use crate::value::{CellValue, TIMESTAMP_FORMAT};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub mod workbook;
pub mod xml_parser;

pub use workbook::{CellRange, DefinedTable, Sheet, Workbook};

/// Read a workbook from a file path.
///
/// Every sheet is loaded as a full grid with formulas resolved to their cached
/// values. For XLSX packages the declared table parts are attached to their sheets.
/// Any failure to open or parse the file is reported as [`ExtractError::CorruptFile`];
/// no partial workbook is returned.
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path = path.as_ref();
    let mut excel: Sheets<BufReader<File>> =
        open_workbook_auto(path).map_err(|e| ExtractError::corrupt(path, e))?;

    let is_xlsx = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("xlsx") || s.eq_ignore_ascii_case("xlsm"))
        .unwrap_or(false);

    let mut defined_tables = if is_xlsx {
        let file = File::open(path).map_err(|e| ExtractError::corrupt(path, e))?;
        let mut archive =
            zip::ZipArchive::new(BufReader::new(file)).map_err(|e| ExtractError::corrupt(path, e))?;
        xml_parser::extract_defined_tables_from_xlsx(&mut archive)
            .map_err(|e| ExtractError::corrupt(path, format!("{:#}", e)))?
    } else {
        Default::default()
    };

    let mut sheets = Vec::new();
    for sheet_name in excel.sheet_names() {
        let range = excel
            .worksheet_range(&sheet_name)
            .map_err(|e| ExtractError::corrupt(path, e))?;

        let mut sheet = parse_sheet(&sheet_name, &range);
        sheet.defined_tables = defined_tables.remove(&sheet_name).unwrap_or_default();
        log::debug!(
            "Read sheet '{}': {} rows x {} columns, {} defined tables",
            sheet.name,
            sheet.rows.len(),
            sheet.width(),
            sheet.defined_tables.len()
        );
        sheets.push(sheet);
    }

    Ok(Workbook {
        path: path.to_path_buf(),
        sheets,
    })
}

/// Convert a calamine range into a grid anchored at A1
fn parse_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let Some((end_row, end_col)) = range.end() else {
        return Sheet::from_rows(name, Vec::new());
    };
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let width = end_col as usize + 1;
    let mut rows = vec![vec![CellValue::Empty; width]; end_row as usize + 1];

    for (rel_row, rel_col, data) in range.used_cells() {
        let row = start_row as usize + rel_row;
        let col = start_col as usize + rel_col;
        rows[row][col] = parse_cell_value(data);
    }

    Sheet::from_rows(name, rows)
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) => {
            if dt.is_duration() {
                match dt.as_duration() {
                    Some(d) => CellValue::Duration(d),
                    None => CellValue::Number(dt.as_f64()),
                }
            } else {
                match dt.as_datetime() {
                    Some(ts) => CellValue::DateTime(ts),
                    None => CellValue::Number(dt.as_f64()),
                }
            }
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// ISO timestamps as written by ODS files; date-only values read as midnight
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
