//! CSV export of extracted tables

use crate::table::{Record, table_headers};
use crate::value::Scalar;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write records as CSV: the header row in table order, then one line per record.
/// `Null` cells become empty fields.
pub fn write_csv<W: Write>(records: &[Record], writer: W, delimiter: u8) -> Result<()> {
    let headers = table_headers(records);
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    if !headers.is_empty() {
        csv_writer.write_record(&headers)?;
    }
    for record in records {
        let fields: Vec<String> = headers
            .iter()
            .map(|header| record.get(*header).map(Scalar::display).unwrap_or_default())
            .collect();
        csv_writer.write_record(&fields)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Render records as a CSV string
pub fn to_csv_string(records: &[Record], delimiter: u8) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer, delimiter)?;
    String::from_utf8(buffer).context("CSV output is not valid UTF-8")
}

/// Download name for one table: `<file stem>_<sheet>_<table>.csv`
pub fn export_file_name(file_name: &str, sheet_name: &str, table_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    format!("{}_{}_{}.csv", stem, sheet_name, table_name)
}
