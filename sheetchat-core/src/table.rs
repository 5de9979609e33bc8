//! Extracted tables: records, per-sheet table sets and per-workbook results

use crate::value::Scalar;
use indexmap::IndexMap;

/// One header-keyed row of normalized values.
///
/// Inserting an existing header keeps its first position and replaces the value.
pub type Record = IndexMap<String, Scalar>;

/// Ordered records of one extracted table
pub type Records = Vec<Record>;

/// Tables of a single sheet, keyed by table name in extraction order
pub type TableSet = IndexMap<String, Records>;

/// Tables of a whole workbook, keyed by sheet name in workbook order
pub type WorkbookTables = IndexMap<String, TableSet>;

/// Column names of a record in source order
pub fn record_headers(record: &Record) -> Vec<&str> {
    record.keys().map(String::as_str).collect()
}

/// Header order of a table, taken from its first record
pub fn table_headers(records: &[Record]) -> Vec<&str> {
    records.first().map(record_headers).unwrap_or_default()
}

/// Total number of tables across all sheets
pub fn count_tables(tables: &WorkbookTables) -> usize {
    tables.values().map(IndexMap::len).sum()
}
