//! Table extraction engine
//!
//! For each sheet the declared tables are extracted first, keyed by their
//! declared names. The implicit segmenter then scans the whole grid, including
//! rows already covered by declared tables, and names every surviving block
//! `Table_<k>` where `k` continues from the number of tables already found on
//! that sheet.

pub mod defined;
pub mod implicit;
pub mod materialize;

use crate::config::UnserializablePolicy;
use crate::error::{ExtractError, Result};
use crate::reader::{self, Sheet, Workbook};
use crate::table::{Records, TableSet, WorkbookTables};
use materialize::MaterializeError;
use std::path::Path;

/// Extract all tables of one sheet
pub fn extract_tables_from_sheet(sheet: &Sheet, policy: UnserializablePolicy) -> Result<TableSet> {
    let mut tables = TableSet::new();

    for table in &sheet.defined_tables {
        let outcome = defined::extract_defined_table(sheet, table);
        if let Some(records) = resolve(sheet, &table.name, outcome, policy)? {
            tables.insert(table.name.clone(), records);
        }
    }

    for chunk in implicit::split_chunks(&sheet.rows) {
        let name = format!("Table_{}", tables.len() + 1);
        let outcome = implicit::materialize_chunk(chunk);
        if let Some(records) = resolve(sheet, &name, outcome, policy)? {
            tables.insert(name, records);
        }
    }

    log::debug!("Sheet '{}': {} tables", sheet.name, tables.len());
    Ok(tables)
}

/// Extract all tables of a workbook. Sheets without tables are omitted.
pub fn extract_all_tables(workbook: &Workbook, policy: UnserializablePolicy) -> Result<WorkbookTables> {
    let mut all_tables = WorkbookTables::new();
    for sheet in &workbook.sheets {
        let tables = extract_tables_from_sheet(sheet, policy)?;
        if !tables.is_empty() {
            all_tables.insert(sheet.name.clone(), tables);
        }
    }
    Ok(all_tables)
}

/// Read a file and extract all of its tables
pub fn extract_file<P: AsRef<Path>>(path: P, policy: UnserializablePolicy) -> Result<WorkbookTables> {
    let workbook = reader::read_workbook(path)?;
    extract_all_tables(&workbook, policy)
}

fn resolve(
    sheet: &Sheet,
    table_name: &str,
    outcome: std::result::Result<Option<Records>, MaterializeError>,
    policy: UnserializablePolicy,
) -> Result<Option<Records>> {
    match outcome {
        Ok(Some(records)) => Ok(Some(records)),
        Ok(None) => {
            log::trace!("Sheet '{}': discarded candidate '{}'", sheet.name, table_name);
            Ok(None)
        }
        Err(MaterializeError { column, reason }) => {
            let err = ExtractError::UnserializableValue {
                sheet: sheet.name.clone(),
                table: table_name.to_string(),
                column,
                reason,
            };
            match policy {
                UnserializablePolicy::SkipTable => {
                    log::warn!("{}; skipping table", err);
                    Ok(None)
                }
                UnserializablePolicy::Fail => Err(err),
            }
        }
    }
}
