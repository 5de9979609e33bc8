//! Implicit-table segmenter: splits a grid into blocks separated by blank rows

use super::materialize::{MaterializeError, materialize_record};
use crate::table::Records;
use crate::value::CellValue;

/// A row is blank iff every cell in it is empty
pub fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_empty)
}

/// Split rows into maximal runs of non-blank rows, in source order.
///
/// Blank rows are separators and belong to no chunk; consecutive blank rows
/// act as a single separator.
pub fn split_chunks(rows: &[Vec<CellValue>]) -> Vec<&[Vec<CellValue>]> {
    let mut chunks = Vec::new();
    let mut start = None;

    for (idx, row) in rows.iter().enumerate() {
        match (is_blank_row(row), start) {
            (true, Some(s)) => {
                chunks.push(&rows[s..idx]);
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        chunks.push(&rows[s..]);
    }

    chunks
}

/// Header names of an implicit table; null cells become `column_<i>` (1-based
/// position within this header row).
pub fn implicit_headers(row: &[CellValue]) -> Vec<String> {
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            if cell.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                cell.to_header()
            }
        })
        .collect()
}

/// Materialize one chunk into records.
///
/// Returns `Ok(None)` when the chunk is discarded: fewer than two rows, or no
/// data row left after dropping entirely blank rows. The row-count gate runs
/// before the per-row blank filter.
pub fn materialize_chunk(chunk: &[Vec<CellValue>]) -> Result<Option<Records>, MaterializeError> {
    if chunk.len() < 2 {
        return Ok(None);
    }

    let headers = implicit_headers(&chunk[0]);
    let records = chunk[1..]
        .iter()
        .filter(|row| !is_blank_row(row))
        .map(|row| materialize_record(&headers, row))
        .collect::<Result<Records, _>>()?;

    if records.is_empty() {
        return Ok(None);
    }
    Ok(Some(records))
}
