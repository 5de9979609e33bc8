//! Extraction of tables declared in the file's own metadata

use super::materialize::{MaterializeError, materialize_record};
use crate::reader::{DefinedTable, Sheet};
use crate::table::Records;
use crate::value::CellValue;

/// Materialize one declared table region.
///
/// Returns `Ok(None)` when the region has fewer than two rows (no data rows).
/// Null header cells become empty strings. Data rows are kept as-is, including
/// rows that are entirely blank.
pub fn extract_defined_table(
    sheet: &Sheet,
    table: &DefinedTable,
) -> Result<Option<Records>, MaterializeError> {
    let rows = sheet.slice(&table.region);
    if rows.len() < 2 {
        return Ok(None);
    }

    let headers = defined_headers(&rows[0]);
    let records = rows[1..]
        .iter()
        .map(|row| materialize_record(&headers, row))
        .collect::<Result<Records, _>>()?;

    Ok(Some(records))
}

fn defined_headers(row: &[CellValue]) -> Vec<String> {
    row.iter().map(CellValue::to_header).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CellRange;
    use crate::table::record_headers;
    use crate::value::Scalar;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_null_header_becomes_empty_string() {
        let sheet = Sheet::from_rows(
            "S",
            vec![
                vec![text("Name"), CellValue::Empty, text("Age")],
                vec![text("Ann"), text("x"), CellValue::Number(31.0)],
            ],
        );
        let table = DefinedTable::new("People", CellRange::new(0, 0, 1, 2));

        let records = extract_defined_table(&sheet, &table).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(record_headers(&records[0]), vec!["Name", "", "Age"]);
        assert_eq!(records[0].get("Age"), Some(&Scalar::Number(31.0)));
    }

    #[test]
    fn test_header_only_region_is_skipped() {
        let sheet = Sheet::from_rows("S", vec![vec![text("A"), text("B")]]);
        let table = DefinedTable::new("Empty", CellRange::new(0, 0, 0, 1));
        assert_eq!(extract_defined_table(&sheet, &table).unwrap(), None);
    }

    #[test]
    fn test_blank_rows_inside_region_are_kept() {
        let sheet = Sheet::from_rows(
            "S",
            vec![
                vec![text("A")],
                vec![CellValue::Empty],
                vec![CellValue::Number(1.0)],
            ],
        );
        let table = DefinedTable::new("T", CellRange::new(0, 0, 2, 0));

        let records = extract_defined_table(&sheet, &table).unwrap().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("A"), Some(&Scalar::Null));
    }

    #[test]
    fn test_region_offset_in_grid() {
        let sheet = Sheet::from_rows(
            "S",
            vec![
                vec![text("ignored"), CellValue::Empty, CellValue::Empty],
                vec![CellValue::Empty, text("K"), text("V")],
                vec![CellValue::Empty, text("a"), CellValue::Number(1.0)],
            ],
        );
        let table = DefinedTable::new("KV", CellRange::new(1, 1, 2, 2));

        let records = extract_defined_table(&sheet, &table).unwrap().unwrap();
        assert_eq!(record_headers(&records[0]), vec!["K", "V"]);
        assert_eq!(records[0].get("K"), Some(&Scalar::Text("a".to_string())));
    }

    #[test]
    fn test_oversized_region_is_bounded_by_sheet() {
        let sheet = Sheet::from_rows(
            "S",
            vec![
                vec![text("K"), text("V")],
                vec![text("a"), CellValue::Number(1.0)],
            ],
        );
        let region = CellRange::parse("A1:XFD1048576").unwrap();
        let table = DefinedTable::new("Everything", region);

        let records = extract_defined_table(&sheet, &table).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(record_headers(&records[0]), vec!["K", "V"]);
    }
}
