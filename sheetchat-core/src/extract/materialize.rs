//! Header/row materializer: turns a header row and a data row into a [`Record`]

use crate::table::Record;
use crate::value::{CellValue, UnserializableValue, serialize_data};

/// A cell in the named column could not be normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeError {
    pub column: String,
    pub reason: String,
}

/// Zip `headers[i] -> normalize(row[i])`, truncating to the shorter of the two.
///
/// Duplicate headers collapse into one key: the later column's value wins and
/// the key keeps the position of its first occurrence.
pub fn materialize_record(headers: &[String], row: &[CellValue]) -> Result<Record, MaterializeError> {
    let mut record = Record::with_capacity(headers.len().min(row.len()));
    for (header, cell) in headers.iter().zip(row) {
        let value = serialize_data(cell).map_err(|UnserializableValue(reason)| MaterializeError {
            column: header.clone(),
            reason,
        })?;
        record.insert(header.clone(), value);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::record_headers;
    use crate::value::Scalar;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_duplicate_headers_later_column_wins() {
        let record = materialize_record(
            &headers(&["X", "X"]),
            &[CellValue::Number(1.0), CellValue::Number(2.0)],
        )
        .unwrap();

        assert_eq!(record.len(), 1);
        assert_eq!(record.get("X"), Some(&Scalar::Number(2.0)));
    }

    #[test]
    fn test_truncates_to_shorter_side() {
        let record = materialize_record(
            &headers(&["A", "B", "C"]),
            &[CellValue::Text("a".into()), CellValue::Empty],
        )
        .unwrap();
        assert_eq!(record_headers(&record), vec!["A", "B"]);
        assert_eq!(record.get("B"), Some(&Scalar::Null));

        let record = materialize_record(
            &headers(&["A"]),
            &[CellValue::Number(1.0), CellValue::Number(2.0)],
        )
        .unwrap();
        assert_eq!(record_headers(&record), vec!["A"]);
    }

    #[test]
    fn test_unserializable_cell_names_column() {
        let err = materialize_record(
            &headers(&["Ok", "Bad"]),
            &[CellValue::Number(1.0), CellValue::Number(f64::NAN)],
        )
        .unwrap_err();
        assert_eq!(err.column, "Bad");
    }
}
