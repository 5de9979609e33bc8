//! Workbook data structures

use crate::value::CellValue;
use std::path::PathBuf;

/// Represents a complete workbook
#[derive(Debug, Clone)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Get a sheet by name
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get all sheet names
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Represents a worksheet as a row-major grid anchored at A1
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    /// Rows of cell values; every row has the same width
    pub rows: Vec<Vec<CellValue>>,
    /// Table regions declared by the file itself
    pub defined_tables: Vec<DefinedTable>,
}

impl Sheet {
    /// Build a sheet from ragged rows, padding them to a common width
    pub fn from_rows(name: impl Into<String>, mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::Empty);
        }
        Self {
            name: name.into(),
            rows,
            defined_tables: Vec::new(),
        }
    }

    pub fn with_defined_table(mut self, table: DefinedTable) -> Self {
        self.defined_tables.push(table);
        self
    }

    /// Get a cell at the given position
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.rows.get(row as usize)?.get(col as usize)
    }

    /// Number of columns in the grid
    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Copy the rectangular region `[first_row..=last_row] x [first_col..=last_col]`,
    /// clipped to the grid. Rows and columns past the last used cell are dropped,
    /// so a declared region is never larger than the sheet itself.
    pub fn slice(&self, region: &CellRange) -> Vec<Vec<CellValue>> {
        let Some(clipped) = region.clip(self.rows.len(), self.width()) else {
            return Vec::new();
        };
        self.rows[clipped.first_row as usize..=clipped.last_row as usize]
            .iter()
            .map(|row| row[clipped.first_col as usize..=clipped.last_col as usize].to_vec())
            .collect()
    }
}

/// Rectangular cell region, 0-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl CellRange {
    pub fn new(first_row: u32, first_col: u32, last_row: u32, last_col: u32) -> Self {
        Self {
            first_row,
            first_col,
            last_row,
            last_col,
        }
    }

    /// Intersect with a `height x width` grid anchored at A1
    pub fn clip(&self, height: usize, width: usize) -> Option<Self> {
        if height == 0 || width == 0 {
            return None;
        }
        let last_row = (self.last_row as usize).min(height - 1) as u32;
        let last_col = (self.last_col as usize).min(width - 1) as u32;
        if self.first_row > last_row || self.first_col > last_col {
            return None;
        }
        Some(Self::new(self.first_row, self.first_col, last_row, last_col))
    }

    /// Parse an A1-style reference such as `B2:D10` (a single cell is a 1x1 range)
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.replace('$', "");
        let mut parts = reference.split(':');
        let start = parse_cell_ref(parts.next()?)?;
        let end = match parts.next() {
            Some(end) => parse_cell_ref(end)?,
            None => start,
        };
        if parts.next().is_some() {
            return None;
        }

        Some(Self::new(
            start.0.min(end.0),
            start.1.min(end.1),
            start.0.max(end.0),
            start.1.max(end.1),
        ))
    }
}

/// Parse a cell reference like "A1" into (row, col) as 0-based indices
fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let split = cell_ref.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell_ref.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut col = 0u32;
    for ch in letters.chars() {
        col = col
            .checked_mul(26)?
            .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    let row = digits.parse::<u32>().ok()?;
    if row == 0 {
        return None;
    }

    // Convert to 0-based
    Some((row - 1, col - 1))
}

/// A table region declared in the file's own metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedTable {
    pub name: String,
    pub region: CellRange,
}

impl DefinedTable {
    pub fn new(name: impl Into<String>, region: CellRange) -> Self {
        Self {
            name: name.into(),
            region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(CellRange::parse("A1:C3"), Some(CellRange::new(0, 0, 2, 2)));
        assert_eq!(
            CellRange::parse("$B$2:$AA$10"),
            Some(CellRange::new(1, 1, 9, 26))
        );
        assert_eq!(CellRange::parse("D4"), Some(CellRange::new(3, 3, 3, 3)));
        assert_eq!(CellRange::parse("A0:B2"), None);
        assert_eq!(CellRange::parse("1A:B2"), None);
        assert_eq!(CellRange::parse("A1:B2:C3"), None);
    }

    #[test]
    fn test_from_rows_pads_width() {
        let sheet = Sheet::from_rows(
            "S",
            vec![vec![CellValue::Number(1.0)], vec![], vec![CellValue::Empty; 3]],
        );
        assert_eq!(sheet.width(), 3);
        assert!(sheet.rows.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn test_slice_clips_to_grid() {
        let sheet = Sheet::from_rows(
            "S",
            vec![
                vec![CellValue::Text("a".into()), CellValue::Text("b".into())],
                vec![CellValue::Number(1.0), CellValue::Number(2.0)],
            ],
        );
        assert_eq!(
            sheet.slice(&CellRange::new(1, 1, 2, 2)),
            vec![vec![CellValue::Number(2.0)]]
        );
        assert!(sheet.slice(&CellRange::new(5, 0, 6, 1)).is_empty());
    }

    #[test]
    fn test_whole_sheet_reference_stays_within_grid() {
        let sheet = Sheet::from_rows(
            "S",
            vec![
                vec![CellValue::Text("K".into()), CellValue::Text("V".into())],
                vec![CellValue::Text("a".into()), CellValue::Number(1.0)],
            ],
        );
        let region = CellRange::parse("A1:XFD1048576").unwrap();
        assert_eq!(region, CellRange::new(0, 0, 1_048_575, 16_383));

        let block = sheet.slice(&region);
        assert_eq!(block.len(), 2);
        assert!(block.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn test_clip_empty_grid() {
        assert_eq!(CellRange::new(0, 0, 3, 3).clip(0, 0), None);
        assert_eq!(
            CellRange::new(0, 0, 3, 3).clip(2, 5),
            Some(CellRange::new(0, 0, 1, 3))
        );
    }
}
