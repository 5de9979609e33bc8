//! Markdown previews of extracted tables, used as model context

use crate::table::{Record, table_headers};

/// Columns that hold at least one non-null value, in header order
pub fn non_empty_columns(records: &[Record]) -> Vec<&str> {
    table_headers(records)
        .into_iter()
        .filter(|header| {
            records
                .iter()
                .any(|record| record.get(*header).is_some_and(|v| !v.is_null()))
        })
        .collect()
}

/// Render the first `max_rows` records as a markdown pipe table.
/// Columns that are null in every record are dropped.
pub fn render_markdown(records: &[Record], max_rows: usize) -> String {
    let columns = non_empty_columns(records);
    if columns.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    push_row(&mut out, columns.iter().map(|c| c.to_string()));
    push_row(&mut out, columns.iter().map(|_| "---".to_string()));
    for record in records.iter().take(max_rows) {
        push_row(
            &mut out,
            columns
                .iter()
                .map(|c| record.get(*c).map(|v| v.display()).unwrap_or_default()),
        );
    }
    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&escape_cell(&cell));
        out.push_str(" |");
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}
