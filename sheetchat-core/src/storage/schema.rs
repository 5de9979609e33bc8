use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    // Foreign keys are disabled by default in SQLite.
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS excel_files (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          file_name TEXT NOT NULL,
          file_path TEXT NOT NULL,
          file_hash TEXT NOT NULL UNIQUE,
          uploaded_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS excel_tables (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          excel_file_id INTEGER NOT NULL REFERENCES excel_files(id) ON DELETE CASCADE,
          sheet_name TEXT NOT NULL,
          table_name TEXT NOT NULL,
          data JSON NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tables_file ON excel_tables(excel_file_id);
        "#,
    )?;

    Ok(())
}
