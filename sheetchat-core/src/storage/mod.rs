//! SQLite persistence of uploaded workbooks and their extracted tables

pub mod renumber;
mod schema;

use crate::table::{Records, TableSet, WorkbookTables};
use chrono::{DateTime, Utc};
use regex::Regex;
use renumber::{FileMoves, apply_renames, plan_renumbering, sequential_name};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("file already stored with hash {hash}")]
    DuplicateFile { hash: String },
    #[error("file not found: {0}")]
    FileNotFound(i64),
}

pub type Result<T> = std::result::Result<T, StorageError>;

static FILE_NUMBER: OnceLock<Regex> = OnceLock::new();

/// Result of a mutating operation reported to the user instead of raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    pub file_id: Option<i64>,
}

impl Outcome {
    fn ok(message: impl Into<String>, file_id: Option<i64>) -> Self {
        Self {
            success: true,
            message: message.into(),
            file_id,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            file_id: None,
        }
    }
}

/// A stored workbook with every table regrouped by sheet
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub id: i64,
    pub file_name: String,
    pub file_path: PathBuf,
    pub uploaded_at: DateTime<Utc>,
    pub tables: WorkbookTables,
}

/// One line of the stored-files listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub id: i64,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub table_count: usize,
}

#[derive(Debug, Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn is_duplicate_file(&self, file_hash: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let found = conn
            .query_row(
                "SELECT 1 FROM excel_files WHERE file_hash = ?1",
                params![file_hash],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Persist a workbook row and one row per extracted table, atomically
    pub fn save_excel_file(
        &self,
        file_name: &str,
        file_path: &Path,
        file_hash: &str,
        tables: &WorkbookTables,
    ) -> Result<i64> {
        let mut conn = self.conn.lock().expect("storage mutex poisoned");
        let tx = conn.transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM excel_files WHERE file_hash = ?1",
                params![file_hash],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StorageError::DuplicateFile {
                hash: file_hash.to_string(),
            });
        }

        tx.execute(
            "INSERT INTO excel_files (file_name, file_path, file_hash, uploaded_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                file_name,
                file_path.to_string_lossy(),
                file_hash,
                Utc::now()
            ],
        )?;
        let file_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO excel_tables (excel_file_id, sheet_name, table_name, data) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (sheet_name, sheet_tables) in tables.iter() {
                for (table_name, records) in sheet_tables.iter() {
                    let data = serde_json::to_string(records)?;
                    stmt.execute(params![file_id, sheet_name, table_name, data])?;
                }
            }
        }

        tx.commit()?;
        log::info!(
            "Stored {} as file {} with {} tables",
            file_name,
            file_id,
            crate::table::count_tables(tables)
        );
        Ok(file_id)
    }

    pub fn get_excel_file(&self, file_id: i64) -> Result<Option<StoredFile>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let row = conn
            .query_row(
                "SELECT file_name, file_path, uploaded_at FROM excel_files WHERE id = ?1",
                params![file_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, DateTime<Utc>>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((file_name, file_path, uploaded_at)) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT sheet_name, table_name, data FROM excel_tables WHERE excel_file_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![file_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?;

        let mut tables = WorkbookTables::new();
        for row in rows {
            let (sheet_name, table_name, data) = row?;
            let records: Records = serde_json::from_str(&data)?;
            match tables.get_mut(&sheet_name) {
                Some(sheet_tables) => {
                    sheet_tables.insert(table_name, records);
                }
                None => {
                    let mut sheet_tables = TableSet::new();
                    sheet_tables.insert(table_name, records);
                    tables.insert(sheet_name, sheet_tables);
                }
            }
        }

        Ok(Some(StoredFile {
            id: file_id,
            file_name,
            file_path: PathBuf::from(file_path),
            uploaded_at,
            tables,
        }))
    }

    /// All stored files, newest first
    pub fn list_excel_files(&self) -> Result<Vec<FileSummary>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let mut stmt = conn.prepare(
            r#"
            SELECT f.id, f.file_name, f.uploaded_at, COUNT(t.id)
            FROM excel_files f
            LEFT JOIN excel_tables t ON t.excel_file_id = f.id
            GROUP BY f.id
            ORDER BY f.uploaded_at DESC, f.id DESC
            "#,
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(FileSummary {
                id: r.get(0)?,
                file_name: r.get(1)?,
                uploaded_at: r.get(2)?,
                table_count: r.get::<_, i64>(3)? as usize,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Copy a stored file, on disk and in the database, under the next `file<N>` name
    pub fn duplicate_excel_file(&self, file_id: i64) -> Outcome {
        match self.try_duplicate(file_id) {
            Ok((new_id, new_name)) => Outcome::ok(
                format!("File duplicated successfully as {}", new_name),
                Some(new_id),
            ),
            Err(StorageError::FileNotFound(_)) => Outcome::failed("Original file not found"),
            Err(e) => {
                log::error!("Duplicating file {} failed: {}", file_id, e);
                Outcome::failed(format!("Error duplicating file: {}", e))
            }
        }
    }

    /// Remove a stored file and renumber the remaining ones as `file1..fileN`
    pub fn delete_excel_file(&self, file_id: i64) -> Outcome {
        match self.try_delete(file_id) {
            Ok(()) => Outcome::ok("File deleted and numbering updated successfully", None),
            Err(StorageError::FileNotFound(_)) => Outcome::failed("File not found"),
            Err(e @ StorageError::Io(_)) => {
                log::error!("Error during file operations: {}", e);
                Outcome::failed(format!("Error during file operations: {}", e))
            }
            Err(e @ StorageError::Sqlite(_)) => {
                log::error!("Deleting file {} failed: {}", file_id, e);
                Outcome::failed(format!("Database error: {}", e))
            }
            Err(e) => {
                log::error!("Deleting file {} failed: {}", file_id, e);
                Outcome::failed(format!("Unexpected error: {}", e))
            }
        }
    }

    /// Rename every stored file to `file<index><ext>` by ascending id.
    /// Returns the number of files renamed.
    pub fn renumber_files(&self) -> Result<usize> {
        let mut conn = self.conn.lock().expect("storage mutex poisoned");
        let tx = conn.transaction()?;
        let mut moves = FileMoves::new();

        let renamed = match renumber_rows(&tx, &mut moves) {
            Ok(n) => n,
            Err(e) => {
                moves.undo();
                return Err(e);
            }
        };
        if let Err(e) = tx.commit() {
            moves.undo();
            return Err(e.into());
        }
        Ok(renamed)
    }

    fn try_duplicate(&self, file_id: i64) -> Result<(i64, String)> {
        let mut conn = self.conn.lock().expect("storage mutex poisoned");
        let tx = conn.transaction()?;

        let original = tx
            .query_row(
                "SELECT file_name, file_path, file_hash FROM excel_files WHERE id = ?1",
                params![file_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((file_name, file_path, file_hash)) = original else {
            return Err(StorageError::FileNotFound(file_id));
        };

        let names = {
            let mut stmt = tx.prepare("SELECT file_name FROM excel_files")?;
            let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<String>>>()?
        };
        let new_name = sequential_name(next_file_number(&names), &file_name);
        let source = PathBuf::from(&file_path);
        let new_path = source
            .parent()
            .map(|dir| dir.join(&new_name))
            .unwrap_or_else(|| PathBuf::from(&new_name));

        // The copy has the same content hash; key it by its own id instead
        let base_hash = file_hash.split('#').next().unwrap_or(&file_hash);
        tx.execute(
            "INSERT INTO excel_files (file_name, file_path, file_hash, uploaded_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                new_name,
                new_path.to_string_lossy(),
                format!("{}#pending", base_hash),
                Utc::now()
            ],
        )?;
        let new_id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE excel_files SET file_hash = ?1 WHERE id = ?2",
            params![format!("{}#{}", base_hash, new_id), new_id],
        )?;
        tx.execute(
            r#"
            INSERT INTO excel_tables (excel_file_id, sheet_name, table_name, data)
            SELECT ?1, sheet_name, table_name, data FROM excel_tables
            WHERE excel_file_id = ?2 ORDER BY id
            "#,
            params![new_id, file_id],
        )?;

        if new_path.exists() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", new_path.display()),
            )));
        }
        fs::copy(&source, &new_path)?;

        if let Err(e) = tx.commit() {
            if let Err(io_err) = fs::remove_file(&new_path) {
                log::warn!("Failed to remove {}: {}", new_path.display(), io_err);
            }
            return Err(e.into());
        }

        log::info!("Duplicated file {} as {} ({})", file_id, new_id, new_name);
        Ok((new_id, new_name))
    }

    fn try_delete(&self, file_id: i64) -> Result<()> {
        let mut conn = self.conn.lock().expect("storage mutex poisoned");
        let tx = conn.transaction()?;

        let file_path = tx
            .query_row(
                "SELECT file_path FROM excel_files WHERE id = ?1",
                params![file_id],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        let Some(file_path) = file_path else {
            return Err(StorageError::FileNotFound(file_id));
        };
        let file_path = PathBuf::from(file_path);

        tx.execute(
            "DELETE FROM excel_tables WHERE excel_file_id = ?1",
            params![file_id],
        )?;
        tx.execute("DELETE FROM excel_files WHERE id = ?1", params![file_id])?;

        let mut moves = FileMoves::new();
        let staged = stage_deletion(&file_path, &mut moves)
            .and_then(|removed| renumber_rows(&tx, &mut moves).map(|_| removed));
        let removed = match staged {
            Ok(removed) => removed,
            Err(e) => {
                moves.undo();
                return Err(e);
            }
        };
        if let Err(e) = tx.commit() {
            moves.undo();
            return Err(e.into());
        }

        if let Some(removed) = removed {
            discard(&removed);
        }
        log::info!("Deleted file {}", file_id);
        Ok(())
    }
}

/// 1 + the highest `N` among names starting with `file<N>`
fn next_file_number(names: &[String]) -> usize {
    let re = FILE_NUMBER.get_or_init(|| Regex::new(r"^file(\d+)").unwrap());
    names
        .iter()
        .filter_map(|name| re.captures(name))
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

/// Move the deleted workbook aside so it can be restored on rollback
fn stage_deletion(path: &Path, moves: &mut FileMoves) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let aside = path.with_file_name(format!(".{}.deleted", name));
    moves.move_file(path, &aside)?;
    Ok(Some(aside))
}

/// Remove a staged file, then its directory when nothing else is left in it
fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Failed to remove {}: {}", path.display(), e);
        return;
    }
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return;
    };
    let is_empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        if let Err(e) = fs::remove_dir(dir) {
            log::warn!("Failed to remove empty directory {}: {}", dir.display(), e);
        }
    }
}

fn renumber_rows(conn: &Connection, moves: &mut FileMoves) -> Result<usize> {
    let files = {
        let mut stmt = conn.prepare("SELECT id, file_name, file_path FROM excel_files ORDER BY id")?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                PathBuf::from(r.get::<_, String>(2)?),
            ))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let plan = plan_renumbering(&files);
    for rename in &plan {
        conn.execute(
            "UPDATE excel_files SET file_name = ?1, file_path = ?2 WHERE id = ?3",
            params![
                rename.new_name,
                rename.new_path.to_string_lossy(),
                rename.file_id
            ],
        )?;
    }
    apply_renames(&plan, moves)?;
    if !plan.is_empty() {
        log::debug!("Renumbered {} stored files", plan.len());
    }
    Ok(plan.len())
}
