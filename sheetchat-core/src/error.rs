//! Error taxonomy of the extraction engine

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file cannot be opened or parsed as a workbook. Fatal for the whole call.
    #[error("Error processing Excel file {}: {reason}", path.display())]
    CorruptFile { path: PathBuf, reason: String },

    /// A cell value has no persistable representation
    #[error("Unserializable value in sheet '{sheet}', table '{table}', column '{column}': {reason}")]
    UnserializableValue {
        sheet: String,
        table: String,
        column: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ExtractError::CorruptFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
