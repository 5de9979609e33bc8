//! sheetchat-core: table extraction, persistence and table Q&A for spreadsheets
//!
//! A workbook is read into per-sheet cell grids, every sheet is segmented into
//! named tables of JSON-ready records, and the result can be stored in SQLite,
//! exported as CSV or handed to a language model as a markdown preview.

pub mod assistant;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod preview;
pub mod reader;
pub mod session;
pub mod storage;
pub mod table;
pub mod upload;
pub mod value;

use std::path::Path;

pub use assistant::{Answerer, AssistantError, analyze_table};
pub use config::{SheetChatConfig, UnserializablePolicy};
pub use error::{ExtractError, Result};
pub use session::{ChatKey, Page, Session};
pub use storage::{Outcome, Storage, StorageError};
pub use table::{Record, Records, TableSet, WorkbookTables};
pub use upload::{UploadOutcome, upload_file};
pub use value::{CellValue, Scalar};

/// Main extraction interface
pub struct Extractor {
    config: SheetChatConfig,
}

impl Extractor {
    /// Create an extractor with default configuration
    pub fn new() -> Self {
        Self::with_config(SheetChatConfig::default())
    }

    pub fn with_config(config: SheetChatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SheetChatConfig {
        &self.config
    }

    /// Extract every table of a workbook file, grouped by sheet
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<WorkbookTables> {
        extract::extract_file(path, self.config.extraction.on_unserializable)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
