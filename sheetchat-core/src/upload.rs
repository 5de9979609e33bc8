//! Upload pipeline: save to disk, reject duplicates, extract, persist

use crate::config::SheetChatConfig;
use crate::extract::extract_file;
use crate::storage::Storage;
use crate::table::WorkbookTables;
use chrono::Local;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();

/// Extensions accepted for upload
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// Lowercase hex SHA-256 of the file content
pub fn calculate_file_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Replace every character outside `[\w.-]` with `_`
pub fn sanitize_file_name(name: &str) -> String {
    let re = UNSAFE_CHARS.get_or_init(|| Regex::new(r"[^\w.-]").unwrap());
    re.replace_all(name, "_").into_owned()
}

/// Write the upload as `<upload_dir>/<YYYYmmdd_HHMMSS>_<sanitized name>`.
/// Returns the saved path and the content hash.
pub fn save_uploaded_file(
    original_name: &str,
    content: &[u8],
    upload_dir: &Path,
) -> io::Result<(PathBuf, String)> {
    fs::create_dir_all(upload_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let unique_name = format!("{}_{}", timestamp, sanitize_file_name(original_name));
    let file_path = upload_dir.join(unique_name);
    fs::write(&file_path, content)?;
    Ok((file_path, calculate_file_hash(content)))
}

/// What happened to an upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub message: String,
    pub file_id: Option<i64>,
    pub tables: WorkbookTables,
}

impl UploadOutcome {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            file_id: None,
            tables: WorkbookTables::new(),
        }
    }
}

fn is_supported(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

fn remove_saved(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Run an upload end to end. Failures are reported in the outcome and leave
/// no file behind in the upload directory.
pub fn upload_file(
    storage: &Storage,
    config: &SheetChatConfig,
    original_name: &str,
    content: &[u8],
) -> UploadOutcome {
    if !is_supported(original_name) {
        return UploadOutcome::rejected(format!(
            "Unsupported file type: {} (expected one of {})",
            original_name,
            SUPPORTED_EXTENSIONS.join(", ")
        ));
    }

    let (file_path, file_hash) =
        match save_uploaded_file(original_name, content, &config.storage.upload_dir) {
            Ok(saved) => saved,
            Err(e) => return UploadOutcome::rejected(format!("Error processing file: {}", e)),
        };

    match storage.is_duplicate_file(&file_hash) {
        Ok(true) => {
            log::info!("Rejected {}: content already stored", original_name);
            remove_saved(&file_path);
            return UploadOutcome::rejected("This file has already been uploaded.");
        }
        Ok(false) => {}
        Err(e) => {
            remove_saved(&file_path);
            return UploadOutcome::rejected(format!("Error saving to database: {}", e));
        }
    }

    let tables = match extract_file(&file_path, config.extraction.on_unserializable) {
        Ok(tables) => tables,
        Err(e) => {
            log::warn!("Extraction failed for {}: {}", original_name, e);
            remove_saved(&file_path);
            return UploadOutcome::rejected(format!("Error processing file: {}", e));
        }
    };
    if tables.is_empty() {
        remove_saved(&file_path);
        return UploadOutcome::rejected("No tables found in the Excel file.");
    }

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| original_name.to_string());
    match storage.save_excel_file(&file_name, &file_path, &file_hash, &tables) {
        Ok(file_id) => UploadOutcome {
            success: true,
            message: "Excel file processed successfully!".to_string(),
            file_id: Some(file_id),
            tables,
        },
        Err(e) => {
            remove_saved(&file_path);
            UploadOutcome::rejected(format!("Error saving to database: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_lowercase_hex_sha256() {
        assert_eq!(
            calculate_file_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Q1 report (final).xlsx"), "Q1_report__final_.xlsx");
        assert_eq!(sanitize_file_name("año-2024.xlsx"), "año-2024.xlsx");
        assert_eq!(sanitize_file_name("../etc/passwd"), ".._etc_passwd");
    }

    #[test]
    fn test_save_uploaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let (path, hash) = save_uploaded_file("my file.xlsx", b"content", &upload_dir).unwrap();

        assert_eq!(path.parent().unwrap(), upload_dir);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_my_file.xlsx"), "{}", name);
        // YYYYmmdd_HHMMSS_
        assert_eq!(name.find("_my_file"), Some(15));
        assert_eq!(fs::read(&path).unwrap(), b"content");
        assert_eq!(hash, calculate_file_hash(b"content"));
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported("a.xlsx"));
        assert!(is_supported("B.XLS"));
        assert!(!is_supported("notes.csv"));
        assert!(!is_supported("noext"));
    }

    #[test]
    fn test_unsupported_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SheetChatConfig::default();
        config.storage.upload_dir = dir.path().join("uploads");
        let storage = Storage::open_in_memory().unwrap();

        let outcome = upload_file(&storage, &config, "data.csv", b"a,b\n1,2\n");
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Unsupported file type"));
        assert!(!config.storage.upload_dir.exists());
    }

    #[test]
    fn test_corrupt_upload_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SheetChatConfig::default();
        config.storage.upload_dir = dir.path().join("uploads");
        let storage = Storage::open_in_memory().unwrap();

        let outcome = upload_file(&storage, &config, "broken.xlsx", b"not a workbook");
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Error processing file"), "{}", outcome.message);
        assert_eq!(fs::read_dir(&config.storage.upload_dir).unwrap().count(), 0);
        assert!(storage.list_excel_files().unwrap().is_empty());
    }
}
