//! Sequential `file<N>` renaming of stored workbooks
//!
//! Renaming happens in two phases (every file to a temporary name, then to its
//! final name) so that shifting `file3 -> file2` while `file2 -> file1` never
//! collides. Completed moves can be undone when a later step fails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A planned change of a stored file's name and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub file_id: i64,
    pub new_name: String,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

/// `file<index><ext>`, keeping the extension of `old_name`
pub fn sequential_name(index: usize, old_name: &str) -> String {
    match Path::new(old_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("file{}.{}", index, ext),
        None => format!("file{}", index),
    }
}

/// Plan renames for `(id, name, path)` rows given in ascending id order.
/// Rows already carrying their sequential name are left out.
pub fn plan_renumbering(files: &[(i64, String, PathBuf)]) -> Vec<Rename> {
    files
        .iter()
        .enumerate()
        .filter_map(|(idx, (id, name, path))| {
            let new_name = sequential_name(idx + 1, name);
            if *name == new_name {
                return None;
            }
            let new_path = path
                .parent()
                .map(|dir| dir.join(&new_name))
                .unwrap_or_else(|| PathBuf::from(&new_name));
            Some(Rename {
                file_id: *id,
                new_name,
                old_path: path.clone(),
                new_path,
            })
        })
        .collect()
}

/// Journal of completed moves, replayable backwards
#[derive(Debug, Default)]
pub struct FileMoves {
    done: Vec<(PathBuf, PathBuf)>,
}

impl FileMoves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `from` to `to`, refusing to overwrite an existing file
    pub fn move_file(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        fs::rename(from, to)?;
        self.done.push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    /// Revert every completed move, most recent first
    pub fn undo(self) {
        for (from, to) in self.done.into_iter().rev() {
            if let Err(e) = fs::rename(&to, &from) {
                log::warn!(
                    "Failed to restore {} from {}: {}",
                    from.display(),
                    to.display(),
                    e
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
}

/// Apply planned renames on disk. Files missing on disk are skipped.
/// On failure every move made so far is reverted.
pub fn apply_renames(renames: &[Rename], moves: &mut FileMoves) -> io::Result<()> {
    let mut staged = Vec::new();
    for rename in renames.iter().filter(|r| r.old_path.exists()) {
        let tmp = temporary_path(&rename.new_path);
        moves.move_file(&rename.old_path, &tmp)?;
        staged.push((tmp, &rename.new_path));
    }
    for (tmp, final_path) in staged {
        moves.move_file(&tmp, final_path)?;
    }
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.renumber", name))
}
