//! Board files on disk, keyed by project name.
//!
//! Layout under the data directory:
//! - `<project>.json` the board document
//! - `Log_<project>.csv` the audit log, which outlives the board file

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::audit::{AuditAction, AuditEntry, AuditSink, CsvAuditLog};
use crate::document::BoardDocument;
use crate::error::{BoardError, BoardResult};

pub const DEFAULT_DATA_DIR: &str = "Project Files";
const BOARD_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project names double as file stems, so they may not be empty,
    /// hidden, or contain path separators.
    pub fn validate_name(name: &str) -> BoardResult<()> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed != name
            || name.starts_with('.')
            || name.contains(['/', '\\'])
        {
            return Err(BoardError::InvalidProjectName(name.to_string()));
        }
        Ok(())
    }

    pub fn board_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{BOARD_EXTENSION}"))
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("Log_{name}.csv"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.board_path(name).is_file()
    }

    /// Names of all stored boards, alphabetically.
    pub fn list_projects(&self) -> BoardResult<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(BOARD_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn any_projects(&self) -> BoardResult<bool> {
        Ok(!self.list_projects()?.is_empty())
    }

    /// Reads a board document. A missing file is `Ok(None)`.
    pub fn load_document(&self, name: &str) -> BoardResult<Option<BoardDocument>> {
        Self::validate_name(name)?;
        let path = self.board_path(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(project = name, "no board file yet");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let document = BoardDocument::from_json(&text)
            .map_err(|e| BoardError::malformed(&path, e.to_string()))?;
        Ok(Some(document))
    }

    /// Rewrites the whole board file through a temporary sibling.
    pub fn save_document(&self, name: &str, document: &BoardDocument) -> BoardResult<()> {
        Self::validate_name(name)?;
        fs::create_dir_all(&self.root)?;
        let path = self.board_path(name);
        let tmp = path.with_extension(format!("{BOARD_EXTENSION}.tmp"));
        fs::write(&tmp, document.to_json_pretty()?)?;
        fs::rename(&tmp, &path)?;
        info!(project = name, path = %path.display(), "board saved");
        Ok(())
    }

    /// Removes the board file and notes the deletion in its log.
    pub fn delete_project(&self, name: &str) -> BoardResult<()> {
        Self::validate_name(name)?;
        let path = self.board_path(name);
        if !path.is_file() {
            return Err(BoardError::ProjectNotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        CsvAuditLog::new(self.log_path(name)).append(&AuditEntry::now(
            AuditAction::ProjectDeleted,
            format!("Project '{name}' board file deleted"),
        ))?;
        info!(project = name, "project deleted, log preserved");
        Ok(())
    }

    pub fn export_project(&self, name: &str, destination: &Path) -> BoardResult<u64> {
        Self::validate_name(name)?;
        copy_existing(name, &self.board_path(name), destination)
    }

    pub fn export_log(&self, name: &str, destination: &Path) -> BoardResult<u64> {
        Self::validate_name(name)?;
        copy_existing(name, &self.log_path(name), destination)
    }
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

fn copy_existing(name: &str, source: &Path, destination: &Path) -> BoardResult<u64> {
    if !source.is_file() {
        return Err(BoardError::ProjectNotFound(name.to_string()));
    }
    let bytes = fs::copy(source, destination)?;
    info!(
        project = name,
        from = %source.display(),
        to = %destination.display(),
        bytes,
        "exported"
    );
    Ok(bytes)
}
