//! Append-only per-project record of board mutations.
//!
//! Entries are CSV rows `timestamp,action,details`. Details that contain a
//! delimiter are quoted; everything else is written bare, so logs stay
//! readable by tools expecting the unquoted format. Readers accept legacy
//! rows whose details were written with unescaped commas.

use chrono::{Local, NaiveDateTime};
use std::cell::RefCell;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::BoardResult;

pub const LOG_HEADER: [&str; 3] = ["timestamp", "action", "details"];
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    TaskCreated,
    TaskEdited,
    TaskDeleted,
    TaskMoved,
    ColumnCreated,
    ColumnRemoved,
    ColumnRenamed,
    ColumnMoved,
    WipLimitSet,
    WipLimitChanged,
    ProjectDeleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCreated => "Task Created",
            Self::TaskEdited => "Task Edited",
            Self::TaskDeleted => "Task Deleted",
            Self::TaskMoved => "Task Moved",
            Self::ColumnCreated => "Column Created",
            Self::ColumnRemoved => "Column Removed",
            Self::ColumnRenamed => "Column Renamed",
            Self::ColumnMoved => "Column Moved",
            Self::WipLimitSet => "WIP Limit Set",
            Self::WipLimitChanged => "WIP Limit Changed",
            Self::ProjectDeleted => "Project Deleted",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: NaiveDateTime,
    pub action: AuditAction,
    pub details: String,
}

impl AuditEntry {
    pub fn now(action: AuditAction, details: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            action,
            details: details.into(),
        }
    }
}

/// A row read back from a log file. Actions stay textual so rows written
/// by older versions still load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: String,
    pub action: String,
    pub details: String,
}

/// Destination for audit entries emitted by a board.
pub trait AuditSink {
    fn append(&mut self, entry: &AuditEntry) -> BoardResult<()>;
}

/// Appends entries to a CSV file, writing the header when the file is new.
#[derive(Debug, Clone)]
pub struct CsvAuditLog {
    path: PathBuf,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSink for CsvAuditLog {
    fn append(&mut self, entry: &AuditEntry) -> BoardResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let is_new = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(LOG_HEADER)?;
        }
        let timestamp = entry.timestamp.format(TIMESTAMP_FORMAT).to_string();
        writer.write_record([
            timestamp.as_str(),
            entry.action.as_str(),
            entry.details.as_str(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps entries in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    entries: Rc<RefCell<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.borrow().clone()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries.borrow().iter().map(|e| e.action).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&mut self, entry: &AuditEntry) -> BoardResult<()> {
        self.entries.borrow_mut().push(entry.clone());
        Ok(())
    }
}

/// Reads every row of a log file, skipping the header.
pub fn read_log(path: &Path) -> BoardResult<Vec<LogLine>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        lines.push(LogLine {
            timestamp: field(0),
            action: field(1),
            details: record.iter().skip(2).collect::<Vec<_>>().join(","),
        });
    }
    Ok(lines)
}
