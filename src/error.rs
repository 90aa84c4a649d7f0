use std::path::PathBuf;
use thiserror::Error;

/// A board operation that was declined. Refusals never mutate state and
/// never produce an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("the board already holds the maximum of {0} columns")]
    ColumnLimitReached(usize),

    #[error("the board already holds the maximum of {0} tasks")]
    TaskLimitReached(usize),

    #[error("column '{column}' is at its WIP limit of {limit}")]
    WipLimitReached { column: String, limit: u32 },

    #[error("WIP limit {0} is outside the allowed range 0..=50")]
    WipLimitOutOfRange(u32),

    #[error("column '{column}' already holds {count} tasks, more than the requested limit")]
    WipLimitBelowCount { column: String, count: usize },

    #[error("a 'To Do' column already exists")]
    DuplicateToDo,

    #[error("the 'To Do' column cannot be renamed, moved or deleted")]
    ProtectedColumn,

    #[error("there is no 'To Do' column to create tasks in")]
    NoToDoColumn,

    #[error("no column found at the drop position")]
    NoTargetColumn,

    #[error("the column cannot move further in that direction")]
    AtBoardEdge,

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("only an admin session may do this")]
    AdminOnly,

    #[error("unknown column")]
    UnknownColumn,

    #[error("unknown task")]
    UnknownTask,
}

/// Faults raised while loading, saving or copying board files.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("malformed board file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("invalid project name '{0}'")]
    InvalidProjectName(String),

    #[error("project '{0}' does not exist")]
    ProjectNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audit log error: {0}")]
    Csv(#[from] csv::Error),
}

impl BoardError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type BoardResult<T> = Result<T, BoardError>;
