use std::fmt;
use uuid::Uuid;

use crate::document::ColumnRecord;
use crate::error::Refusal;
use crate::task::{Task, TaskId};

pub const TODO_TITLE: &str = "To Do";
pub const MAX_WIP_LIMIT: u32 = 50;

/// Whether `title` names the reserved intake column. Case-insensitive.
pub fn is_todo_title(title: &str) -> bool {
    title.trim().eq_ignore_ascii_case(TODO_TITLE)
}

/// Session-scoped handle for a column. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId(Uuid);

impl ColumnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ColumnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of replacing a column's WIP limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipChange {
    Unchanged,
    /// Went from unlimited to a limit.
    Set { limit: u32 },
    Changed { from: u32, to: u32 },
}

/// An ordered list of tasks with an optional WIP limit (0 = unlimited).
#[derive(Debug, Clone)]
pub struct Column {
    id: ColumnId,
    title: String,
    wip_limit: u32,
    tasks: Vec<Task>,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ColumnId::new(),
            title: title.into(),
            wip_limit: 0,
            tasks: Vec::new(),
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn wip_limit(&self) -> u32 {
        self.wip_limit
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_todo(&self) -> bool {
        is_todo_title(&self.title)
    }

    /// True when a WIP limit is set and reached.
    pub fn is_full(&self) -> bool {
        self.wip_limit > 0 && self.tasks.len() >= self.wip_limit as usize
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }

    pub fn position_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id() == id)
    }

    /// Appends the task unless the WIP limit is reached, in which case the
    /// task is handed back untouched.
    pub fn add_task(&mut self, mut task: Task) -> Result<(), Task> {
        if self.is_full() {
            return Err(task);
        }
        task.column = Some(self.id);
        self.tasks.push(task);
        Ok(())
    }

    /// Puts a task back at `index`, bypassing admission. Used to undo a
    /// removal made by the same operation.
    pub(crate) fn restore_task(&mut self, index: usize, mut task: Task) {
        task.column = Some(self.id);
        let index = index.min(self.tasks.len());
        self.tasks.insert(index, task);
    }

    pub fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        let index = self.position_of(id)?;
        let mut task = self.tasks.remove(index);
        task.column = None;
        Some(task)
    }

    pub fn set_wip_limit(&mut self, limit: u32) -> Result<WipChange, Refusal> {
        if limit > MAX_WIP_LIMIT {
            return Err(Refusal::WipLimitOutOfRange(limit));
        }
        if limit > 0 && (limit as usize) < self.tasks.len() {
            return Err(Refusal::WipLimitBelowCount {
                column: self.title.clone(),
                count: self.tasks.len(),
            });
        }

        let previous = std::mem::replace(&mut self.wip_limit, limit);
        Ok(match (previous, limit) {
            (from, to) if from == to => WipChange::Unchanged,
            (0, to) => WipChange::Set { limit: to },
            (from, to) => WipChange::Changed { from, to },
        })
    }

    /// Renames the column and returns the previous title, or `None` when
    /// the title is unchanged. Uniqueness of "To Do" is checked by the board.
    pub fn rename(&mut self, new_title: &str) -> Result<Option<String>, Refusal> {
        if self.is_todo() {
            return Err(Refusal::ProtectedColumn);
        }
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(Refusal::EmptyTitle);
        }
        if new_title == self.title {
            return Ok(None);
        }
        Ok(Some(std::mem::replace(
            &mut self.title,
            new_title.to_string(),
        )))
    }

    pub fn to_record(&self) -> ColumnRecord {
        ColumnRecord {
            name: self.title.clone(),
            wip_limit: self.wip_limit,
            tasks: self.tasks.iter().map(Task::to_record).collect(),
        }
    }

    pub fn from_record(record: ColumnRecord) -> Result<Self, String> {
        if record.name.trim().is_empty() {
            return Err("column name is empty".to_string());
        }
        if record.wip_limit > MAX_WIP_LIMIT {
            return Err(format!(
                "column '{}' has WIP limit {} above {MAX_WIP_LIMIT}",
                record.name, record.wip_limit
            ));
        }
        if record.wip_limit > 0 && record.tasks.len() > record.wip_limit as usize {
            return Err(format!(
                "column '{}' holds {} tasks, exceeding its WIP limit of {}",
                record.name,
                record.tasks.len(),
                record.wip_limit
            ));
        }

        let mut column = Self::new(record.name);
        column.wip_limit = record.wip_limit;
        for task in record.tasks {
            let mut task = Task::from_record(task)?;
            task.column = Some(column.id);
            column.tasks.push(task);
        }
        Ok(column)
    }
}
