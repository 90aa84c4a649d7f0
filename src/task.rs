use chrono::{Local, NaiveDate};
use std::fmt;
use uuid::Uuid;

use crate::column::ColumnId;
use crate::document::{TaskRecord, DATE_FORMAT};

/// Session-scoped handle for a task. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    pub title: String,
    pub assignee: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: String,
    pub(crate) column: Option<ColumnId>,
}

/// The editable fields of a task, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Title,
    Assignee,
    StartDate,
    EndDate,
    Description,
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "Title",
            Self::Assignee => "Assignee",
            Self::StartDate => "Start Date",
            Self::EndDate => "End Date",
            Self::Description => "Description",
        };
        f.write_str(name)
    }
}

/// Replacement values for every field of a task. Edits are full
/// replacements, not patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: String,
    pub assignee: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: String,
}

impl From<&Task> for TaskEdit {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            assignee: task.assignee.clone(),
            start_date: task.start_date,
            end_date: task.end_date,
            description: task.description.clone(),
        }
    }
}

impl Task {
    /// A new task dated today.
    pub fn create(title: impl Into<String>) -> Self {
        Self::created_on(title, Local::now().date_naive())
    }

    pub fn created_on(title: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            assignee: String::new(),
            start_date: Some(today),
            end_date: Some(today),
            description: String::new(),
            column: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The column currently holding this task, if any.
    pub fn column(&self) -> Option<ColumnId> {
        self.column
    }

    /// Overwrites every field and returns the ones whose value differed.
    pub fn edit(&mut self, edit: TaskEdit) -> Vec<TaskField> {
        let mut changed = Vec::new();
        if self.title != edit.title {
            changed.push(TaskField::Title);
        }
        if self.assignee != edit.assignee {
            changed.push(TaskField::Assignee);
        }
        if self.start_date != edit.start_date {
            changed.push(TaskField::StartDate);
        }
        if self.end_date != edit.end_date {
            changed.push(TaskField::EndDate);
        }
        if self.description != edit.description {
            changed.push(TaskField::Description);
        }

        self.title = edit.title;
        self.assignee = edit.assignee;
        self.start_date = edit.start_date;
        self.end_date = edit.end_date;
        self.description = edit.description;
        changed
    }

    /// Days until the end date; negative when overdue. `None` without an end date.
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.end_date.map(|end| (end - today).num_days())
    }

    /// Multi-line description shown next to a selected task.
    pub fn summary(&self, today: NaiveDate) -> String {
        let format_date = |date: Option<NaiveDate>| {
            date.map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default()
        };
        let mut summary = format!(
            "Title: {}\nAssignee: {}\nStart Date: {}\nEnd Date: {}",
            self.title,
            self.assignee,
            format_date(self.start_date),
            format_date(self.end_date),
        );
        match self.days_remaining(today) {
            Some(days) if days >= 0 => {
                summary.push_str(&format!("\nDays Remaining: {days} days"));
            }
            Some(days) => {
                summary.push_str(&format!("\nTask overdue by {} days!", -days));
            }
            None => {}
        }
        summary.push_str(&format!("\nDescription: {}", self.description));
        summary
    }

    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            title: self.title.clone(),
            assignee: self.assignee.clone(),
            start_date: self.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
            end_date: self.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
            description: self.description.clone(),
        }
    }

    /// Builds a task from its stored form. Absent or blank dates become unset.
    pub fn from_record(record: TaskRecord) -> Result<Self, String> {
        if record.title.trim().is_empty() {
            return Err("task title is empty".to_string());
        }
        let start_date = parse_date(record.start_date.as_deref())?;
        let end_date = parse_date(record.end_date.as_deref())?;
        Ok(Self {
            id: TaskId::new(),
            title: record.title,
            assignee: record.assignee,
            start_date,
            end_date,
            description: record.description,
            column: None,
        })
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|e| format!("invalid date '{text}': {e}")),
    }
}
