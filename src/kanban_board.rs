use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, warn};

use crate::audit::{AuditAction, AuditEntry, AuditSink, CsvAuditLog};
use crate::column::{is_todo_title, Column, ColumnId, WipChange, TODO_TITLE};
use crate::document::BoardDocument;
use crate::error::{BoardError, BoardResult, Refusal};
use crate::placement::{resolve_target, PlacementHint};
use crate::registry::ProjectStore;
use crate::task::{Task, TaskEdit, TaskField, TaskId};

pub const MAX_TASKS: usize = 50;
pub const MAX_COLUMNS: usize = 10;

/// Who opened the board. Admins may create tasks, add and delete columns
/// and set WIP limits. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: ColumnId, to: ColumnId },
    /// The task was dropped back onto its own column.
    Stayed,
}

/// A project's columns and tasks.
///
/// Every mutation either succeeds and writes one audit entry, or returns a
/// [`Refusal`] with the board untouched. `task_count` always equals the
/// number of tasks held across all columns.
pub struct KanbanBoard {
    project_name: String,
    session: Session,
    columns: Vec<Column>,
    task_counter: usize,
    audit: Box<dyn AuditSink>,
    backlog: VecDeque<AuditEntry>,
}

impl fmt::Debug for KanbanBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KanbanBoard")
            .field("project_name", &self.project_name)
            .field("session", &self.session)
            .field("columns", &self.columns)
            .field("task_counter", &self.task_counter)
            .field("backlog", &self.backlog.len())
            .finish_non_exhaustive()
    }
}

impl KanbanBoard {
    /// A fresh board holding only the "To Do" column.
    pub fn new(
        project_name: impl Into<String>,
        session: Session,
        audit: Box<dyn AuditSink>,
    ) -> Self {
        let mut board = Self {
            project_name: project_name.into(),
            session,
            columns: Vec::new(),
            task_counter: 0,
            audit,
            backlog: VecDeque::new(),
        };
        board.reset_to_fresh();
        board
    }

    /// Builds a board from a stored document. Nothing is logged.
    pub fn from_document(
        project_name: impl Into<String>,
        session: Session,
        audit: Box<dyn AuditSink>,
        document: BoardDocument,
    ) -> Result<Self, String> {
        let (columns, task_counter) = hydrate(document)?;
        Ok(Self {
            project_name: project_name.into(),
            session,
            columns,
            task_counter,
            audit,
            backlog: VecDeque::new(),
        })
    }

    /// Opens a project from the store, starting fresh when it has no file.
    pub fn open(store: &ProjectStore, project_name: &str, session: Session) -> BoardResult<Self> {
        ProjectStore::validate_name(project_name)?;
        let audit = Box::new(CsvAuditLog::new(store.log_path(project_name)));
        match store.load_document(project_name)? {
            Some(document) => {
                let board = Self::from_document(project_name, session, audit, document)
                    .map_err(|reason| {
                        BoardError::malformed(store.board_path(project_name), reason)
                    })?;
                info!(
                    project = project_name,
                    columns = board.columns.len(),
                    tasks = board.task_counter,
                    "board loaded"
                );
                Ok(board)
            }
            None => {
                info!(project = project_name, "starting a new board");
                Ok(Self::new(project_name, session, audit))
            }
        }
    }

    /// Replaces the in-memory columns with the stored ones. On error the
    /// board keeps its current state.
    pub fn reload(&mut self, store: &ProjectStore) -> BoardResult<()> {
        match store.load_document(&self.project_name)? {
            Some(document) => {
                let (columns, task_counter) = hydrate(document).map_err(|reason| {
                    BoardError::malformed(store.board_path(&self.project_name), reason)
                })?;
                self.columns = columns;
                self.task_counter = task_counter;
            }
            None => self.reset_to_fresh(),
        }
        self.check_counter();
        Ok(())
    }

    /// Writes the whole board, then any audit entries still pending.
    pub fn save(&mut self, store: &ProjectStore) -> BoardResult<()> {
        store.save_document(&self.project_name, &self.to_document())?;
        self.flush_audit()
    }

    /// Lifecycle hook for leaving the board view.
    pub fn on_close(&mut self, store: &ProjectStore) -> BoardResult<()> {
        debug!(project = %self.project_name, "closing board");
        self.save(store)
    }

    pub fn to_document(&self) -> BoardDocument {
        BoardDocument {
            columns: self.columns.iter().map(Column::to_record).collect(),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn is_admin_session(&self) -> bool {
        self.session == Session::Admin
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id() == id)
    }

    pub fn todo_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_todo())
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.columns.iter().find_map(|c| c.task(id))
    }

    /// Column index and position within that column.
    pub fn locate_task(&self, id: TaskId) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(ci, c)| c.position_of(id).map(|ti| (ci, ti)))
    }

    pub fn task_count(&self) -> usize {
        self.task_counter
    }

    /// Audit entries the sink has not accepted yet.
    pub fn pending_audit_entries(&self) -> usize {
        self.backlog.len()
    }

    pub fn add_column(&mut self, title: Option<&str>) -> Result<ColumnId, Refusal> {
        self.require_admin()?;
        if self.columns.len() >= MAX_COLUMNS {
            return Err(Refusal::ColumnLimitReached(MAX_COLUMNS));
        }
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Column {}", self.columns.len() + 1),
        };
        if is_todo_title(&title) && self.todo_column().is_some() {
            return Err(Refusal::DuplicateToDo);
        }

        let column = Column::new(title);
        let id = column.id();
        let details = format!("'{}' column added", column.title());
        self.columns.push(column);
        self.emit(AuditAction::ColumnCreated, details);
        Ok(id)
    }

    /// Removes a column along with its tasks.
    pub fn remove_column(&mut self, id: ColumnId) -> Result<Column, Refusal> {
        self.require_admin()?;
        let index = self.column_index(id)?;
        if self.columns[index].is_todo() {
            return Err(Refusal::ProtectedColumn);
        }

        let column = self.columns.remove(index);
        self.task_counter -= column.task_count();
        self.emit(
            AuditAction::ColumnRemoved,
            format!(
                "'{}' column removed with {} task(s)",
                column.title(),
                column.task_count()
            ),
        );
        self.check_counter();
        Ok(column)
    }

    /// Swaps a column with its neighbour. Slot 0 and the "To Do" column
    /// are pinned.
    pub fn move_column(&mut self, id: ColumnId, direction: Direction) -> Result<(), Refusal> {
        let index = self.column_index(id)?;
        if index == 0 || self.columns[index].is_todo() {
            return Err(Refusal::ProtectedColumn);
        }
        let target = match direction {
            Direction::Left if index > 1 => index - 1,
            Direction::Right if index + 1 < self.columns.len() => index + 1,
            _ => return Err(Refusal::AtBoardEdge),
        };
        if self.columns[target].is_todo() {
            return Err(Refusal::ProtectedColumn);
        }

        self.columns.swap(index, target);
        let details = format!(
            "'{}' moved {}",
            self.columns[target].title(),
            direction.as_str()
        );
        self.emit(AuditAction::ColumnMoved, details);
        Ok(())
    }

    pub fn rename_column(&mut self, id: ColumnId, new_title: &str) -> Result<(), Refusal> {
        let index = self.column_index(id)?;
        if self.columns[index].is_todo() {
            return Err(Refusal::ProtectedColumn);
        }
        if is_todo_title(new_title) && self.todo_column().is_some() {
            return Err(Refusal::DuplicateToDo);
        }

        if let Some(old) = self.columns[index].rename(new_title)? {
            let details = format!("'{old}' renamed to '{}'", self.columns[index].title());
            self.emit(AuditAction::ColumnRenamed, details);
        }
        Ok(())
    }

    pub fn set_wip_limit(&mut self, id: ColumnId, limit: u32) -> Result<WipChange, Refusal> {
        self.require_admin()?;
        let index = self.column_index(id)?;
        let change = self.columns[index].set_wip_limit(limit)?;
        let title = self.columns[index].title().to_string();
        match change {
            WipChange::Unchanged => {}
            WipChange::Set { limit } => self.emit(
                AuditAction::WipLimitSet,
                format!("WIP limit for '{title}' set to {limit}"),
            ),
            WipChange::Changed { from, to } => self.emit(
                AuditAction::WipLimitChanged,
                format!("WIP limit for '{title}' changed from {from} to {to}"),
            ),
        }
        Ok(change)
    }

    /// Creates a task in the "To Do" column.
    pub fn create_task(&mut self, title: Option<&str>) -> Result<TaskId, Refusal> {
        self.require_admin()?;
        if self.task_counter >= MAX_TASKS {
            return Err(Refusal::TaskLimitReached(MAX_TASKS));
        }
        let index = self
            .columns
            .iter()
            .position(Column::is_todo)
            .ok_or(Refusal::NoToDoColumn)?;
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Task {}", self.task_counter + 1),
        };

        let task = Task::create(title);
        let id = task.id();
        let details = format!("'{}' in column '{}'", task.title, self.columns[index].title());
        let column = &mut self.columns[index];
        if column.add_task(task).is_err() {
            return Err(Refusal::WipLimitReached {
                column: column.title().to_string(),
                limit: column.wip_limit(),
            });
        }
        self.task_counter += 1;
        self.emit(AuditAction::TaskCreated, details);
        self.check_counter();
        Ok(id)
    }

    /// Replaces every field of a task, logging which ones changed.
    pub fn edit_task(&mut self, id: TaskId, edit: TaskEdit) -> Result<Vec<TaskField>, Refusal> {
        if edit.title.trim().is_empty() {
            return Err(Refusal::EmptyTitle);
        }
        let task = self
            .columns
            .iter_mut()
            .find_map(|c| c.task_mut(id))
            .ok_or(Refusal::UnknownTask)?;

        let changed = task.edit(edit);
        if !changed.is_empty() {
            let fields: Vec<_> = changed.iter().map(ToString::to_string).collect();
            let details = format!("'{}' fields changed: {}", task.title, fields.join(", "));
            self.emit(AuditAction::TaskEdited, details);
        }
        Ok(changed)
    }

    /// Moves a task to the column the hint resolves to. If the target
    /// refuses it, the task goes back to its original position.
    pub fn move_task(
        &mut self,
        id: TaskId,
        hint: PlacementHint<'_>,
    ) -> Result<MoveOutcome, Refusal> {
        let (source, position) = self.locate_task(id).ok_or(Refusal::UnknownTask)?;
        let target_id = resolve_target(&self.columns, &hint).ok_or(match hint {
            PlacementHint::Column(_) => Refusal::UnknownColumn,
            PlacementHint::Region { .. } => Refusal::NoTargetColumn,
        })?;
        let source_id = self.columns[source].id();
        if target_id == source_id {
            return Ok(MoveOutcome::Stayed);
        }
        let target = self.column_index(target_id)?;

        let task = self.columns[source]
            .remove_task(id)
            .ok_or(Refusal::UnknownTask)?;
        let title = task.title.clone();
        if let Err(task) = self.columns[target].add_task(task) {
            self.columns[source].restore_task(position, task);
            let column = &self.columns[target];
            return Err(Refusal::WipLimitReached {
                column: column.title().to_string(),
                limit: column.wip_limit(),
            });
        }

        let details = format!("'{title}' moved to '{}'", self.columns[target].title());
        self.emit(AuditAction::TaskMoved, details);
        self.check_counter();
        Ok(MoveOutcome::Moved {
            from: source_id,
            to: target_id,
        })
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Task, Refusal> {
        let (column, _) = self.locate_task(id).ok_or(Refusal::UnknownTask)?;
        let task = self.columns[column]
            .remove_task(id)
            .ok_or(Refusal::UnknownTask)?;
        self.task_counter -= 1;
        self.emit(AuditAction::TaskDeleted, format!("'{}' deleted", task.title));
        self.check_counter();
        Ok(task)
    }

    /// Retries audit entries the sink rejected earlier.
    pub fn flush_audit(&mut self) -> BoardResult<()> {
        while let Some(entry) = self.backlog.front() {
            self.audit.append(entry)?;
            self.backlog.pop_front();
        }
        Ok(())
    }

    fn reset_to_fresh(&mut self) {
        self.columns.clear();
        self.task_counter = 0;
        self.columns.push(Column::new(TODO_TITLE));
        self.emit(
            AuditAction::ColumnCreated,
            format!("'{TODO_TITLE}' column added"),
        );
    }

    fn require_admin(&self) -> Result<(), Refusal> {
        if self.is_admin_session() {
            Ok(())
        } else {
            Err(Refusal::AdminOnly)
        }
    }

    fn column_index(&self, id: ColumnId) -> Result<usize, Refusal> {
        self.columns
            .iter()
            .position(|c| c.id() == id)
            .ok_or(Refusal::UnknownColumn)
    }

    fn emit(&mut self, action: AuditAction, details: String) {
        debug!(project = %self.project_name, %action, %details, "board changed");
        self.backlog.push_back(AuditEntry::now(action, details));
        if let Err(err) = self.flush_audit() {
            warn!(
                project = %self.project_name,
                pending = self.backlog.len(),
                error = %err,
                "audit log unavailable, keeping entries for retry"
            );
        }
    }

    fn check_counter(&self) {
        debug_assert_eq!(
            self.task_counter,
            self.columns.iter().map(Column::task_count).sum::<usize>(),
            "task counter drifted from column contents"
        );
    }
}

fn hydrate(document: BoardDocument) -> Result<(Vec<Column>, usize), String> {
    if document.columns.len() > MAX_COLUMNS {
        return Err(format!(
            "{} columns exceed the maximum of {MAX_COLUMNS}",
            document.columns.len()
        ));
    }
    let total = document.task_total();
    if total > MAX_TASKS {
        return Err(format!("{total} tasks exceed the maximum of {MAX_TASKS}"));
    }
    let todo_columns = document
        .columns
        .iter()
        .filter(|c| is_todo_title(&c.name))
        .count();
    if todo_columns > 1 {
        return Err(format!("{todo_columns} columns are named '{TODO_TITLE}'"));
    }

    let columns = document
        .columns
        .into_iter()
        .map(Column::from_record)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((columns, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::error::BoardError;
    use crate::placement::{BoardLayout, Region};

    fn board(session: Session) -> (KanbanBoard, MemoryAuditLog) {
        let log = MemoryAuditLog::new();
        let board = KanbanBoard::new("demo", session, Box::new(log.clone()));
        (board, log)
    }

    fn to(column: ColumnId) -> PlacementHint<'static> {
        PlacementHint::Column(column)
    }

    #[derive(Debug, Default)]
    struct BrokenSink {
        fail: std::rc::Rc<std::cell::Cell<bool>>,
        written: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl AuditSink for BrokenSink {
        fn append(&mut self, _entry: &AuditEntry) -> BoardResult<()> {
            if self.fail.get() {
                return Err(BoardError::Io(std::io::Error::other("disk full")));
            }
            self.written.set(self.written.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn new_board_has_only_todo() {
        let (board, log) = board(Session::User);
        assert_eq!(board.columns().len(), 1);
        assert_eq!(board.columns()[0].title(), TODO_TITLE);
        assert_eq!(board.task_count(), 0);
        assert_eq!(log.actions(), vec![AuditAction::ColumnCreated]);
    }

    #[test]
    fn column_cap_is_ten() {
        let (mut board, _) = board(Session::Admin);
        for _ in 1..MAX_COLUMNS {
            board.add_column(None).unwrap();
        }
        assert_eq!(board.columns().len(), MAX_COLUMNS);
        assert_eq!(board.columns()[9].title(), "Column 10");
        assert_eq!(
            board.add_column(Some("Extra")),
            Err(Refusal::ColumnLimitReached(MAX_COLUMNS))
        );
        assert_eq!(board.columns().len(), MAX_COLUMNS);
    }

    #[test]
    fn column_administration_requires_admin() {
        let (mut board, log) = board(Session::User);
        let todo = board.columns()[0].id();
        assert_eq!(board.add_column(Some("Doing")), Err(Refusal::AdminOnly));
        assert_eq!(board.set_wip_limit(todo, 3), Err(Refusal::AdminOnly));
        assert!(matches!(board.remove_column(todo), Err(Refusal::AdminOnly)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn task_creation_requires_admin() {
        let (mut board, log) = board(Session::User);
        assert_eq!(board.create_task(Some("by plain user")), Err(Refusal::AdminOnly));
        assert_eq!(board.task_count(), 0);
        assert!(board.columns()[0].tasks().is_empty());
        assert_eq!(log.actions(), vec![AuditAction::ColumnCreated]);
    }

    #[test]
    fn plain_users_work_on_loaded_tasks() {
        let document = BoardDocument::from_json(
            r#"{"columns": [
                {"name": "To Do", "tasks": [{"title": "Seeded"}]},
                {"name": "Doing"}
            ]}"#,
        )
        .unwrap();
        let log = MemoryAuditLog::new();
        let mut board =
            KanbanBoard::from_document("demo", Session::User, Box::new(log.clone()), document)
                .unwrap();
        let id = board.columns()[0].tasks()[0].id();
        let doing = board.columns()[1].id();

        board.move_task(id, to(doing)).unwrap();
        let mut edit = TaskEdit::from(board.task(id).unwrap());
        edit.assignee = "kim".into();
        board.edit_task(id, edit).unwrap();
        board.delete_task(id).unwrap();
        assert_eq!(
            log.actions(),
            vec![
                AuditAction::TaskMoved,
                AuditAction::TaskEdited,
                AuditAction::TaskDeleted
            ]
        );
        assert_eq!(board.task_count(), 0);
    }

    #[test]
    fn second_todo_column_is_refused() {
        let (mut board, _) = board(Session::Admin);
        assert_eq!(board.add_column(Some("to do")), Err(Refusal::DuplicateToDo));
        let doing = board.add_column(Some("Doing")).unwrap();
        assert_eq!(board.rename_column(doing, "TO DO"), Err(Refusal::DuplicateToDo));
        assert_eq!(board.column(doing).unwrap().title(), "Doing");
    }

    #[test]
    fn todo_column_is_protected() {
        let (mut board, log) = board(Session::Admin);
        let todo = board.columns()[0].id();
        let logged = log.len();
        assert!(matches!(board.remove_column(todo), Err(Refusal::ProtectedColumn)));
        assert_eq!(board.rename_column(todo, "Inbox"), Err(Refusal::ProtectedColumn));
        assert_eq!(
            board.move_column(todo, Direction::Right),
            Err(Refusal::ProtectedColumn)
        );
        assert_eq!(log.len(), logged);
    }

    #[test]
    fn rename_logs_old_and_new() {
        let (mut board, log) = board(Session::Admin);
        let doing = board.add_column(Some("Doing")).unwrap();
        board.rename_column(doing, "In Progress").unwrap();
        let last = log.entries().pop().unwrap();
        assert_eq!(last.action, AuditAction::ColumnRenamed);
        assert_eq!(last.details, "'Doing' renamed to 'In Progress'");

        let before = log.len();
        board.rename_column(doing, "In Progress").unwrap();
        assert_eq!(log.len(), before);
    }

    #[test]
    fn columns_never_move_into_first_slot() {
        let (mut board, log) = board(Session::Admin);
        let a = board.add_column(Some("A")).unwrap();
        let b = board.add_column(Some("B")).unwrap();

        assert_eq!(board.move_column(a, Direction::Left), Err(Refusal::AtBoardEdge));
        assert_eq!(board.move_column(b, Direction::Right), Err(Refusal::AtBoardEdge));

        board.move_column(a, Direction::Right).unwrap();
        let titles: Vec<_> = board.columns().iter().map(Column::title).collect();
        assert_eq!(titles, vec!["To Do", "B", "A"]);
        assert_eq!(log.entries().pop().unwrap().details, "'A' moved right");

        board.move_column(a, Direction::Left).unwrap();
        let titles: Vec<_> = board.columns().iter().map(Column::title).collect();
        assert_eq!(titles, vec!["To Do", "A", "B"]);
    }

    #[test]
    fn loaded_todo_column_cannot_be_swapped() {
        let document = BoardDocument::from_json(
            r#"{"columns": [{"name": "Backlog"}, {"name": "Doing"}, {"name": "To Do"}]}"#,
        )
        .unwrap();
        let log = MemoryAuditLog::new();
        let mut board =
            KanbanBoard::from_document("demo", Session::Admin, Box::new(log.clone()), document)
                .unwrap();
        let doing = board.columns()[1].id();

        assert_eq!(
            board.move_column(doing, Direction::Right),
            Err(Refusal::ProtectedColumn)
        );
        let titles: Vec<_> = board.columns().iter().map(Column::title).collect();
        assert_eq!(titles, vec!["Backlog", "Doing", "To Do"]);
        assert!(log.is_empty());
    }

    #[test]
    fn create_task_uses_counter_for_default_title() {
        let (mut board, log) = board(Session::Admin);
        let first = board.create_task(None).unwrap();
        let second = board.create_task(Some("  Named  ")).unwrap();
        assert_eq!(board.task(first).unwrap().title, "Task 1");
        assert_eq!(board.task(second).unwrap().title, "Named");
        assert_eq!(board.task_count(), 2);
        assert_eq!(
            log.entries().pop().unwrap().details,
            "'Named' in column 'To Do'"
        );
    }

    #[test]
    fn task_cap_is_fifty() {
        let (mut board, _) = board(Session::Admin);
        for _ in 0..MAX_TASKS {
            board.create_task(None).unwrap();
        }
        assert_eq!(
            board.create_task(None),
            Err(Refusal::TaskLimitReached(MAX_TASKS))
        );
        assert_eq!(board.task_count(), MAX_TASKS);
    }

    #[test]
    fn create_task_refused_by_full_todo_leaves_counter() {
        let (mut board, log) = board(Session::Admin);
        let todo = board.columns()[0].id();
        board.set_wip_limit(todo, 1).unwrap();
        board.create_task(None).unwrap();
        let logged = log.len();

        assert!(matches!(
            board.create_task(None),
            Err(Refusal::WipLimitReached { limit: 1, .. })
        ));
        assert_eq!(board.task_count(), 1);
        assert_eq!(log.len(), logged);
    }

    #[test]
    fn create_task_without_todo_column_is_refused() {
        let document = BoardDocument::from_json(r#"{"columns": [{"name": "Doing"}]}"#).unwrap();
        let audit = Box::new(MemoryAuditLog::new());
        let mut board =
            KanbanBoard::from_document("demo", Session::Admin, audit, document).unwrap();
        assert_eq!(board.create_task(None), Err(Refusal::NoToDoColumn));
    }

    #[test]
    fn edit_logs_changed_fields_only() {
        let (mut board, log) = board(Session::Admin);
        let id = board.create_task(Some("Spec")).unwrap();
        let mut edit = TaskEdit::from(board.task(id).unwrap());
        edit.assignee = "kim".into();
        edit.description = "draft it".into();

        let changed = board.edit_task(id, edit.clone()).unwrap();
        assert_eq!(changed, vec![TaskField::Assignee, TaskField::Description]);
        assert_eq!(
            log.entries().pop().unwrap().details,
            "'Spec' fields changed: Assignee, Description"
        );

        let before = log.len();
        assert!(board.edit_task(id, edit.clone()).unwrap().is_empty());
        assert_eq!(log.len(), before);

        edit.title = " ".into();
        assert_eq!(board.edit_task(id, edit), Err(Refusal::EmptyTitle));
    }

    #[test]
    fn failed_move_restores_original_index() {
        let (mut board, log) = board(Session::Admin);
        let doing = board.add_column(Some("Doing")).unwrap();
        board.set_wip_limit(doing, 1).unwrap();
        let ids: Vec<_> = (0..3).map(|_| board.create_task(None).unwrap()).collect();
        board.move_task(ids[0], to(doing)).unwrap();
        let logged = log.len();

        assert!(matches!(
            board.move_task(ids[1], to(doing)),
            Err(Refusal::WipLimitReached { .. })
        ));
        let todo: Vec<_> = board.columns()[0].tasks().iter().map(Task::id).collect();
        assert_eq!(todo, vec![ids[1], ids[2]]);
        assert_eq!(
            board.task(ids[1]).unwrap().column(),
            Some(board.columns()[0].id())
        );
        assert_eq!(log.len(), logged);
    }

    #[test]
    fn move_onto_own_column_stays() {
        let (mut board, log) = board(Session::Admin);
        let todo = board.columns()[0].id();
        let id = board.create_task(None).unwrap();
        let logged = log.len();
        assert_eq!(board.move_task(id, to(todo)), Ok(MoveOutcome::Stayed));
        assert_eq!(log.len(), logged);
    }

    #[test]
    fn drop_onto_own_column_region_stays() {
        let (mut board, log) = board(Session::Admin);
        board.add_column(Some("Doing")).unwrap();
        let mut layout = BoardLayout::new();
        for (i, column) in board.columns().iter().enumerate() {
            layout.insert(column.id(), Region::new(i as i32 * 20, 0, 20, 40));
        }
        let first = board.create_task(None).unwrap();
        let second = board.create_task(None).unwrap();
        let logged = log.len();

        let hint = PlacementHint::Region {
            area: Region::point(5, 5),
            layout: &layout,
        };
        assert_eq!(board.move_task(first, hint), Ok(MoveOutcome::Stayed));
        assert_eq!(board.locate_task(first), Some((0, 0)));
        assert_eq!(board.locate_task(second), Some((0, 1)));
        assert_eq!(log.len(), logged);
    }

    #[test]
    fn region_move_picks_first_intersecting_column() {
        let (mut board, log) = board(Session::Admin);
        let doing = board.add_column(Some("Doing")).unwrap();
        let done = board.add_column(Some("Done")).unwrap();
        let mut layout = BoardLayout::new();
        for (i, column) in board.columns().iter().enumerate() {
            layout.insert(column.id(), Region::new(i as i32 * 20, 0, 20, 40));
        }
        let id = board.create_task(None).unwrap();

        let hint = PlacementHint::Region {
            area: Region::new(35, 10, 10, 2),
            layout: &layout,
        };
        let todo = board.columns()[0].id();
        assert_eq!(
            board.move_task(id, hint),
            Ok(MoveOutcome::Moved { from: todo, to: doing })
        );
        assert_eq!(log.entries().pop().unwrap().details, "'Task 1' moved to 'Doing'");
        assert_eq!(board.column(done).unwrap().task_count(), 0);

        let nowhere = PlacementHint::Region {
            area: Region::point(500, 500),
            layout: &layout,
        };
        assert_eq!(board.move_task(id, nowhere), Err(Refusal::NoTargetColumn));
        assert_eq!(board.locate_task(id), Some((1, 0)));
    }

    #[test]
    fn move_to_unknown_column_is_refused() {
        let (mut board, _) = board(Session::Admin);
        let id = board.create_task(None).unwrap();
        assert_eq!(
            board.move_task(id, to(ColumnId::new())),
            Err(Refusal::UnknownColumn)
        );
        assert_eq!(
            board.move_task(TaskId::new(), to(board.columns()[0].id())),
            Err(Refusal::UnknownTask)
        );
    }

    #[test]
    fn removing_column_drops_its_tasks_from_counter() {
        let (mut board, log) = board(Session::Admin);
        let doing = board.add_column(Some("Doing")).unwrap();
        for _ in 0..3 {
            let id = board.create_task(None).unwrap();
            board.move_task(id, to(doing)).unwrap();
        }
        board.create_task(None).unwrap();

        let removed = board.remove_column(doing).unwrap();
        assert_eq!(removed.task_count(), 3);
        assert_eq!(board.task_count(), 1);
        assert_eq!(
            log.entries().pop().unwrap().details,
            "'Doing' column removed with 3 task(s)"
        );
    }

    #[test]
    fn delete_task_decrements_counter() {
        let (mut board, log) = board(Session::Admin);
        let id = board.create_task(Some("Gone")).unwrap();
        let task = board.delete_task(id).unwrap();
        assert_eq!(task.title, "Gone");
        assert_eq!(task.column(), None);
        assert_eq!(board.task_count(), 0);
        assert_eq!(log.actions().last(), Some(&AuditAction::TaskDeleted));
        assert!(matches!(board.delete_task(id), Err(Refusal::UnknownTask)));
    }

    #[test]
    fn audit_failures_are_retried() {
        let sink = BrokenSink::default();
        let fail = sink.fail.clone();
        let written = sink.written.clone();
        let mut board = KanbanBoard::new("demo", Session::Admin, Box::new(sink));
        assert_eq!(written.get(), 1);

        fail.set(true);
        board.create_task(None).unwrap();
        board.create_task(None).unwrap();
        assert_eq!(board.task_count(), 2);
        assert_eq!(board.pending_audit_entries(), 2);
        assert!(board.flush_audit().is_err());

        fail.set(false);
        board.flush_audit().unwrap();
        assert_eq!(board.pending_audit_entries(), 0);
        assert_eq!(written.get(), 3);
    }

    #[test]
    fn document_round_trip_preserves_board() {
        let (mut board, _) = board(Session::Admin);
        let doing = board.add_column(Some("Doing")).unwrap();
        board.set_wip_limit(doing, 4).unwrap();
        let id = board.create_task(Some("Spec")).unwrap();
        let mut edit = TaskEdit::from(board.task(id).unwrap());
        edit.start_date = None;
        edit.assignee = "kim".into();
        board.edit_task(id, edit).unwrap();
        board.move_task(id, to(doing)).unwrap();
        board.create_task(Some("Other")).unwrap();

        let document = board.to_document();
        let restored = KanbanBoard::from_document(
            "demo",
            Session::User,
            Box::new(MemoryAuditLog::new()),
            document.clone(),
        )
        .unwrap();
        assert_eq!(restored.to_document(), document);
        assert_eq!(restored.task_count(), 2);
        assert_eq!(restored.columns()[1].wip_limit(), 4);
        assert_eq!(restored.columns()[1].tasks()[0].start_date, None);
    }

    #[test]
    fn hydrate_rejects_inconsistent_documents() {
        let two_todo = BoardDocument::from_json(
            r#"{"columns": [{"name": "To Do"}, {"name": "to do"}]}"#,
        )
        .unwrap();
        assert!(hydrate(two_todo).is_err());

        let too_many = BoardDocument {
            columns: (0..11)
                .map(|i| crate::document::ColumnRecord {
                    name: format!("C{i}"),
                    wip_limit: 0,
                    tasks: vec![],
                })
                .collect(),
        };
        assert!(hydrate(too_many).is_err());
    }
}
