use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use kanban::document::DATE_FORMAT;
use kanban::{
    BoardLayout, ColumnId, Direction, KanbanBoard, PlacementHint, ProjectStore, Refusal, Region,
    Session, TaskEdit, TaskId, MAX_TASKS,
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction as Axis, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Write};
use tracing::warn;

fn region(rect: Rect) -> Region {
    Region::new(
        rect.x.into(),
        rect.y.into(),
        rect.width.into(),
        rect.height.into(),
    )
}

pub struct App<'a> {
    board: KanbanBoard,
    store: &'a ProjectStore,
    selected_column: usize,
    selected_task: usize,
    layout: BoardLayout,
    task_rows: Vec<(TaskId, Rect)>,
    dragging: Option<TaskId>,
    message: String,
}

impl<'a> App<'a> {
    pub fn new(board: KanbanBoard, store: &'a ProjectStore) -> Self {
        Self {
            board,
            store,
            selected_column: 0,
            selected_task: 0,
            layout: BoardLayout::new(),
            task_rows: Vec::new(),
            dragging: None,
            message: String::from("a: add task  e: edit  </>: move  s: save  q: quit"),
        }
    }

    pub fn into_board(self) -> KanbanBoard {
        self.board
    }

    fn selected_column_id(&self) -> Option<ColumnId> {
        self.board.columns().get(self.selected_column).map(|c| c.id())
    }

    fn selected_task_id(&self) -> Option<TaskId> {
        self.board
            .columns()
            .get(self.selected_column)
            .and_then(|c| c.tasks().get(self.selected_task))
            .map(|t| t.id())
    }

    fn clamp_selection(&mut self) {
        let columns = self.board.columns();
        self.selected_column = self.selected_column.min(columns.len().saturating_sub(1));
        let tasks = columns
            .get(self.selected_column)
            .map_or(0, |c| c.task_count());
        self.selected_task = self.selected_task.min(tasks.saturating_sub(1));
    }

    fn report<T>(&mut self, result: Result<T, Refusal>, done: impl Into<String>) {
        match result {
            Ok(_) => self.message = done.into(),
            Err(refusal) => {
                warn!(%refusal, "operation refused");
                self.message = refusal.to_string();
            }
        }
        self.clamp_selection();
    }

    /// Selects the task wherever it now lives.
    fn follow_task(&mut self, id: TaskId) {
        if let Some((column, position)) = self.board.locate_task(id) {
            self.selected_column = column;
            self.selected_task = position;
        }
    }

    fn move_selected_task(&mut self, direction: Direction) {
        let Some(task) = self.selected_task_id() else {
            return;
        };
        let target = match direction {
            Direction::Left => self.selected_column.checked_sub(1),
            Direction::Right => Some(self.selected_column + 1),
        };
        let Some(target) = target
            .and_then(|i| self.board.columns().get(i))
            .map(|c| c.id())
        else {
            return;
        };
        let result = self.board.move_task(task, PlacementHint::Column(target));
        self.report(result, "Task moved");
        self.follow_task(task);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.dragging = self
                    .task_rows
                    .iter()
                    .find(|(_, row)| row.contains(Position::new(mouse.column, mouse.row)))
                    .map(|(id, _)| *id);
                if let Some(id) = self.dragging {
                    self.follow_task(id);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(id) = self.dragging.take() {
                    let hint = PlacementHint::Region {
                        area: Region::point(mouse.column.into(), mouse.row.into()),
                        layout: &self.layout,
                    };
                    let result = self.board.move_task(id, hint);
                    self.report(result, "Task moved");
                    self.follow_task(id);
                }
            }
            _ => {}
        }
    }

    fn edit_selected_task(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let Some(task) = self.board.task(id) else {
            return;
        };
        let mut edit = TaskEdit::from(task);

        if let Some(title) = prompt_with_default("Title", &edit.title) {
            edit.title = title;
        }
        if let Some(assignee) = prompt_with_default("Assignee", &edit.assignee) {
            edit.assignee = assignee;
        }
        for (label, date) in [
            ("Start date (YYYY-MM-DD, '-' to clear)", &mut edit.start_date),
            ("End date (YYYY-MM-DD, '-' to clear)", &mut edit.end_date),
        ] {
            let current = date.map(|d| d.format(DATE_FORMAT).to_string());
            match prompt_with_default(label, current.as_deref().unwrap_or_default()).as_deref() {
                None => {}
                Some("-") => *date = None,
                Some(text) => match NaiveDate::parse_from_str(text, DATE_FORMAT) {
                    Ok(parsed) => *date = Some(parsed),
                    Err(_) => {
                        self.message = format!("Not a date: {text}");
                        return;
                    }
                },
            }
        }
        if let Some(description) = prompt_with_default("Description", &edit.description) {
            edit.description = description;
        }

        match self.board.edit_task(id, edit) {
            Ok(changed) if changed.is_empty() => self.message = "No changes".into(),
            result => self.report(result, "Task updated"),
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Left => {
                self.selected_column = self.selected_column.saturating_sub(1);
                self.selected_task = 0;
            }
            KeyCode::Right => {
                if self.selected_column + 1 < self.board.columns().len() {
                    self.selected_column += 1;
                    self.selected_task = 0;
                }
            }
            KeyCode::Up => self.selected_task = self.selected_task.saturating_sub(1),
            KeyCode::Down => self.selected_task += 1,
            KeyCode::Char('a') if !self.board.is_admin_session() => {
                self.report(Err::<(), _>(Refusal::AdminOnly), "");
            }
            KeyCode::Char('a') => {
                if let Some(title) = prompt("Task title (empty for default)") {
                    let title = (!title.is_empty()).then_some(title.as_str());
                    let result = self.board.create_task(title);
                    if let Ok(id) = result {
                        self.follow_task(id);
                    }
                    self.report(result, "Task created");
                }
            }
            KeyCode::Char('e') => self.edit_selected_task(),
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_task_id() {
                    let result = self.board.delete_task(id);
                    self.report(result, "Task deleted");
                }
            }
            KeyCode::Char('<') => self.move_selected_task(Direction::Left),
            KeyCode::Char('>') => self.move_selected_task(Direction::Right),
            KeyCode::Char('c') => {
                if let Some(title) = prompt("Column title (empty for default)") {
                    let title = (!title.is_empty()).then_some(title.as_str());
                    let result = self.board.add_column(title);
                    self.report(result, "Column added");
                }
            }
            KeyCode::Char('r') => {
                if let (Some(id), Some(title)) =
                    (self.selected_column_id(), prompt("New column title"))
                {
                    let result = self.board.rename_column(id, &title);
                    self.report(result, "Column renamed");
                }
            }
            KeyCode::Char('w') => {
                if let (Some(id), Some(text)) =
                    (self.selected_column_id(), prompt("WIP limit (0 = no limit, max 50)"))
                {
                    match text.parse::<u32>() {
                        Ok(limit) => {
                            let result = self.board.set_wip_limit(id, limit);
                            self.report(result, "WIP limit updated");
                        }
                        Err(_) => self.message = format!("Not a number: {text}"),
                    }
                }
            }
            KeyCode::Char('x') => {
                if let Some(id) = self.selected_column_id() {
                    let result = self.board.remove_column(id);
                    self.report(result, "Column deleted");
                }
            }
            KeyCode::Char('[') | KeyCode::Char(']') => {
                if let Some(id) = self.selected_column_id() {
                    let direction = if code == KeyCode::Char('[') {
                        Direction::Left
                    } else {
                        Direction::Right
                    };
                    let result = self.board.move_column(id, direction);
                    if result.is_ok() {
                        self.selected_column = self
                            .board
                            .columns()
                            .iter()
                            .position(|c| c.id() == id)
                            .unwrap_or(self.selected_column);
                    }
                    self.report(result, "Column moved");
                }
            }
            KeyCode::Char('s') => {
                self.message = match self.board.save(self.store) {
                    Ok(()) => "Saved".into(),
                    Err(err) => format!("Save failed: {err}"),
                };
            }
            _ => {}
        }
        self.clamp_selection();
        true
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let prompts = matches!(
                    key.code,
                    KeyCode::Char('a' | 'e' | 'c' | 'r' | 'w')
                );
                if !app.handle_key(key.code) {
                    return Ok(());
                }
                if prompts {
                    terminal.clear()?;
                }
            }
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            _ => {}
        }
    }
}

fn render(f: &mut Frame, app: &mut App) {
    let today = Local::now().date_naive();
    let rows = Layout::default()
        .direction(Axis::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(9),
            Constraint::Length(1),
        ])
        .split(f.area());

    let columns = app.board.columns();
    let count = columns.len().max(1) as u32;
    let chunks = Layout::default()
        .direction(Axis::Horizontal)
        .constraints((0..count).map(|_| Constraint::Ratio(1, count)).collect::<Vec<_>>())
        .split(rows[0]);

    app.layout.clear();
    app.task_rows.clear();
    for (i, column) in columns.iter().enumerate() {
        let area = chunks[i];
        app.layout.insert(column.id(), region(area));

        let items: Vec<ListItem> = column
            .tasks()
            .iter()
            .enumerate()
            .map(|(j, t)| {
                let row = Rect::new(
                    area.x + 1,
                    area.y + 1 + j as u16,
                    area.width.saturating_sub(2),
                    1,
                );
                if row.y < area.bottom().saturating_sub(1) {
                    app.task_rows.push((t.id(), row));
                }
                let mut style = Style::default().fg(Color::White);
                if i == app.selected_column && j == app.selected_task {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                let due = match t.days_remaining(today) {
                    Some(days) if days < 0 => {
                        Span::styled(" overdue", Style::default().fg(Color::Red))
                    }
                    Some(days) => Span::raw(format!(" ({days}d)")),
                    None => Span::raw(""),
                };
                ListItem::new(Line::from(vec![Span::styled(t.title.as_str(), style), due]))
            })
            .collect();

        let title = if column.wip_limit() > 0 {
            format!("{} ({}/{})", column.title(), column.task_count(), column.wip_limit())
        } else {
            format!("{} ({})", column.title(), column.task_count())
        };
        let border = if i == app.selected_column {
            Style::default().fg(Color::Cyan)
        } else if column.is_full() {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        let list = List::new(items).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border),
        );
        f.render_widget(list, area);
    }

    let details = app
        .selected_task_id()
        .and_then(|id| app.board.task(id))
        .map(|t| t.summary(today))
        .unwrap_or_default();
    f.render_widget(
        Paragraph::new(details)
            .block(Block::default().title("Details").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        rows[1],
    );

    let session = match app.board.session() {
        Session::Admin => "admin",
        Session::User => "user",
    };
    let status = format!(
        " {} [{session}]  Tasks: {}/{MAX_TASKS}  |  {}",
        app.board.project_name(),
        app.board.task_count(),
        app.message
    );
    f.render_widget(
        Paragraph::new(status).style(Style::default().add_modifier(Modifier::BOLD)),
        rows[2],
    );
}

fn prompt(message: &str) -> Option<String> {
    let mut stdout = io::stdout();
    disable_raw_mode().ok();
    execute!(stdout, LeaveAlternateScreen).ok();
    print!("{message}: ");
    stdout.flush().ok();

    let mut input = String::new();
    let result = io::stdin().read_line(&mut input);

    execute!(stdout, EnterAlternateScreen).ok();
    enable_raw_mode().ok();
    result.ok().map(|_| input.trim().to_string())
}

/// Prompts showing the current value; an empty answer keeps it.
fn prompt_with_default(label: &str, current: &str) -> Option<String> {
    prompt(&format!("{label} [{current}]")).filter(|answer| !answer.is_empty())
}
