//! Kanban board core: columns with WIP limits, tasks, placement, a JSON
//! board file per project and a CSV audit log of every change.

pub mod audit;
pub mod column;
pub mod config;
pub mod credentials;
pub mod document;
pub mod error;
pub mod kanban_board;
pub mod placement;
pub mod registry;
pub mod task;

pub use audit::{AuditAction, AuditEntry, AuditSink, CsvAuditLog, MemoryAuditLog};
pub use column::{Column, ColumnId, WipChange, TODO_TITLE};
pub use error::{BoardError, BoardResult, Refusal};
pub use kanban_board::{Direction, KanbanBoard, MoveOutcome, Session, MAX_COLUMNS, MAX_TASKS};
pub use placement::{BoardLayout, PlacementHint, Region};
pub use registry::ProjectStore;
pub use task::{Task, TaskEdit, TaskField, TaskId};
