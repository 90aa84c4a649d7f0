//! Resolving which column a moved task lands in.
//!
//! A pointer-driven front-end drops a task somewhere on screen and hands
//! over the region it occupies together with the layout it last drew. An
//! API-driven caller names the target column directly. Either way the
//! board applies the same admission and rollback rules afterwards.

use std::collections::HashMap;

use crate::column::{Column, ColumnId};

/// An axis-aligned rectangle in front-end coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A one-unit region at a pointer position.
    pub fn point(x: i32, y: i32) -> Self {
        Self::new(x, y, 1, 1)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Overlap test; touching edges do not intersect and empty regions
    /// intersect nothing.
    pub fn intersects(&self, other: &Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Where each column was last drawn.
#[derive(Debug, Clone, Default)]
pub struct BoardLayout {
    regions: HashMap<ColumnId, Region>,
}

impl BoardLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: ColumnId, region: Region) {
        self.regions.insert(column, region);
    }

    pub fn region(&self, column: ColumnId) -> Option<Region> {
        self.regions.get(&column).copied()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PlacementHint<'a> {
    /// Explicit target column.
    Column(ColumnId),
    /// The area the dropped task covers, against the drawn layout.
    Region {
        area: Region,
        layout: &'a BoardLayout,
    },
}

/// Picks the target column for a move. For regions this is the first
/// column in display order whose drawn region intersects the drop area.
pub fn resolve_target(columns: &[Column], hint: &PlacementHint<'_>) -> Option<ColumnId> {
    match hint {
        PlacementHint::Column(id) => columns.iter().map(Column::id).find(|c| c == id),
        PlacementHint::Region { area, layout } => columns
            .iter()
            .map(Column::id)
            .find(|&id| layout.region(id).is_some_and(|r| r.intersects(area))),
    }
}
