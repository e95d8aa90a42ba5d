//! Spatial collision index
//!
//! A coarse uniform grid rebuilt from empty every tick. Each entity claims
//! the cells under its center and under the points one radius away along
//! each axis (up to nine cells). The first owner to claim a cell keeps it;
//! a later claim from a different owner reports the occupant as a collision
//! candidate instead of overwriting it.

use crate::config::ArenaConfig;

use super::AvatarId;

/// What occupies a cell on behalf of its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// The avatar itself (slot 0)
    Avatar,
    /// The owner's projectile at this list index (slot index + 1)
    Projectile(usize),
}

/// Occupant tag stored in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellTag {
    pub owner: AvatarId,
    pub occupant: Occupant,
}

impl CellTag {
    pub fn avatar(owner: AvatarId) -> Self {
        Self {
            owner,
            occupant: Occupant::Avatar,
        }
    }

    pub fn projectile(owner: AvatarId, index: usize) -> Self {
        Self {
            owner,
            occupant: Occupant::Projectile(index),
        }
    }

    /// Slot number: 0 for the avatar, k > 0 for its k-th projectile
    pub fn slot(&self) -> usize {
        match self.occupant {
            Occupant::Avatar => 0,
            Occupant::Projectile(index) => index + 1,
        }
    }
}

/// Uniform collision grid
#[derive(Debug, Clone)]
pub struct CollisionGrid {
    cols: usize,
    rows: usize,
    cell_size: f32,
    cells: Vec<Option<CellTag>>,
}

impl CollisionGrid {
    pub fn new(cols: usize, rows: usize, cell_size: f32) -> Self {
        Self {
            cols,
            rows,
            cell_size,
            cells: vec![None; cols * rows],
        }
    }

    /// Grid covering the arena, including its far edges
    pub fn for_arena(config: &ArenaConfig) -> Self {
        Self::new(config.tiles_wide + 1, config.tiles_high + 1, config.tile_size)
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    fn in_bounds(&self, col: i64, row: i64) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.cols && (row as usize) < self.rows
    }

    #[inline]
    fn cell_coord(&self, v: f32) -> i64 {
        (v / self.cell_size).floor() as i64
    }

    /// Empty every cell
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Occupant of a cell, if any
    pub fn occupant(&self, col: usize, row: usize) -> Option<CellTag> {
        if col < self.cols && row < self.rows {
            self.cells[self.index(col, row)]
        } else {
            None
        }
    }

    /// Cell containing a point, if inside the grid
    pub fn cell_of(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let (col, row) = (self.cell_coord(x), self.cell_coord(y));
        self.in_bounds(col, row)
            .then_some((col as usize, row as usize))
    }

    /// Number of occupied cells
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Every distinct occupant tag currently stored
    pub fn tags(&self) -> Vec<CellTag> {
        let mut tags: Vec<CellTag> = Vec::new();
        for tag in self.cells.iter().flatten() {
            if !tags.contains(tag) {
                tags.push(*tag);
            }
        }
        tags
    }

    /// Claim the cells covered by an entity at `(x, y)` with `radius`.
    ///
    /// Returns the first occupant from a different owner found in any of
    /// those cells. Cells outside the grid are skipped.
    pub fn register(&mut self, x: f32, y: f32, radius: f32, tag: CellTag) -> Option<CellTag> {
        let col = self.cell_coord(x);
        let row = self.cell_coord(y);
        let col_plus = self.cell_coord(x + radius);
        let row_plus = self.cell_coord(y + radius);
        let col_minus = self.cell_coord(x - radius);
        let row_minus = self.cell_coord(y - radius);

        let candidates = [
            (col, row),
            (col_plus, row),
            (col, row_plus),
            (col_plus, row_plus),
            (col_minus, row),
            (col_minus, row_plus),
            (col, row_minus),
            (col_plus, row_minus),
            (col_minus, row_minus),
        ];

        let mut conflict = None;
        for (i, &(c, r)) in candidates.iter().enumerate() {
            if !self.in_bounds(c, r) || candidates[..i].contains(&(c, r)) {
                continue;
            }
            let idx = self.index(c as usize, r as usize);
            match self.cells[idx] {
                Some(existing) if existing.owner != tag.owner => {
                    conflict.get_or_insert(existing);
                }
                _ => self.cells[idx] = Some(tag),
            }
        }
        conflict
    }
}
